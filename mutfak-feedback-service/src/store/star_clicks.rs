use std::collections::BTreeMap;

use chrono::Utc;
use diesel::{dsl::count_star, insert_into, prelude::*};
use diesel_async::{
    scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl,
};

use crate::{
    models::{NewStarClick, NewStarClickStatistics, StarClick},
    rating::{MAX_RATING, MIN_RATING},
    schema::{star_click_statistics, star_clicks},
};

use super::StoreError;

/// Folds grouped `(star_value, count)` rows into a map holding every star
/// value from 1 to 5. Stars without clicks count zero; values outside the
/// range are dropped.
pub(crate) fn merge_counts(raw: impl IntoIterator<Item = (i32, i64)>) -> BTreeMap<i32, i64> {
    let mut counts: BTreeMap<i32, i64> = (MIN_RATING..=MAX_RATING).map(|star| (star, 0)).collect();
    for (star, count) in raw {
        if let Some(slot) = counts.get_mut(&star) {
            *slot = count;
        }
    }
    counts
}

pub struct StarClickStore<'a> {
    conn: &'a mut AsyncPgConnection,
}

impl<'a> StarClickStore<'a> {
    pub fn new(conn: &'a mut AsyncPgConnection) -> Self {
        Self { conn }
    }

    pub async fn record(&mut self, restaurant_id: i32, star_value: i32) -> Result<StarClick, StoreError> {
        Ok(insert_into(star_clicks::table)
            .values(NewStarClick {
                restaurant_id,
                star_value,
            })
            .returning(StarClick::as_returning())
            .get_result(self.conn)
            .await?)
    }

    /// Recounts the raw click log and writes the totals into the counter
    /// table. Every star value from 1 to 5 gets a counter row.
    pub async fn reconcile(&mut self, restaurant_id: i32) -> Result<BTreeMap<i32, i64>, StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let raw = star_clicks::table
                        .filter(star_clicks::restaurant_id.eq(restaurant_id))
                        .group_by(star_clicks::star_value)
                        .select((star_clicks::star_value, count_star()))
                        .load::<(i32, i64)>(conn)
                        .await?;
                    let counts = merge_counts(raw);

                    let now = Utc::now();
                    for (star, count) in &counts {
                        let count = i32::try_from(*count).unwrap_or(i32::MAX);
                        insert_into(star_click_statistics::table)
                            .values(NewStarClickStatistics {
                                restaurant_id,
                                star_value: *star,
                                count,
                            })
                            .on_conflict((
                                star_click_statistics::restaurant_id,
                                star_click_statistics::star_value,
                            ))
                            .do_update()
                            .set((
                                star_click_statistics::count.eq(count),
                                star_click_statistics::updated_at.eq(now),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    Ok(counts)
                }
                .scope_boxed()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_counts_matches_raw_rows_per_star() {
        let counts = merge_counts(vec![(1, 4), (3, 2), (5, 9)]);

        assert_eq!(
            counts.into_iter().collect::<Vec<_>>(),
            vec![(1, 4), (2, 0), (3, 2), (4, 0), (5, 9)]
        );
    }

    #[test]
    fn merge_counts_of_empty_log_is_all_zero() {
        let counts = merge_counts(Vec::<(i32, i64)>::new());

        assert_eq!(counts.len(), 5);
        assert!(counts.values().all(|count| *count == 0));
        assert_eq!(counts.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn merge_counts_ignores_out_of_range_stars() {
        let counts = merge_counts(vec![(0, 3), (2, 1), (6, 7)]);

        assert_eq!(counts.len(), 5);
        assert_eq!(counts[&2], 1);
        assert!(!counts.contains_key(&0));
        assert!(!counts.contains_key(&6));
    }
}

//! Aggregates shown on the owner dashboard and the public analytics pages.
//! Everything here works on rows already loaded from the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
    models::{Complaint, Feedback},
    rating::{round1, MAX_RATING, MIN_RATING},
};

pub const RECENT_COMMENTS: usize = 5;

/// The rating-related view shared by feedback and complaint rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Rated {
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub average_rating: f64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Feedback> for Rated {
    fn from(feedback: &Feedback) -> Self {
        Self {
            food_rating: feedback.food_rating,
            service_rating: feedback.service_rating,
            atmosphere_rating: feedback.atmosphere_rating,
            average_rating: feedback.average_rating,
            comment: feedback.comment.clone(),
            created_at: feedback.created_at,
        }
    }
}

impl From<&Complaint> for Rated {
    fn from(complaint: &Complaint) -> Self {
        Self {
            food_rating: complaint.food_rating,
            service_rating: complaint.service_rating,
            atmosphere_rating: complaint.atmosphere_rating,
            average_rating: complaint.average_rating,
            comment: Some(complaint.comment.clone()),
            created_at: complaint.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Satisfaction {
    pub satisfied: i64,
    pub neutral: i64,
    pub dissatisfied: i64,
}

impl Satisfaction {
    fn record(&mut self, average: f64) {
        if average >= 4.0 {
            self.satisfied += 1;
        } else if average >= 3.0 {
            self.neutral += 1;
        } else {
            self.dissatisfied += 1;
        }
    }
}

/// Counts per star value 1..=5, every key present.
pub type Distribution = BTreeMap<i32, i64>;

fn empty_distribution() -> Distribution {
    (MIN_RATING..=MAX_RATING).map(|star| (star, 0)).collect()
}

/// Star bucket of an average rating, clamped into 1..=5.
pub fn rating_bucket(average: f64) -> i32 {
    (average.round() as i32).clamp(MIN_RATING, MAX_RATING)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentComment {
    pub comment: String,
    pub rating: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_feedbacks: i64,
    pub average_rating: f64,
    pub latest_feedback_date: Option<DateTime<Utc>>,
    pub rating_distribution: Distribution,
    pub satisfaction: Satisfaction,
    pub recent_comments: Vec<RecentComment>,
}

pub fn dashboard(rows: &[Rated]) -> DashboardSummary {
    let mut distribution = empty_distribution();
    let mut satisfaction = Satisfaction::default();
    let mut sum = 0.0;

    for row in rows {
        *distribution.entry(rating_bucket(row.average_rating)).or_default() += 1;
        satisfaction.record(row.average_rating);
        sum += row.average_rating;
    }

    let mut newest: Vec<&Rated> = rows.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let recent_comments = newest
        .iter()
        .filter_map(|row| {
            let comment = row.comment.as_deref()?.trim();
            (!comment.is_empty()).then(|| RecentComment {
                comment: comment.to_string(),
                rating: row.average_rating,
                date: row.created_at,
            })
        })
        .take(RECENT_COMMENTS)
        .collect();

    DashboardSummary {
        total_feedbacks: rows.len() as i64,
        average_rating: mean(sum, rows.len()),
        latest_feedback_date: newest.first().map(|row| row.created_at),
        rating_distribution: distribution,
        satisfaction,
        recent_comments,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackStats {
    pub total: i64,
    pub rating_distribution: Distribution,
    pub satisfaction: Satisfaction,
}

pub fn feedback_stats(rows: &[Rated]) -> FeedbackStats {
    let mut distribution = empty_distribution();
    let mut satisfaction = Satisfaction::default();
    for row in rows {
        *distribution.entry(rating_bucket(row.average_rating)).or_default() += 1;
        satisfaction.record(row.average_rating);
    }
    FeedbackStats {
        total: rows.len() as i64,
        rating_distribution: distribution,
        satisfaction,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionStats {
    pub counts: Distribution,
    pub percentages: BTreeMap<i32, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analytics {
    pub total_feedbacks: i64,
    pub average_rating: f64,
    pub rating_distribution: Distribution,
    pub satisfaction: Satisfaction,
    pub food: DimensionStats,
    pub service: DimensionStats,
    pub atmosphere: DimensionStats,
}

pub fn analytics(rows: &[Rated]) -> Analytics {
    let base = feedback_stats(rows);
    let sum: f64 = rows.iter().map(|row| row.average_rating).sum();

    Analytics {
        total_feedbacks: base.total,
        average_rating: mean(sum, rows.len()),
        rating_distribution: base.rating_distribution,
        satisfaction: base.satisfaction,
        food: dimension(rows.iter().map(|row| row.food_rating)),
        service: dimension(rows.iter().map(|row| row.service_rating)),
        atmosphere: dimension(rows.iter().map(|row| row.atmosphere_rating)),
    }
}

fn dimension(scores: impl Iterator<Item = i32>) -> DimensionStats {
    let mut counts = empty_distribution();
    for score in scores {
        if let Some(slot) = counts.get_mut(&score) {
            *slot += 1;
        }
    }
    let total: i64 = counts.values().sum();
    let percentages = counts
        .iter()
        .map(|(star, count)| (*star, percentage(*count, total)))
        .collect();
    DimensionStats {
        counts,
        percentages,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StarClickSummary {
    pub restaurant_id: i32,
    pub total_clicks: i64,
    pub star_distribution: Distribution,
    /// Empty when nothing was clicked yet.
    pub percentages: BTreeMap<i32, f64>,
}

pub fn star_click_summary(restaurant_id: i32, counts: &BTreeMap<i32, i64>) -> StarClickSummary {
    let mut distribution = empty_distribution();
    for (star, count) in counts {
        if let Some(slot) = distribution.get_mut(star) {
            *slot = *count;
        }
    }
    let total: i64 = distribution.values().sum();
    let percentages = if total == 0 {
        BTreeMap::new()
    } else {
        distribution
            .iter()
            .map(|(star, count)| (*star, percentage(*count, total)))
            .collect()
    };

    StarClickSummary {
        restaurant_id,
        total_clicks: total,
        star_distribution: distribution,
        percentages,
    }
}

fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        round1(sum / n as f64)
    }
}

fn percentage(count: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round1(count as f64 * 100.0 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn rated(average: f64, comment: Option<&str>, minutes: i64) -> Rated {
        Rated {
            food_rating: 3,
            service_rating: 4,
            atmosphere_rating: 5,
            average_rating: average,
            comment: comment.map(str::to_string),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
                + TimeDelta::minutes(minutes),
        }
    }

    #[test]
    fn bucket_and_satisfaction_boundaries() {
        let summary = dashboard(&[rated(2.5, None, 0), rated(3.0, None, 1), rated(4.0, None, 2)]);

        assert_eq!(rating_bucket(2.5), 3);
        assert_eq!(rating_bucket(1.2), 1);
        assert_eq!(summary.rating_distribution[&3], 2);
        assert_eq!(summary.rating_distribution[&4], 1);
        assert_eq!(
            summary.satisfaction,
            Satisfaction {
                satisfied: 1,
                neutral: 1,
                dissatisfied: 1
            }
        );
    }

    #[test]
    fn dashboard_keeps_five_newest_comments() {
        let rows: Vec<Rated> = (0..8)
            .map(|i| rated(4.0, Some(&format!("comment {i}")), i))
            .chain([rated(2.0, Some("   "), 100), rated(2.0, None, 101)])
            .collect();

        let summary = dashboard(&rows);

        assert_eq!(summary.total_feedbacks, 10);
        assert_eq!(summary.average_rating, 3.6);
        assert_eq!(summary.latest_feedback_date, Some(rows[9].created_at));
        let comments: Vec<&str> = summary
            .recent_comments
            .iter()
            .map(|c| c.comment.as_str())
            .collect();
        assert_eq!(
            comments,
            vec!["comment 7", "comment 6", "comment 5", "comment 4", "comment 3"]
        );
    }

    #[test]
    fn empty_dashboard_is_zeroed() {
        let summary = dashboard(&[]);
        assert_eq!(summary.total_feedbacks, 0);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.latest_feedback_date, None);
        assert!(summary.rating_distribution.values().all(|c| *c == 0));
        assert!(summary.recent_comments.is_empty());
    }

    #[test]
    fn analytics_counts_each_dimension() {
        let mut low = rated(2.0, None, 0);
        low.food_rating = 1;
        low.service_rating = 2;
        low.atmosphere_rating = 3;
        let rows = vec![rated(4.0, None, 0), rated(4.0, None, 1), rated(4.0, None, 2), low];

        let report = analytics(&rows);

        assert_eq!(report.total_feedbacks, 4);
        assert_eq!(report.average_rating, 3.5);
        assert_eq!(report.food.counts[&3], 3);
        assert_eq!(report.food.counts[&1], 1);
        assert_eq!(report.food.percentages[&3], 75.0);
        assert_eq!(report.food.percentages[&1], 25.0);
        assert_eq!(report.atmosphere.percentages[&5], 75.0);
    }

    #[test]
    fn analytics_without_feedback_is_all_zero() {
        let report = analytics(&[]);
        assert_eq!(report.total_feedbacks, 0);
        assert_eq!(report.average_rating, 0.0);
        assert!(report.service.percentages.values().all(|p| *p == 0.0));
    }

    #[test]
    fn star_click_percentages_cover_all_clicks() {
        let counts: BTreeMap<i32, i64> = [(1, 1), (4, 1), (5, 1)].into_iter().collect();

        let summary = star_click_summary(9, &counts);

        assert_eq!(summary.total_clicks, 3);
        assert_eq!(summary.star_distribution[&2], 0);
        assert_eq!(summary.percentages[&5], 33.3);
        let sum: f64 = summary.percentages.values().sum();
        assert!((sum - 100.0).abs() < 0.5);
    }

    #[test]
    fn star_click_percentages_are_empty_without_clicks() {
        let summary = star_click_summary(9, &BTreeMap::new());
        assert_eq!(summary.total_clicks, 0);
        assert_eq!(summary.star_distribution.len(), 5);
        assert!(summary.percentages.is_empty());
    }
}

use thiserror::Error;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Error, Debug, PartialEq)]
pub enum RatingError {
    #[error("{field} must be between 1 and 5, got {value}")]
    OutOfRange { field: &'static str, value: i32 },
}

/// The three per-dimension scores a guest leaves on a submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratings {
    pub food: i32,
    pub service: i32,
    pub atmosphere: i32,
}

impl Ratings {
    pub fn new(food: i32, service: i32, atmosphere: i32) -> Result<Self, RatingError> {
        check("food_rating", food)?;
        check("service_rating", service)?;
        check("atmosphere_rating", atmosphere)?;
        Ok(Self {
            food,
            service,
            atmosphere,
        })
    }

    /// Mean of the three scores rounded to one decimal place.
    pub fn average(&self) -> f64 {
        average_rating(self.food, self.service, self.atmosphere)
    }
}

pub fn average_rating(food: i32, service: i32, atmosphere: i32) -> f64 {
    round1((food + service + atmosphere) as f64 / 3.0)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn check(field: &'static str, value: i32) -> Result<(), RatingError> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(())
    } else {
        Err(RatingError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_rounded_to_one_decimal() {
        assert_eq!(Ratings::new(4, 5, 3).unwrap().average(), 4.0);
        assert_eq!(Ratings::new(3, 3, 2).unwrap().average(), 2.7);
        assert_eq!(Ratings::new(1, 1, 2).unwrap().average(), 1.3);
        assert_eq!(Ratings::new(5, 5, 5).unwrap().average(), 5.0);
    }

    #[test]
    fn rejects_scores_outside_one_to_five() {
        assert_eq!(
            Ratings::new(0, 3, 3),
            Err(RatingError::OutOfRange {
                field: "food_rating",
                value: 0
            })
        );
        assert_eq!(
            Ratings::new(3, 3, 6),
            Err(RatingError::OutOfRange {
                field: "atmosphere_rating",
                value: 6
            })
        );
    }
}

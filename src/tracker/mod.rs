//! Daily tracking: water, food, workouts and progress.

pub mod commands;
pub mod progress;
pub mod workout;

pub use commands::{FoodCompletion, FoodLookup, NO_PROFILE, TrackingCommands};
pub use progress::{CalorieProgress, ProgressSnapshot, WaterProgress};
pub use workout::{WorkoutEffect, WorkoutKind};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A food lookup waiting for the amount eaten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodLogSession {
    pub product: String,
    pub kcal_per_100g: u32,
    pub started_at: DateTime<Utc>,
}

impl FoodLogSession {
    pub fn new(product: impl Into<String>, kcal_per_100g: u32) -> Self {
        Self {
            product: product.into(),
            kcal_per_100g,
            started_at: Utc::now(),
        }
    }

    /// `grams / 100 * kcal_per_100g`, unrounded.
    pub fn calories_for(&self, grams: u32) -> f64 {
        f64::from(grams) / 100.0 * f64::from(self.kcal_per_100g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calories_scale_with_grams() {
        let session = FoodLogSession::new("творог", 250);
        assert_eq!(session.calories_for(150), 375.0);
        assert_eq!(session.calories_for(100), 250.0);
        assert!((FoodLogSession::new("банан", 89).calories_for(33) - 29.37).abs() < 1e-9);
    }
}

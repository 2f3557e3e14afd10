//! Read-only view of one user's day.

use serde::Serialize;

use crate::goals::TemperatureReading;
use crate::store::UserRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterProgress {
    pub logged_ml: u32,
    pub goal_ml: u32,
    pub remaining_ml: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalorieProgress {
    pub logged: f64,
    pub burned: u32,
    /// `logged - burned`; negative when more was burned than eaten.
    pub balance: f64,
    pub goal: u32,
}

/// Everything `/check_progress`, the charts and the HTTP API report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub water: WaterProgress,
    pub calories: CalorieProgress,
    pub temperature: TemperatureReading,
}

impl ProgressSnapshot {
    pub fn from_record(record: &UserRecord, temperature: TemperatureReading) -> Self {
        let ledger = &record.ledger;
        let goal_ml = record.water_goal(temperature.celsius);
        Self {
            water: WaterProgress {
                logged_ml: ledger.logged_water_ml,
                goal_ml,
                remaining_ml: goal_ml.saturating_sub(ledger.logged_water_ml),
            },
            calories: CalorieProgress {
                logged: ledger.logged_calories,
                burned: ledger.burned_calories,
                balance: ledger.calorie_balance(),
                goal: record.effective_calorie_goal(),
            },
            temperature,
        }
    }
}

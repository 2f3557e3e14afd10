//! User record and ledger models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::goals;

/// Opaque, stable identity of a user (Telegram user ID, "local-user" on the CLI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Human-readable label shown in profile summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "Мужской",
            Self::Female => "Женский",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
        }
    }
}

/// Physiological profile collected during onboarding.
///
/// Immutable once committed; re-running onboarding replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Body weight, kg.
    pub weight: u32,
    /// Height, cm.
    pub height: u32,
    /// Age, years.
    pub age: u32,
    /// Daily activity, minutes.
    pub activity_minutes: u32,
    /// City as typed by the user. It resolved through geocoding when entered.
    pub city: String,
    pub gender: Gender,
}

/// Cumulative-today counters. Zeroed every night by the reset scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyLedger {
    pub logged_water_ml: u32,
    /// Fractional: `grams / 100 * kcal_per_100g` rarely lands on an integer.
    pub logged_calories: f64,
    pub burned_calories: u32,
    /// Extra water earned from today's workouts.
    pub additional_water_goal_ml: u32,
}

impl DailyLedger {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Consumed minus burned. Negative when more was burned than eaten.
    pub fn calorie_balance(&self) -> f64 {
        self.logged_calories - f64::from(self.burned_calories)
    }
}

/// Everything the tracker knows about one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub profile: Profile,
    /// Daily calorie target. Always set by onboarding; `None` only for
    /// records built through another path, in which case it is derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calorie_goal: Option<u32>,
    pub ledger: DailyLedger,
    pub onboarded_at: DateTime<Utc>,
}

impl UserRecord {
    /// A freshly onboarded record with an empty ledger.
    pub fn new(profile: Profile, calorie_goal: Option<u32>) -> Self {
        Self {
            profile,
            calorie_goal,
            ledger: DailyLedger::default(),
            onboarded_at: Utc::now(),
        }
    }

    /// Stored calorie goal, or the Mifflin-St Jeor value when absent.
    pub fn effective_calorie_goal(&self) -> u32 {
        self.calorie_goal.unwrap_or_else(|| {
            goals::calorie_goal(
                self.profile.weight,
                self.profile.height,
                self.profile.age,
                self.profile.gender,
            )
        })
    }

    /// Water goal for the given ambient temperature.
    pub fn water_goal(&self, ambient_temp_c: f64) -> u32 {
        goals::water_goal(
            self.profile.weight,
            self.profile.activity_minutes,
            self.ledger.additional_water_goal_ml,
            ambient_temp_c,
        )
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn profile() -> Profile {
        Profile {
            weight: 80,
            height: 180,
            age: 30,
            activity_minutes: 60,
            city: "Москва".to_string(),
            gender: Gender::Male,
        }
    }

    pub fn record() -> UserRecord {
        UserRecord::new(profile(), Some(2200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_empty_ledger() {
        let record = fixtures::record();
        assert!(record.ledger.is_zero());
        assert_eq!(record.calorie_goal, Some(2200));
    }

    #[test]
    fn effective_goal_prefers_stored_value() {
        assert_eq!(fixtures::record().effective_calorie_goal(), 2200);
    }

    #[test]
    fn effective_goal_falls_back_to_formula() {
        let record = UserRecord::new(fixtures::profile(), None);
        assert_eq!(record.effective_calorie_goal(), 1780);
    }

    #[test]
    fn water_goal_uses_ledger_extra() {
        let mut record = fixtures::record();
        // 80*30 + 500*2
        assert_eq!(record.water_goal(20.0), 3400);
        record.ledger.additional_water_goal_ml = 200;
        assert_eq!(record.water_goal(20.0), 3600);
    }

    #[test]
    fn ledger_reset_zeroes_everything() {
        let mut ledger = DailyLedger {
            logged_water_ml: 500,
            logged_calories: 375.5,
            burned_calories: 300,
            additional_water_goal_ml: 200,
        };
        assert!(!ledger.is_zero());
        ledger.reset();
        assert!(ledger.is_zero());
    }

    #[test]
    fn calorie_balance_can_be_negative() {
        let ledger = DailyLedger {
            logged_calories: 120.0,
            burned_calories: 300,
            ..Default::default()
        };
        assert_eq!(ledger.calorie_balance(), -180.0);
    }

    #[test]
    fn user_id_is_transparent_in_json() {
        let id = UserId::from("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn gender_serde_and_label() {
        let g: Gender = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(g, Gender::Female);
        assert_eq!(g.label(), "Женский");
        assert_eq!(Gender::Male.to_string(), "male");
    }
}

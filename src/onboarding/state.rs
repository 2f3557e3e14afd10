//! Onboarding state machine — tracks which profile question the user is on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Gender, Profile};

/// The steps of the profile dialogue.
///
/// Progresses linearly: Weight → Height → Age → Activity → City → Gender →
/// CalorieGoal → Committed. No skipping, no going back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    #[default]
    Weight,
    Height,
    Age,
    Activity,
    City,
    Gender,
    CalorieGoal,
    Committed,
}

impl OnboardingStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (Weight, Height)
                | (Height, Age)
                | (Age, Activity)
                | (Activity, City)
                | (City, Gender)
                | (Gender, CalorieGoal)
                | (CalorieGoal, Committed)
        )
    }

    /// Whether the record has been committed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Weight => Some(Height),
            Height => Some(Age),
            Age => Some(Activity),
            Activity => Some(City),
            City => Some(Gender),
            Gender => Some(CalorieGoal),
            CalorieGoal => Some(Committed),
            Committed => None,
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Weight => "weight",
            Self::Height => "height",
            Self::Age => "age",
            Self::Activity => "activity",
            Self::City => "city",
            Self::Gender => "gender",
            Self::CalorieGoal => "calorie_goal",
            Self::Committed => "committed",
        };
        write!(f, "{s}")
    }
}

/// Validated answers accumulated so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedFields {
    pub weight: Option<u32>,
    pub height: Option<u32>,
    pub age: Option<u32>,
    pub activity_minutes: Option<u32>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
}

impl CollectedFields {
    /// Assemble a full profile. `None` while any field is still missing.
    pub fn to_profile(&self) -> Option<Profile> {
        Some(Profile {
            weight: self.weight?,
            height: self.height?,
            age: self.age?,
            activity_minutes: self.activity_minutes?,
            city: self.city.clone()?,
            gender: self.gender?,
        })
    }
}

/// One user's in-progress profile dialogue.
///
/// Has no timeout: an abandoned session stays open until the user answers
/// again, restarts with `/set_profile`, or the process exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingSession {
    pub step: OnboardingStep,
    pub collected: CollectedFields,
    pub started_at: DateTime<Utc>,
}

impl Default for OnboardingSession {
    fn default() -> Self {
        Self {
            step: OnboardingStep::default(),
            collected: CollectedFields::default(),
            started_at: Utc::now(),
        }
    }
}

impl OnboardingSession {
    /// Fresh session at the first step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next step. Returns an error if already committed.
    pub fn advance(&mut self) -> Result<OnboardingStep, String> {
        let next = self
            .step
            .next()
            .ok_or_else(|| "Already at terminal step".to_string())?;
        if !self.step.can_transition_to(next) {
            return Err(format!("Cannot transition from {} to {}", self.step, next));
        }
        self.step = next;
        Ok(next)
    }
}

//! Profile onboarding — the guided dialogue that collects weight, height,
//! age, activity, city, gender and a calorie goal, then commits a
//! `UserRecord`.
//!
//! Answers are validated one step at a time. An invalid answer re-asks the
//! same question; nothing reaches the store until the last step succeeds.

pub mod manager;
pub mod prompts;
pub mod state;

pub use manager::{OnboardingManager, StepOutcome};
pub use prompts::{AUTO_CALORIE_GOAL, declension};
pub use state::{CollectedFields, OnboardingSession, OnboardingStep};

//! OnboardingManager — validates answers, advances the session, and commits
//! the finished profile to the store.

use std::sync::Arc;

use crate::channels::{OutgoingResponse, ReplyKeyboard};
use crate::goals;
use crate::store::{Gender, UserId, UserRecord, UserStore};
use crate::weather::WeatherService;

use super::prompts::{self, AUTO_CALORIE_GOAL};
use super::state::{OnboardingSession, OnboardingStep};

/// What happened to a session after one answer.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Answer rejected; the session stays on the same step.
    Reprompt(OutgoingResponse),
    /// Answer accepted; the session moved on and asks the next question.
    Advanced(OutgoingResponse),
    /// Last answer accepted and the record is committed. The session is done.
    Committed {
        record: UserRecord,
        reply: OutgoingResponse,
    },
}

impl StepOutcome {
    pub fn reply(&self) -> &OutgoingResponse {
        match self {
            Self::Reprompt(reply) | Self::Advanced(reply) => reply,
            Self::Committed { reply, .. } => reply,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Drives the profile dialogue for any number of users. Holds no per-user
/// state; sessions are owned by the caller.
pub struct OnboardingManager {
    store: Arc<dyn UserStore>,
    weather: Arc<dyn WeatherService>,
}

impl OnboardingManager {
    pub fn new(store: Arc<dyn UserStore>, weather: Arc<dyn WeatherService>) -> Self {
        Self { store, weather }
    }

    /// Open a fresh session at the first step.
    pub fn start(&self) -> (OnboardingSession, OutgoingResponse) {
        let session = OnboardingSession::new();
        let reply = prompt_for(session.step);
        (session, reply)
    }

    /// Validate `input` against the session's current step.
    pub async fn process_answer(
        &self,
        user_id: &UserId,
        session: &mut OnboardingSession,
        input: &str,
    ) -> StepOutcome {
        let input = input.trim();
        let step = session.step;
        let fields = &mut session.collected;

        match step {
            OnboardingStep::Weight => match parse_positive(input) {
                Some(v) => fields.weight = Some(v),
                None => return reprompt(step),
            },
            OnboardingStep::Height => match parse_positive(input) {
                Some(v) => fields.height = Some(v),
                None => return reprompt(step),
            },
            OnboardingStep::Age => match parse_positive(input) {
                Some(v) => fields.age = Some(v),
                None => return reprompt(step),
            },
            OnboardingStep::Activity => match parse_non_negative(input) {
                Some(v) => fields.activity_minutes = Some(v),
                None => return reprompt(step),
            },
            OnboardingStep::City => {
                if input.is_empty() {
                    return reprompt(step);
                }
                if let Err(e) = self.weather.geocode(input).await {
                    tracing::info!(user_id = %user_id, city = %input, "City rejected: {}", e);
                    return StepOutcome::Reprompt(OutgoingResponse::text(prompts::city_error(
                        &e.to_string(),
                    )));
                }
                fields.city = Some(input.to_string());
            }
            OnboardingStep::Gender => match parse_gender(input) {
                Some(g) => fields.gender = Some(g),
                None => return reprompt(step),
            },
            OnboardingStep::CalorieGoal => return self.commit(user_id, session, input).await,
            OnboardingStep::Committed => return reprompt(step),
        }

        match session.advance() {
            Ok(next) => {
                tracing::debug!(user_id = %user_id, step = %next, "Onboarding advanced");
                StepOutcome::Advanced(prompt_for(next))
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Failed to advance onboarding: {}", e);
                reprompt(step)
            }
        }
    }

    /// Handle the calorie-goal answer and write the finished record.
    async fn commit(
        &self,
        user_id: &UserId,
        session: &mut OnboardingSession,
        input: &str,
    ) -> StepOutcome {
        let Some(profile) = session.collected.to_profile() else {
            // Only reachable if a session was assembled by hand.
            tracing::warn!(user_id = %user_id, "Onboarding reached calorie goal with missing fields");
            *session = OnboardingSession::new();
            return StepOutcome::Reprompt(prompt_for(session.step));
        };

        let calorie_goal = if input.to_lowercase() == AUTO_CALORIE_GOAL.to_lowercase() {
            goals::calorie_goal(profile.weight, profile.height, profile.age, profile.gender)
        } else {
            match parse_positive(input) {
                Some(v) => v,
                None => {
                    return StepOutcome::Reprompt(
                        OutgoingResponse::text(prompts::step_error(OnboardingStep::CalorieGoal))
                            .with_keyboard(calorie_keyboard()),
                    );
                }
            }
        };

        if let Err(e) = session.advance() {
            tracing::warn!(user_id = %user_id, "Failed to finish onboarding: {}", e);
        }

        let record = UserRecord::new(profile, Some(calorie_goal));
        self.store.commit(user_id.clone(), record.clone()).await;
        tracing::info!(user_id = %user_id, calorie_goal, "Profile committed");

        let reply = OutgoingResponse::text(prompts::profile_saved(&record))
            .with_keyboard(ReplyKeyboard::Remove);
        StepOutcome::Committed { record, reply }
    }
}

fn calorie_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::Suggest(vec![AUTO_CALORIE_GOAL.to_string()])
}

/// Question for `step`, with the sentinel button on the calorie-goal step.
pub fn prompt_for(step: OnboardingStep) -> OutgoingResponse {
    let reply = OutgoingResponse::text(prompts::step_prompt(step));
    if step == OnboardingStep::CalorieGoal {
        reply.with_keyboard(calorie_keyboard())
    } else {
        reply
    }
}

fn reprompt(step: OnboardingStep) -> StepOutcome {
    StepOutcome::Reprompt(OutgoingResponse::text(prompts::step_error(step)))
}

/// Digits only, no sign, fits `u32`.
pub fn parse_non_negative(input: &str) -> Option<u32> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    input.parse().ok()
}

/// Digits only and strictly greater than zero.
pub fn parse_positive(input: &str) -> Option<u32> {
    parse_non_negative(input).filter(|v| *v > 0)
}

fn parse_gender(input: &str) -> Option<Gender> {
    match input.to_lowercase().as_str() {
        "м" => Some(Gender::Male),
        "ж" => Some(Gender::Female),
        _ => None,
    }
}

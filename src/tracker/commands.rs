//! Water, food and workout logging plus progress reporting.

use std::sync::Arc;

use crate::channels::OutgoingResponse;
use crate::charts::ChartRenderer;
use crate::goals::{self, TemperatureReading};
use crate::llm::{CalorieEstimator, extract_average_number};
use crate::onboarding::manager::{parse_non_negative, parse_positive};
use crate::store::{UserId, UserRecord, UserStore};
use crate::weather::WeatherService;

use super::progress::ProgressSnapshot;
use super::workout::{WorkoutEffect, WorkoutKind};
use super::FoodLogSession;

/// Reply to any tracking command from a user without a profile.
pub const NO_PROFILE: &str = "Сначала настройте профиль с помощью команды /set_profile.";

const WATER_USAGE: &str =
    "Используйте формат: /log_water <количество мл (натуральное)>. Пример: /log_water 250";
const FOOD_USAGE: &str =
    "Используйте формат: /log_food <название продукта>. Пример: /log_food банан";
const WORKOUT_USAGE: &str = "Используйте формат: /log_workout <тип тренировки> <время в минутах>.\n\
                             Пример: /log_workout бег 30";
const WEATHER_FALLBACK_NOTICE: &str =
    "Не удалось определить погоду. Цель по воде рассчитана без учета температуры.";
const CALORIES_NOT_FOUND: &str = "Калорийность продукта не найдена.";
const GRAMS_REPROMPT: &str = "Введите количество граммов (натуральное число), например: 150";
const CHART_CAPTION: &str = "📊 Ваш прогресс по воде и калориям";
const CHART_FAILED: &str = "Не удалось построить график. Попробуйте позже.";

/// Result of `/log_food <product>`.
#[derive(Debug, Clone)]
pub enum FoodLookup {
    /// Nothing to wait for (no profile, usage error, estimate failed).
    Done(OutgoingResponse),
    /// Estimate found; the caller keeps the session until grams arrive.
    AwaitGrams {
        session: FoodLogSession,
        reply: OutgoingResponse,
    },
}

/// Result of the grams answer that follows a food lookup.
#[derive(Debug, Clone)]
pub enum FoodCompletion {
    /// Not a positive integer; keep waiting.
    Reprompt(OutgoingResponse),
    /// Calories added (or the user vanished); close the session.
    Logged(OutgoingResponse),
}

/// The tracking commands. Every mutation goes through `UserStore::update`.
pub struct TrackingCommands {
    store: Arc<dyn UserStore>,
    weather: Arc<dyn WeatherService>,
    estimator: Arc<dyn CalorieEstimator>,
    charts: Arc<dyn ChartRenderer>,
}

impl TrackingCommands {
    pub fn new(
        store: Arc<dyn UserStore>,
        weather: Arc<dyn WeatherService>,
        estimator: Arc<dyn CalorieEstimator>,
        charts: Arc<dyn ChartRenderer>,
    ) -> Self {
        Self {
            store,
            weather,
            estimator,
            charts,
        }
    }

    async fn temperature_for(&self, record: &UserRecord) -> TemperatureReading {
        goals::ambient_temperature(self.weather.as_ref(), &record.profile.city).await
    }

    /// `/log_water <ml>`
    pub async fn log_water(&self, user_id: &UserId, args: &str) -> OutgoingResponse {
        if self.store.get(user_id).await.is_none() {
            return OutgoingResponse::text(NO_PROFILE);
        }
        let Some(volume) = parse_positive(args.trim()) else {
            return OutgoingResponse::text(WATER_USAGE);
        };

        let Some(record) = self
            .store
            .update(user_id, &mut |r| {
                r.ledger.logged_water_ml = r.ledger.logged_water_ml.saturating_add(volume);
            })
            .await
        else {
            return OutgoingResponse::text(NO_PROFILE);
        };

        let temp = self.temperature_for(&record).await;
        let snapshot = ProgressSnapshot::from_record(&record, temp);
        tracing::debug!(user_id = %user_id, volume, total = record.ledger.logged_water_ml, "Water logged");

        let mut text = String::new();
        if temp.fallback {
            text.push_str(WEATHER_FALLBACK_NOTICE);
            text.push_str("\n\n");
        }
        text.push_str(&format!(
            "💧 Записано: {volume} мл воды.\n\
             Норма воды: {} мл (с учетом активности и температуры {}°C).\n\
             Осталось до цели: {} мл.",
            snapshot.water.goal_ml,
            format_temperature(temp.celsius),
            snapshot.water.remaining_ml,
        ));
        OutgoingResponse::text(text)
    }

    /// `/log_food <product>`: ask the estimator and open a grams session.
    pub async fn log_food(&self, user_id: &UserId, args: &str) -> FoodLookup {
        if self.store.get(user_id).await.is_none() {
            return FoodLookup::Done(OutgoingResponse::text(NO_PROFILE));
        }
        let product = args.trim();
        if product.is_empty() {
            return FoodLookup::Done(OutgoingResponse::text(FOOD_USAGE));
        }

        let answer = match self.estimator.estimate(product).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(user_id = %user_id, product = %product, "Calorie estimate failed: {}", e);
                return FoodLookup::Done(OutgoingResponse::text(CALORIES_NOT_FOUND));
            }
        };
        let Some(kcal_per_100g) = extract_average_number(&answer) else {
            tracing::info!(user_id = %user_id, product = %product, answer = %answer, "No number in estimate");
            return FoodLookup::Done(OutgoingResponse::text(CALORIES_NOT_FOUND));
        };

        let reply = OutgoingResponse::text(format!(
            "🍽 _{product}_: ~{kcal_per_100g} ккал на 100 г.\nСколько грамм вы съели/выпили?"
        ));
        FoodLookup::AwaitGrams {
            session: FoodLogSession::new(product, kcal_per_100g),
            reply,
        }
    }

    /// Grams answer for an open food session.
    pub async fn complete_food(
        &self,
        user_id: &UserId,
        session: &FoodLogSession,
        input: &str,
    ) -> FoodCompletion {
        let Some(grams) = parse_positive(input.trim()) else {
            return FoodCompletion::Reprompt(OutgoingResponse::text(GRAMS_REPROMPT));
        };
        let calories = session.calories_for(grams);

        let updated = self
            .store
            .update(user_id, &mut |r| r.ledger.logged_calories += calories)
            .await;
        if updated.is_none() {
            return FoodCompletion::Logged(OutgoingResponse::text(NO_PROFILE));
        }

        tracing::debug!(user_id = %user_id, product = %session.product, grams, calories, "Food logged");
        FoodCompletion::Logged(OutgoingResponse::text(format!(
            "✅ Записано: {calories:.1} ккал - _{}_.",
            session.product
        )))
    }

    /// `/log_workout <type> <minutes>`
    pub async fn log_workout(&self, user_id: &UserId, args: &str) -> OutgoingResponse {
        if self.store.get(user_id).await.is_none() {
            return OutgoingResponse::text(NO_PROFILE);
        }
        let parts: Vec<&str> = args.split_whitespace().collect();
        let [kind, minutes] = parts.as_slice() else {
            return OutgoingResponse::text(WORKOUT_USAGE);
        };
        let Some(minutes) = parse_non_negative(minutes) else {
            return OutgoingResponse::text(WORKOUT_USAGE);
        };
        let Some(kind) = WorkoutKind::parse(kind) else {
            return OutgoingResponse::text(format!(
                "Неизвестный тип тренировки. Доступные: {}.",
                WorkoutKind::catalogue()
            ));
        };

        let effect = WorkoutEffect::of(kind, minutes);
        let updated = self
            .store
            .update(user_id, &mut |r| {
                r.ledger.burned_calories = r.ledger.burned_calories.saturating_add(effect.burned_kcal);
                r.ledger.additional_water_goal_ml = r
                    .ledger
                    .additional_water_goal_ml
                    .saturating_add(effect.extra_water_ml);
            })
            .await;
        if updated.is_none() {
            return OutgoingResponse::text(NO_PROFILE);
        }

        let mut text = format!(
            "🏋️‍♂️ {} {minutes} мин — {} ккал сожжено.",
            capitalize(kind.label()),
            effect.burned_kcal
        );
        if effect.extra_water_ml > 0 {
            text.push_str(&format!(
                "\n*Дополнительно:* выпейте {} мл воды.",
                effect.extra_water_ml
            ));
        }
        OutgoingResponse::text(text)
    }

    /// Current snapshot for a user, or `None` without a profile.
    pub async fn snapshot(&self, user_id: &UserId) -> Option<ProgressSnapshot> {
        let record = self.store.get(user_id).await?;
        let temp = self.temperature_for(&record).await;
        Some(ProgressSnapshot::from_record(&record, temp))
    }

    /// `/check_progress`
    pub async fn check_progress(&self, user_id: &UserId) -> OutgoingResponse {
        let Some(s) = self.snapshot(user_id).await else {
            return OutgoingResponse::text(NO_PROFILE);
        };
        OutgoingResponse::text(format!(
            "🎯 *Прогресс*:\n\n\
             💧 *Вода:*\n\
             - Выпито: {} мл из {} мл.\n\
             - Осталось: {} мл.\n\n\
             🔥 *Калории:*\n\
             - Потреблено: {:.1} ккал из {} ккал.\n\
             - Сожжено: {} ккал.\n\
             - Баланс: {:.1} ккал.",
            s.water.logged_ml,
            s.water.goal_ml,
            s.water.remaining_ml,
            s.calories.logged,
            s.calories.goal,
            s.calories.burned,
            s.calories.balance,
        ))
    }

    /// `/progress_graphs`: render and attach the chart.
    pub async fn progress_graphs(&self, user_id: &UserId) -> OutgoingResponse {
        let Some(snapshot) = self.snapshot(user_id).await else {
            return OutgoingResponse::text(NO_PROFILE);
        };
        match self.charts.render(user_id, &snapshot).await {
            Ok(path) => OutgoingResponse::text(CHART_CAPTION).with_attachment(path),
            Err(e) => {
                tracing::error!(user_id = %user_id, "Chart rendering failed: {}", e);
                OutgoingResponse::text(CHART_FAILED)
            }
        }
    }
}

/// `20` for whole degrees, `27.4` otherwise.
fn format_temperature(celsius: f64) -> String {
    if celsius.fract() == 0.0 {
        format!("{celsius:.0}")
    } else {
        format!("{celsius:.1}")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

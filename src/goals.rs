//! Daily goal computation.
//!
//! Calorie goal: Mifflin-St Jeor basal metabolic rate.
//! Water goal: body weight, activity and ambient temperature.

use serde::Serialize;

use crate::store::Gender;
use crate::weather::WeatherService;

/// Temperature assumed when the weather lookup fails.
pub const DEFAULT_AMBIENT_TEMP_C: f64 = 20.0;

/// Millilitres of water per kilogram of body weight.
const WATER_ML_PER_KG: u32 = 30;
/// Extra water per full 30 minutes of daily activity.
const WATER_ML_PER_ACTIVITY_BLOCK: u32 = 500;
/// Extra water above `WARM_THRESHOLD_C`.
const WARM_BONUS_ML: u32 = 500;
/// Further extra water above `HOT_THRESHOLD_C`.
const HOT_BONUS_ML: u32 = 1000;
const WARM_THRESHOLD_C: f64 = 25.0;
const HOT_THRESHOLD_C: f64 = 30.0;

/// Daily calorie goal (kcal) from the Mifflin-St Jeor equation.
///
/// The fractional part is truncated, not rounded.
pub fn calorie_goal(weight: u32, height: u32, age: u32, gender: Gender) -> u32 {
    let offset = match gender {
        Gender::Male => 5.0,
        Gender::Female => -161.0,
    };
    let bmr = 10.0 * f64::from(weight) + 6.25 * f64::from(height) - 5.0 * f64::from(age) + offset;
    // Saturating cast: absurd inputs floor at 0 instead of wrapping.
    bmr.trunc() as u32
}

/// Daily water goal (ml).
pub fn water_goal(
    weight: u32,
    activity_minutes: u32,
    additional_water_goal_ml: u32,
    ambient_temp_c: f64,
) -> u32 {
    let mut goal = additional_water_goal_ml
        .saturating_add(weight.saturating_mul(WATER_ML_PER_KG))
        .saturating_add(WATER_ML_PER_ACTIVITY_BLOCK.saturating_mul(activity_minutes / 30));
    if ambient_temp_c > WARM_THRESHOLD_C {
        goal = goal.saturating_add(WARM_BONUS_ML);
    }
    if ambient_temp_c > HOT_THRESHOLD_C {
        goal = goal.saturating_add(HOT_BONUS_ML);
    }
    goal
}

/// Ambient temperature used for a water goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub celsius: f64,
    /// True when the lookup failed and `DEFAULT_AMBIENT_TEMP_C` was substituted.
    pub fallback: bool,
}

impl TemperatureReading {
    pub fn fallback() -> Self {
        Self {
            celsius: DEFAULT_AMBIENT_TEMP_C,
            fallback: true,
        }
    }
}

/// Resolve the current temperature for a city.
///
/// Never fails: any geocoding or weather error degrades to
/// `DEFAULT_AMBIENT_TEMP_C` with `fallback = true`.
pub async fn ambient_temperature(weather: &dyn WeatherService, city: &str) -> TemperatureReading {
    let coords = match weather.geocode(city).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(city = %city, "Geocoding failed, using default temperature: {}", e);
            return TemperatureReading::fallback();
        }
    };

    match weather.current_temperature(coords).await {
        Ok(celsius) => TemperatureReading {
            celsius,
            fallback: false,
        },
        Err(e) => {
            tracing::warn!(city = %city, "Weather lookup failed, using default temperature: {}", e);
            TemperatureReading::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calorie_goal_male() {
        // 10*80 + 6.25*180 - 5*30 + 5 = 1780
        assert_eq!(calorie_goal(80, 180, 30, Gender::Male), 1780);
    }

    #[test]
    fn calorie_goal_female() {
        // 10*60 + 6.25*165 - 5*25 - 161 = 1345.25
        assert_eq!(calorie_goal(60, 165, 25, Gender::Female), 1345);
    }

    #[test]
    fn calorie_goal_truncates_not_rounds() {
        // 10*70 + 6.25*175 - 5*40 + 5 = 1598.75
        assert_eq!(calorie_goal(70, 175, 40, Gender::Male), 1598);
    }

    #[test]
    fn calorie_goal_is_deterministic() {
        let a = calorie_goal(72, 181, 33, Gender::Female);
        let b = calorie_goal(72, 181, 33, Gender::Female);
        assert_eq!(a, b);
    }

    #[test]
    fn calorie_goal_floors_at_zero() {
        assert_eq!(calorie_goal(1, 1, 120, Gender::Female), 0);
    }

    #[test]
    fn water_goal_base() {
        // 70*30 + 500*(45/30) = 2100 + 500
        assert_eq!(water_goal(70, 45, 0, 20.0), 2600);
    }

    #[test]
    fn water_goal_includes_workout_extra() {
        assert_eq!(water_goal(70, 0, 400, 20.0), 2500);
    }

    #[test]
    fn water_goal_temperature_boundaries() {
        let base = water_goal(70, 0, 0, 20.0);
        assert_eq!(water_goal(70, 0, 0, 25.0), base);
        assert_eq!(water_goal(70, 0, 0, 25.1), base + 500);
        assert_eq!(water_goal(70, 0, 0, 30.0), base + 500);
        assert_eq!(water_goal(70, 0, 0, 30.1), base + 1500);
    }

    #[test]
    fn water_goal_monotonic() {
        let temps = [-10.0, 0.0, 20.0, 25.0, 25.5, 30.0, 31.0, 40.0];
        for pair in temps.windows(2) {
            assert!(water_goal(70, 30, 0, pair[0]) <= water_goal(70, 30, 0, pair[1]));
        }
        for w in 40..120 {
            assert!(water_goal(w, 30, 0, 22.0) <= water_goal(w + 1, 30, 0, 22.0));
        }
        for m in 0..200 {
            assert!(water_goal(70, m, 0, 22.0) <= water_goal(70, m + 1, 0, 22.0));
        }
    }

    #[test]
    fn fallback_reading_uses_default() {
        let reading = TemperatureReading::fallback();
        assert_eq!(reading.celsius, DEFAULT_AMBIENT_TEMP_C);
        assert!(reading.fallback);
    }
}

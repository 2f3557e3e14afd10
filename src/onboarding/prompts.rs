//! User-facing text for the profile dialogue.

use super::state::OnboardingStep;
use crate::store::UserRecord;

/// Button text that asks for the calorie goal to be computed from the profile.
pub const AUTO_CALORIE_GOAL: &str = "Рассчитывать автоматически";

const GREETING: &str = "Привет! Я помогу рассчитать дневные нормы воды и калорий!";

/// Question asked when the dialogue enters `step`.
pub fn step_prompt(step: OnboardingStep) -> &'static str {
    match step {
        OnboardingStep::Weight => "Введите ваш вес (в кг):",
        OnboardingStep::Height => "Введите ваш рост (в см):",
        OnboardingStep::Age => "Введите ваш возраст:",
        OnboardingStep::Activity => "Сколько минут активности у вас в день?",
        OnboardingStep::City => "В каком городе вы находитесь?",
        OnboardingStep::Gender => "Какой у вас пол? (м/ж)",
        OnboardingStep::CalorieGoal => {
            "Введите вашу цель по калориям (или выберите автоматический расчет):"
        }
        OnboardingStep::Committed => "_Ваш профиль сохранен!_",
    }
}

/// Re-prompt shown when an answer for `step` does not validate.
///
/// City errors carry the geocoder's reason and are built by [`city_error`].
pub fn step_error(step: OnboardingStep) -> &'static str {
    match step {
        OnboardingStep::Weight => "Вес должен быть натуральным числом. Попробуйте снова.",
        OnboardingStep::Height => "Рост должен быть натуральным числом. Попробуйте снова.",
        OnboardingStep::Age => "Возраст должен быть натуральным числом. Попробуйте снова.",
        OnboardingStep::Activity => {
            "Активность должна быть целым неотрицательным числом. Попробуйте снова."
        }
        OnboardingStep::City => "Ошибка при поиске города.",
        OnboardingStep::Gender => "Введите 'м' для мужского или 'ж' для женского пола.",
        OnboardingStep::CalorieGoal => {
            "Цель калорий должна быть натуральным числом. Попробуйте снова."
        }
        OnboardingStep::Committed => "Профиль уже сохранен.",
    }
}

pub fn city_error(reason: &str) -> String {
    format!("Ошибка при поиске города: {reason}")
}

/// Pick the Russian plural form for `value`: `[one, few, many]`
/// (год / года / лет).
pub fn declension<'a>(value: i64, forms: [&'a str; 3]) -> &'a str {
    let value = value.unsigned_abs();
    if (11..=19).contains(&(value % 100)) {
        return forms[2];
    }
    match value % 10 {
        1 => forms[0],
        2..=4 => forms[1],
        _ => forms[2],
    }
}

fn age_with_unit(age: u32) -> String {
    format!("{age} {}", declension(i64::from(age), ["год", "года", "лет"]))
}

/// Profile card sent once onboarding commits.
pub fn profile_saved(record: &UserRecord) -> String {
    let p = &record.profile;
    format!(
        "{}\n\n\
         *Вес:* {} кг\n\
         *Рост:* {} см\n\
         *Возраст:* {}\n\
         *Активность:* {} мин/день\n\
         *Город:* {}\n\
         *Пол:* {}\n\
         *Цель калорий:* {} ккал/день",
        step_prompt(OnboardingStep::Committed),
        p.weight,
        p.height,
        age_with_unit(p.age),
        p.activity_minutes,
        p.city,
        p.gender.label(),
        record.effective_calorie_goal(),
    )
}

/// `/start` reply. Known users also get their saved profile.
pub fn welcome(record: Option<&UserRecord>) -> String {
    let Some(record) = record else {
        return format!("{GREETING}\nНапиши /set_profile, чтобы начать.");
    };
    let p = &record.profile;
    let mut card = format!(
        "{GREETING}\n\n\
         📊 *Ваш профиль*\n\
         Вес: {} кг\n\
         Рост: {} см\n\
         Возраст: {}\n\
         Активность: {} мин/день\n\
         Город: {}\n\
         Пол: {}",
        p.weight,
        p.height,
        age_with_unit(p.age),
        p.activity_minutes,
        p.city,
        p.gender.label(),
    );
    if let Some(goal) = record.calorie_goal {
        card.push_str(&format!("\nЦель калорий: {goal} ккал/день"));
    }
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::model::fixtures;

    const YEARS: [&str; 3] = ["год", "года", "лет"];

    #[test]
    fn declension_forms() {
        assert_eq!(declension(1, YEARS), "год");
        assert_eq!(declension(21, YEARS), "год");
        assert_eq!(declension(2, YEARS), "года");
        assert_eq!(declension(34, YEARS), "года");
        assert_eq!(declension(5, YEARS), "лет");
        assert_eq!(declension(30, YEARS), "лет");
    }

    #[test]
    fn declension_teens_use_many() {
        for n in [11, 12, 14, 19, 111, 114] {
            assert_eq!(declension(n, YEARS), "лет", "{n}");
        }
    }

    #[test]
    fn declension_ignores_sign() {
        assert_eq!(declension(-1, YEARS), "год");
        assert_eq!(declension(-13, YEARS), "лет");
    }

    #[test]
    fn every_step_has_prompt_and_error() {
        use OnboardingStep::*;
        for step in [Weight, Height, Age, Activity, City, Gender, CalorieGoal] {
            assert!(!step_prompt(step).is_empty());
            assert!(!step_error(step).is_empty());
        }
    }

    #[test]
    fn city_error_includes_reason() {
        assert_eq!(
            city_error("City not found"),
            "Ошибка при поиске города: City not found"
        );
    }

    #[test]
    fn saved_card_lists_all_fields() {
        let card = profile_saved(&fixtures::record());
        assert!(card.starts_with("_Ваш профиль сохранен!_"));
        assert!(card.contains("*Вес:* 80 кг"));
        assert!(card.contains("*Возраст:* 30 лет"));
        assert!(card.contains("*Город:* Москва"));
        assert!(card.contains("*Пол:* Мужской"));
        assert!(card.contains("*Цель калорий:* 2200 ккал/день"));
    }

    #[test]
    fn welcome_for_new_user_points_to_set_profile() {
        let text = welcome(None);
        assert!(text.contains("/set_profile"));
        assert!(!text.contains("Ваш профиль"));
    }

    #[test]
    fn welcome_for_known_user_shows_profile() {
        let text = welcome(Some(&fixtures::record()));
        assert!(text.contains("Ваш профиль"));
        assert!(text.contains("Возраст: 30 лет"));
        assert!(text.contains("Цель калорий: 2200 ккал/день"));
    }
}

//! Calorie estimation through a completion model.
//!
//! The tracker asks a language model for the energy density of a free-text
//! product name and reads the first number (or the midpoint of the first
//! range) out of the reply.

pub mod extract;
pub mod yandex;

pub use extract::extract_average_number;
pub use yandex::YandexGptEstimator;

use async_trait::async_trait;

use crate::error::EstimatorError;

/// Free-text calorie estimation collaborator.
#[async_trait]
pub trait CalorieEstimator: Send + Sync {
    /// Raw model answer to "how many kcal per 100 g of `product`".
    async fn estimate(&self, product: &str) -> Result<String, EstimatorError>;
}

/// Prompt asking for a single bare number.
pub fn calorie_prompt(product: &str) -> String {
    format!(
        "Сколько ккал на 100г в среднем содержится в продукте: \"{product}\". \
         Если нет точного ответа, оцени примерно. \
         Отправь только значение числом - без пояснений и рассуждений. \
         Не пиши никаких других чисел в ответе."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_quotes_product() {
        let prompt = calorie_prompt("банан");
        assert!(prompt.contains("\"банан\""));
        assert!(prompt.contains("только значение числом"));
    }
}

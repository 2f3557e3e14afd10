//! Per-user dialogue state.
//!
//! A user has at most one open dialogue: either the onboarding questions or
//! a food lookup waiting for grams. Opening one replaces the other.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::onboarding::OnboardingSession;
use crate::store::UserId;
use crate::tracker::FoodLogSession;

/// The dialogue currently open for a user.
#[derive(Debug, Clone)]
pub enum Conversation {
    Onboarding(OnboardingSession),
    AwaitingFoodWeight(FoodLogSession),
}

impl Conversation {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Onboarding(_) => "onboarding",
            Self::AwaitingFoodWeight(_) => "awaiting_food_weight",
        }
    }
}

/// Open dialogues keyed by user.
#[derive(Default)]
pub struct ConversationRegistry {
    open: RwLock<HashMap<UserId, Conversation>>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the user's dialogue. The caller puts it back with
    /// [`open`](Self::open) if it should stay open.
    pub async fn take(&self, user_id: &UserId) -> Option<Conversation> {
        self.open.write().await.remove(user_id)
    }

    /// Open `conversation`, replacing whatever the user had.
    pub async fn open(&self, user_id: UserId, conversation: Conversation) {
        if let Some(previous) = self.open.write().await.insert(user_id.clone(), conversation) {
            tracing::debug!(user_id = %user_id, replaced = previous.kind(), "Dialogue replaced");
        }
    }

    /// Close the user's dialogue, if any. Returns whether one was open.
    pub async fn close(&self, user_id: &UserId) -> bool {
        self.take(user_id).await.is_some()
    }

    /// Kind of the user's open dialogue, without touching it.
    pub async fn kind_of(&self, user_id: &UserId) -> Option<&'static str> {
        self.open.read().await.get(user_id).map(Conversation::kind)
    }

    pub async fn len(&self) -> usize {
        self.open.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.open.read().await.is_empty()
    }
}

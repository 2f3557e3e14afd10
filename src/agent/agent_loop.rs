//! Main agent loop: receives messages from every channel, routes each one
//! to onboarding or a tracking command, and sends the reply back.
//!
//! Every user gets a worker task fed by a queue, so one user's messages are
//! handled in arrival order while different users proceed in parallel. A
//! per-user lock additionally guards `handle_message` for direct callers.
//! Workers exit after a quiet period and their queue and lock are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::agent::conversation::{Conversation, ConversationRegistry};
use crate::agent::submission::{Command, Submission, SubmissionParser};
use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse, StatusUpdate};
use crate::charts::ChartRenderer;
use crate::error::Error;
use crate::eventlog::EventLog;
use crate::llm::CalorieEstimator;
use crate::onboarding::{OnboardingManager, StepOutcome, prompts};
use crate::store::{UserId, UserStore};
use crate::tracker::{FoodCompletion, FoodLookup, TrackingCommands};
use crate::weather::WeatherService;

/// How long in-flight handlers get to finish after shutdown is requested.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// A user's worker exits after this long without messages.
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

type UserQueue = mpsc::UnboundedReceiver<IncomingMessage>;

pub const HELP_TEXT: &str = "Доступные команды:\n\
    /set_profile - настроить профиль\n\
    /log_water <мл> - записать выпитую воду\n\
    /log_food <продукт> - записать еду\n\
    /log_workout <тип> <минуты> - записать тренировку\n\
    /check_progress - прогресс за сегодня\n\
    /progress_graphs - графики прогресса\n\
    /help - эта справка";

const UNKNOWN_COMMAND: &str = "Неизвестная команда. Список команд: /help";
const NO_OPEN_DIALOGUE: &str = "Не понимаю сообщение. Список команд: /help";
const ESTIMATING: &str = "Ищу калорийность...";

/// Core dependencies for the agent.
///
/// Bundles the shared components to reduce argument count.
pub struct AgentDeps {
    pub store: Arc<dyn UserStore>,
    pub weather: Arc<dyn WeatherService>,
    pub estimator: Arc<dyn CalorieEstimator>,
    pub charts: Arc<dyn ChartRenderer>,
    pub events: Arc<EventLog>,
}

/// The tracker bot: one instance serves every user on every channel.
pub struct Agent {
    store: Arc<dyn UserStore>,
    events: Arc<EventLog>,
    channels: Arc<ChannelManager>,
    onboarding: OnboardingManager,
    tracking: Arc<TrackingCommands>,
    conversations: ConversationRegistry,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    idle_timeout: Duration,
}

impl Agent {
    /// Create a new agent.
    pub fn new(deps: AgentDeps, channels: ChannelManager) -> Self {
        let onboarding = OnboardingManager::new(deps.store.clone(), deps.weather.clone());
        let tracking = Arc::new(TrackingCommands::new(
            deps.store.clone(),
            deps.weather,
            deps.estimator,
            deps.charts,
        ));
        Self {
            store: deps.store,
            events: deps.events,
            channels: Arc::new(channels),
            onboarding,
            tracking,
            conversations: ConversationRegistry::new(),
            user_locks: Mutex::new(HashMap::new()),
            idle_timeout: IDLE_TIMEOUT,
        }
    }

    /// Override how long an idle user's worker lingers.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Tracking commands, shared with the HTTP API.
    pub fn tracking(&self) -> Arc<TrackingCommands> {
        self.tracking.clone()
    }

    pub fn conversations(&self) -> &ConversationRegistry {
        &self.conversations
    }

    // ── Main loop ───────────────────────────────────────────────────

    /// Run until every channel stream ends or `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;
        let mut queues: HashMap<UserId, mpsc::UnboundedSender<IncomingMessage>> = HashMap::new();
        let mut workers: JoinSet<(UserId, UserQueue)> = JoinSet::new();

        tracing::info!(channels = self.channels.len(), "Tracker ready and listening");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                Some(joined) = workers.join_next(), if !workers.is_empty() => match joined {
                    Ok((user_id, rx)) => self.retire_worker(&mut queues, &mut workers, user_id, rx).await,
                    // The stale sender is replaced on the user's next message.
                    Err(e) => tracing::error!("User worker failed: {}", e),
                },
                msg = message_stream.next() => {
                    let Some(message) = msg else {
                        tracing::info!("All channel streams ended, shutting down...");
                        break;
                    };
                    self.enqueue(&mut queues, &mut workers, message);
                }
            }
        }

        // Closing the queues lets each worker finish what it already has.
        drop(queues);
        tracing::info!(workers = workers.len(), "Agent shutting down...");
        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while workers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(pending = workers.len(), "Aborting handlers still in flight");
            workers.shutdown().await;
        }
        self.channels.shutdown_all().await;

        Ok(())
    }

    /// Hand `message` to its user's worker, starting one if none is running.
    fn enqueue(
        self: &Arc<Self>,
        queues: &mut HashMap<UserId, mpsc::UnboundedSender<IncomingMessage>>,
        workers: &mut JoinSet<(UserId, UserQueue)>,
        message: IncomingMessage,
    ) {
        let user_id = UserId::from(message.user_id.as_str());
        let message = match queues.get(&user_id) {
            Some(tx) => match tx.send(message) {
                Ok(()) => return,
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive until the worker below starts.
        let _ = tx.send(message);
        queues.insert(user_id.clone(), tx);
        workers.spawn(self.clone().serve_user(user_id, rx));
    }

    /// A worker went idle. Restart it if messages slipped in meanwhile,
    /// otherwise forget the user's queue and lock.
    async fn retire_worker(
        self: &Arc<Self>,
        queues: &mut HashMap<UserId, mpsc::UnboundedSender<IncomingMessage>>,
        workers: &mut JoinSet<(UserId, UserQueue)>,
        user_id: UserId,
        rx: UserQueue,
    ) {
        if !rx.is_empty() {
            workers.spawn(self.clone().serve_user(user_id, rx));
            return;
        }
        queues.remove(&user_id);
        let mut locks = self.user_locks.lock().await;
        if locks
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&user_id);
        }
        tracing::debug!(user_id = %user_id, "Idle worker retired");
    }

    /// Handle one user's messages in arrival order. Returns the queue once it
    /// has been empty for `idle_timeout`, or once it is closed.
    async fn serve_user(
        self: Arc<Self>,
        user_id: UserId,
        mut rx: UserQueue,
    ) -> (UserId, UserQueue) {
        while let Ok(Some(message)) = tokio::time::timeout(self.idle_timeout, rx.recv()).await {
            let response = self.handle_message(&message).await;
            if let Err(e) = self.channels.respond(&message, response).await {
                self.events
                    .log_exception(&format!("ID{} -- Reply failed", message.user_id), &e)
                    .await;
            }
        }
        (user_id, rx)
    }

    /// Users that currently hold a per-user lock entry.
    pub async fn tracked_users(&self) -> usize {
        self.user_locks.lock().await.len()
    }

    async fn lock_for(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        self.user_locks
            .lock()
            .await
            .entry(user_id.clone())
            .or_default()
            .clone()
    }

    // ── Message dispatch ────────────────────────────────────────────

    /// Handle one inbound message and produce the reply.
    pub async fn handle_message(&self, message: &IncomingMessage) -> OutgoingResponse {
        let user_id = UserId::from(message.user_id.as_str());
        let lock = self.lock_for(&user_id).await;
        let _guard = lock.lock().await;

        self.events
            .info(&format!("ID{user_id} -- Received: {}", message.content))
            .await;

        match SubmissionParser::parse(&message.content) {
            Submission::UserInput { content } => self.continue_dialogue(&user_id, &content).await,
            Submission::UnknownCommand { name } => {
                tracing::debug!(user_id = %user_id, command = %name, "Unknown command");
                OutgoingResponse::text(UNKNOWN_COMMAND)
            }
            Submission::Command(command) => {
                if command.interrupts_dialogue()
                    && let Some(open) = self.conversations.take(&user_id).await
                {
                    tracing::debug!(user_id = %user_id, dialogue = open.kind(), "Dialogue closed by command");
                }
                self.run_command(&user_id, message, command).await
            }
        }
    }

    async fn run_command(
        &self,
        user_id: &UserId,
        message: &IncomingMessage,
        command: Command,
    ) -> OutgoingResponse {
        match command {
            Command::Start => {
                let record = self.store.get(user_id).await;
                OutgoingResponse::text(prompts::welcome(record.as_ref()))
            }
            Command::Help => OutgoingResponse::text(HELP_TEXT),
            Command::SetProfile => {
                let (session, reply) = self.onboarding.start();
                self.conversations
                    .open(user_id.clone(), Conversation::Onboarding(session))
                    .await;
                reply
            }
            Command::LogWater { args } => self.tracking.log_water(user_id, &args).await,
            Command::LogFood { args } => {
                if !args.trim().is_empty()
                    && let Err(e) = self
                        .channels
                        .send_status(
                            &message.channel,
                            StatusUpdate::Thinking(ESTIMATING.to_string()),
                            &message.metadata,
                        )
                        .await
                {
                    tracing::debug!(user_id = %user_id, "Status update not delivered: {}", e);
                }
                match self.tracking.log_food(user_id, &args).await {
                    FoodLookup::Done(reply) => reply,
                    FoodLookup::AwaitGrams { session, reply } => {
                        self.conversations
                            .open(user_id.clone(), Conversation::AwaitingFoodWeight(session))
                            .await;
                        reply
                    }
                }
            }
            Command::LogWorkout { args } => self.tracking.log_workout(user_id, &args).await,
            Command::CheckProgress => self.tracking.check_progress(user_id).await,
            Command::ProgressGraphs => self.tracking.progress_graphs(user_id).await,
        }
    }

    /// Feed free text to the user's open dialogue.
    async fn continue_dialogue(&self, user_id: &UserId, content: &str) -> OutgoingResponse {
        let Some(conversation) = self.conversations.take(user_id).await else {
            return OutgoingResponse::text(NO_OPEN_DIALOGUE);
        };

        match conversation {
            Conversation::Onboarding(mut session) => {
                let outcome = self
                    .onboarding
                    .process_answer(user_id, &mut session, content)
                    .await;
                match outcome {
                    StepOutcome::Committed { reply, .. } => {
                        self.events
                            .info(&format!("ID{user_id} -- Profile saved"))
                            .await;
                        reply
                    }
                    StepOutcome::Reprompt(reply) | StepOutcome::Advanced(reply) => {
                        self.conversations
                            .open(user_id.clone(), Conversation::Onboarding(session))
                            .await;
                        reply
                    }
                }
            }
            Conversation::AwaitingFoodWeight(session) => {
                match self.tracking.complete_food(user_id, &session, content).await {
                    FoodCompletion::Logged(reply) => reply,
                    FoodCompletion::Reprompt(reply) => {
                        self.conversations
                            .open(user_id.clone(), Conversation::AwaitingFoodWeight(session))
                            .await;
                        reply
                    }
                }
            }
        }
    }
}

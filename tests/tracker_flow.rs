//! End-to-end tests for the tracker: messages go through the real agent
//! loop, onboarding and tracking commands, with stub collaborators standing
//! in for the weather service, the calorie estimator and the chat transport.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use daily_tracker::agent::{Agent, AgentDeps};
use daily_tracker::channels::{
    Channel, ChannelManager, IncomingMessage, MessageStream, OutgoingResponse, ReplyKeyboard,
    StatusUpdate,
};
use daily_tracker::charts::SvgChartRenderer;
use daily_tracker::error::{ChannelError, EstimatorError, WeatherError};
use daily_tracker::eventlog::EventLog;
use daily_tracker::llm::CalorieEstimator;
use daily_tracker::routes::{ApiState, api_routes};
use daily_tracker::scheduler;
use daily_tracker::store::{InMemoryUserStore, UserId, UserStore};
use daily_tracker::weather::{Coordinates, WeatherService};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Weather stub: every city but "Атлантида" exists; temperature is fixed or
/// unavailable.
struct StubWeather {
    celsius: Option<f64>,
}

#[async_trait]
impl WeatherService for StubWeather {
    async fn geocode(&self, city: &str) -> Result<Coordinates, WeatherError> {
        if city == "Атлантида" {
            return Err(WeatherError::CityNotFound);
        }
        Ok(Coordinates { lat: 55.75, lon: 37.62 })
    }

    async fn current_temperature(&self, _coords: Coordinates) -> Result<f64, WeatherError> {
        self.celsius.ok_or(WeatherError::InvalidApiKey)
    }
}

/// Estimator stub that answers with a fixed text.
struct StubEstimator(&'static str);

#[async_trait]
impl CalorieEstimator for StubEstimator {
    async fn estimate(&self, _product: &str) -> Result<String, EstimatorError> {
        Ok(self.0.to_string())
    }
}

/// Channel that replays a script and records every reply.
struct ScriptedChannel {
    script: Mutex<VecDeque<IncomingMessage>>,
    replies: Mutex<Vec<(String, OutgoingResponse)>>,
    statuses: Mutex<Vec<StatusUpdate>>,
}

impl ScriptedChannel {
    fn new(script: &[(&str, &str)]) -> Arc<Self> {
        let script = script
            .iter()
            .map(|(user, text)| IncomingMessage::new("scripted", *user, *text))
            .collect();
        Arc::new(Self {
            script: Mutex::new(script),
            replies: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
        })
    }

    fn replies_to(&self, user: &str) -> Vec<OutgoingResponse> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == user)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let messages: Vec<_> = self.script.lock().unwrap().drain(..).collect();
        Ok(Box::pin(stream::iter(messages)))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.replies
            .lock()
            .unwrap()
            .push((msg.user_id.clone(), response));
        Ok(())
    }

    async fn send_status(
        &self,
        status: StatusUpdate,
        _metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        self.statuses.lock().unwrap().push(status);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

struct Harness {
    agent: Arc<Agent>,
    store: Arc<dyn UserStore>,
    dir: tempfile::TempDir,
}

async fn harness(
    celsius: Option<f64>,
    estimate: &'static str,
    channel: Option<Arc<ScriptedChannel>>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let deps = AgentDeps {
        store: store.clone(),
        weather: Arc::new(StubWeather { celsius }),
        estimator: Arc::new(StubEstimator(estimate)),
        charts: Arc::new(SvgChartRenderer::new(dir.path().join("graphs"))),
        events: Arc::new(EventLog::open(dir.path().join("bot.log")).await.unwrap()),
    };
    let mut channels = ChannelManager::new();
    if let Some(channel) = channel {
        channels.add(channel);
    }
    Harness {
        agent: Arc::new(Agent::new(deps, channels)),
        store,
        dir,
    }
}

impl Harness {
    async fn say(&self, user: &str, text: &str) -> OutgoingResponse {
        self.agent
            .handle_message(&IncomingMessage::new("test", user, text))
            .await
    }

    async fn onboard(&self, user: &str) {
        self.say(user, "/set_profile").await;
        for answer in ["80", "180", "30", "60", "Москва", "м", "2200"] {
            self.say(user, answer).await;
        }
        assert!(self.store.get(&UserId::from(user)).await.is_some());
    }
}

#[tokio::test]
async fn invalid_answer_does_not_advance() {
    let h = harness(Some(20.0), "250", None).await;
    h.say("1", "/set_profile").await;

    let reply = h.say("1", "-5").await;
    assert!(reply.content.contains("Вес"));
    let reply = h.say("1", "80").await;
    assert!(reply.content.contains("рост"), "expected height prompt, got {}", reply.content);

    let reply = h.say("1", "Атлантида").await;
    assert!(reply.content.contains("рост") || reply.content.contains("Рост"));
}

#[tokio::test]
async fn unknown_city_is_reprompted_with_reason() {
    let h = harness(Some(20.0), "250", None).await;
    h.say("1", "/set_profile").await;
    for answer in ["80", "180", "30", "60"] {
        h.say("1", answer).await;
    }
    let reply = h.say("1", "Атлантида").await;
    assert_eq!(reply.content, "Ошибка при поиске города: City not found");
    let reply = h.say("1", "Москва").await;
    assert!(reply.content.contains("пол"));
}

#[tokio::test]
async fn restarting_onboarding_discards_answers() {
    let h = harness(Some(20.0), "250", None).await;
    h.say("1", "/set_profile").await;
    h.say("1", "95").await;
    h.say("1", "190").await;

    let reply = h.say("1", "/set_profile").await;
    assert!(reply.content.contains("вес"));
    for answer in ["80", "180", "30", "60", "Москва", "ж", "Рассчитывать автоматически"] {
        h.say("1", answer).await;
    }

    let record = h.store.get(&UserId::from("1")).await.unwrap();
    assert_eq!(record.profile.weight, 80);
    assert_eq!(record.profile.height, 180);
    // 10*80 + 6.25*180 - 5*30 - 161
    assert_eq!(record.calorie_goal, Some(1614));
}

#[tokio::test]
async fn commit_removes_keyboard_and_tracking_requires_profile() {
    let h = harness(Some(20.0), "250", None).await;
    let reply = h.say("1", "/log_water 250").await;
    assert_eq!(
        reply.content,
        "Сначала настройте профиль с помощью команды /set_profile."
    );

    h.say("1", "/set_profile").await;
    for answer in ["80", "180", "30", "60", "Москва"] {
        h.say("1", answer).await;
    }
    let reply = h.say("1", "м").await;
    assert_eq!(
        reply.keyboard,
        Some(ReplyKeyboard::Suggest(vec!["Рассчитывать автоматически".to_string()]))
    );
    let reply = h.say("1", "2200").await;
    assert_eq!(reply.keyboard, Some(ReplyKeyboard::Remove));
}

#[tokio::test]
async fn food_estimate_times_grams() {
    let h = harness(Some(20.0), "250", None).await;
    h.onboard("1").await;

    let reply = h.say("1", "/log_food творог").await;
    assert!(reply.content.contains("250"));
    let reply = h.say("1", "сто пятьдесят").await;
    assert!(reply.content.contains("граммов"));
    h.say("1", "150").await;

    let record = h.store.get(&UserId::from("1")).await.unwrap();
    assert_eq!(record.ledger.logged_calories, 375.0);
}

#[tokio::test]
async fn range_estimate_uses_floor_of_average() {
    let h = harness(Some(20.0), "Примерно 52–57 ккал", None).await;
    h.onboard("1").await;

    let reply = h.say("1", "/log_food яблоко").await;
    assert!(reply.content.contains("54"));
    h.say("1", "200").await;
    let record = h.store.get(&UserId::from("1")).await.unwrap();
    assert_eq!(record.ledger.logged_calories, 108.0);
}

#[tokio::test]
async fn unparsable_estimate_opens_no_session() {
    let h = harness(Some(20.0), "не знаю", None).await;
    h.onboard("1").await;

    let reply = h.say("1", "/log_food камень").await;
    assert_eq!(reply.content, "Калорийность продукта не найдена.");
    assert!(h.agent.conversations().is_empty().await);
}

#[tokio::test]
async fn workout_thresholds() {
    let h = harness(Some(20.0), "250", None).await;
    h.onboard("1").await;

    h.say("1", "/log_workout бег 30").await;
    let record = h.store.get(&UserId::from("1")).await.unwrap();
    assert_eq!(record.ledger.burned_calories, 300);
    assert_eq!(record.ledger.additional_water_goal_ml, 200);

    h.say("1", "/log_workout running 29").await;
    let record = h.store.get(&UserId::from("1")).await.unwrap();
    assert_eq!(record.ledger.burned_calories, 590);
    assert_eq!(record.ledger.additional_water_goal_ml, 200);
}

#[tokio::test]
async fn negative_balance_in_progress_report() {
    let h = harness(Some(20.0), "120", None).await;
    h.onboard("1").await;
    h.say("1", "/log_food хлебец").await;
    h.say("1", "100").await;
    h.say("1", "/log_workout бег 30").await;

    let reply = h.say("1", "/check_progress").await;
    assert!(reply.content.contains("Баланс: -180.0 ккал"), "{}", reply.content);
}

#[tokio::test]
async fn weather_outage_still_reports_water_goal() {
    let h = harness(None, "250", None).await;
    h.onboard("1").await;

    let reply = h.say("1", "/log_water 400").await;
    assert!(reply.content.contains("Не удалось определить погоду"));
    assert!(reply.content.contains("Норма воды: 3400 мл"));
    assert!(reply.content.contains("Осталось до цели: 3000 мл"));
}

#[tokio::test]
async fn reset_zeroes_ledger_keeps_profile() {
    let h = harness(Some(20.0), "250", None).await;
    h.onboard("1").await;
    h.say("1", "/log_water 500").await;
    h.say("1", "/log_workout плавание 60").await;

    let before = h.store.get(&UserId::from("1")).await.unwrap();
    scheduler::reset_all(h.store.as_ref()).await;
    let after = h.store.get(&UserId::from("1")).await.unwrap();

    assert!(after.ledger.is_zero());
    assert_eq!(after.profile, before.profile);
    assert_eq!(after.calorie_goal, Some(2200));
}

#[tokio::test]
async fn progress_graphs_attach_a_chart() {
    let h = harness(Some(20.0), "250", None).await;
    h.onboard("1").await;

    let reply = h.say("1", "/progress_graphs").await;
    let path = reply.attachment.expect("chart attached");
    assert!(path.starts_with(h.dir.path().join("graphs")));
    let svg = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(svg.contains("Прогресс по воде"));
}

#[tokio::test]
async fn agent_loop_serves_users_in_order() {
    let channel = ScriptedChannel::new(&[
        ("a", "/set_profile"),
        ("b", "/start"),
        ("a", "80"),
        ("a", "180"),
        ("a", "30"),
        ("a", "0"),
        ("a", "Москва"),
        ("a", "м"),
        ("a", "2000"),
        ("a", "/log_food творог"),
        ("a", "150"),
        ("b", "привет"),
    ]);
    let h = harness(Some(20.0), "250", Some(channel.clone())).await;

    timeout(TEST_TIMEOUT, h.agent.clone().run(CancellationToken::new()))
        .await
        .expect("agent loop hung")
        .unwrap();

    let a = channel.replies_to("a");
    assert_eq!(a.len(), 10);
    assert!(a[0].content.contains("вес"));
    assert!(a[7].content.contains("Ваш профиль сохранен"));
    assert!(a[9].content.contains("375.0"));

    let b = channel.replies_to("b");
    assert_eq!(b.len(), 2);
    assert!(b[0].content.contains("/set_profile"));

    let record = h.store.get(&UserId::from("a")).await.unwrap();
    assert_eq!(record.ledger.logged_calories, 375.0);
    assert!(matches!(
        channel.statuses.lock().unwrap().as_slice(),
        [StatusUpdate::Thinking(_)]
    ));

    let log = tokio::fs::read_to_string(h.dir.path().join("bot.log"))
        .await
        .unwrap();
    assert!(log.contains("IDa -- Received: /set_profile"));
    assert!(log.contains("IDb -- Received: привет"));
}

#[tokio::test]
async fn http_api_reports_progress() {
    let h = harness(Some(20.0), "250", None).await;
    h.onboard("42").await;
    h.say("42", "/log_water 1000").await;

    let app = api_routes(ApiState {
        store: h.store.clone(),
        tracking: h.agent.tracking(),
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base = format!("http://127.0.0.1:{port}");
    let body: serde_json::Value = timeout(
        TEST_TIMEOUT,
        reqwest::get(format!("{base}/api/users/42/progress")),
    )
    .await
    .unwrap()
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(body["water"]["logged_ml"], 1000);
    assert_eq!(body["water"]["remaining_ml"], 2400);

    let missing = reqwest::get(format!("{base}/api/users/7/progress"))
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn charts_land_in_configured_directory() {
    let h = harness(Some(20.0), "250", None).await;
    h.onboard("9").await;
    h.say("9", "/progress_graphs").await;
    let expected: PathBuf = h.dir.path().join("graphs").join("progress_9.svg");
    assert!(expected.exists());
}

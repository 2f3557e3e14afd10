//! Daily reset of the per-user counters.
//!
//! A single background task sleeps until the next fire time of a cron
//! expression (local midnight by default), zeroes every ledger in one store
//! pass, and goes back to sleep. Missed midnights are not caught up after a
//! restart.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ConfigError;
use crate::eventlog::EventLog;
use crate::store::{UserId, UserStore};

fn parse_schedule(schedule: &str) -> Result<cron::Schedule, String> {
    cron::Schedule::from_str(schedule).map_err(|e| format!("invalid cron: {e}"))
}

/// Next fire time of `schedule` strictly after `now`.
pub fn next_reset_after(schedule: &str, now: DateTime<Local>) -> Result<DateTime<Local>, String> {
    parse_schedule(schedule)?
        .after(&now)
        .next()
        .ok_or_else(|| format!("cron schedule '{schedule}' never fires"))
}

/// Zero the ledger of every committed user. Profiles and calorie goals are
/// left alone. Returns the users that were reset.
pub async fn reset_all(store: &dyn UserStore) -> Vec<UserId> {
    let mut reset = Vec::new();
    store
        .for_each_user(&mut |id, record| {
            record.ledger.reset();
            reset.push(id.clone());
        })
        .await;
    reset
}

/// Handle to the running reset task.
pub struct ResetHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ResetHandle {
    /// Token that stops the task when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Daily reset task ended abnormally: {}", e);
        }
    }
}

/// Spawn the reset loop.
pub fn spawn_daily_reset(
    store: Arc<dyn UserStore>,
    events: Arc<EventLog>,
    schedule: &str,
) -> Result<ResetHandle, ConfigError> {
    let parsed = parse_schedule(schedule).map_err(|message| ConfigError::InvalidValue {
        key: "TRACKER_RESET_SCHEDULE".to_string(),
        message,
    })?;
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run(store, events, parsed, cancel.clone()));
    tracing::info!(schedule = %schedule, "Daily reset scheduler started");
    Ok(ResetHandle { cancel, task })
}

async fn run(
    store: Arc<dyn UserStore>,
    events: Arc<EventLog>,
    schedule: cron::Schedule,
    cancel: CancellationToken,
) {
    loop {
        let now = Local::now();
        let Some(next) = schedule.after(&now).next() else {
            tracing::warn!("Reset schedule has no upcoming fire time; stopping");
            break;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::debug!(next = %next, "Next daily reset scheduled");

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Daily reset scheduler shutting down");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                let reset = reset_all(store.as_ref()).await;
                for id in &reset {
                    events.info(&format!("ID{id} -- Reset stats")).await;
                }
                tracing::info!(users = reset.len(), "Daily counters reset");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;
    use crate::store::InMemoryUserStore;
    use crate::store::model::fixtures;

    #[test]
    fn next_midnight_from_evening() {
        let now = Local.with_ymd_and_hms(2024, 5, 10, 23, 59, 58).unwrap();
        let next = next_reset_after("0 0 0 * * *", now).unwrap();
        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
        assert_eq!((next.hour(), next.minute(), next.second()), (0, 0, 0));
    }

    #[test]
    fn exactly_midnight_moves_to_next_day() {
        let now = Local.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        let next = next_reset_after("0 0 0 * * *", now).unwrap();
        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
    }

    #[test]
    fn invalid_schedule_is_error() {
        let err = next_reset_after("every night", Local::now()).unwrap_err();
        assert!(err.starts_with("invalid cron"));
    }

    #[tokio::test]
    async fn reset_all_zeroes_ledger_only() {
        let store = InMemoryUserStore::new();
        let mut record = fixtures::record();
        record.ledger.logged_water_ml = 1200;
        record.ledger.logged_calories = 375.0;
        record.ledger.burned_calories = 300;
        record.ledger.additional_water_goal_ml = 200;
        store.commit(UserId::from("1"), record.clone()).await;
        store.commit(UserId::from("2"), fixtures::record()).await;

        let mut reset = reset_all(&store).await;
        reset.sort();
        assert_eq!(reset, vec![UserId::from("1"), UserId::from("2")]);

        let after = store.get(&UserId::from("1")).await.unwrap();
        assert!(after.ledger.is_zero());
        assert_eq!(after.profile, record.profile);
        assert_eq!(after.calorie_goal, record.calorie_goal);
    }

    #[tokio::test]
    async fn reset_all_on_empty_store() {
        let store = InMemoryUserStore::new();
        assert!(reset_all(&store).await.is_empty());
    }

    #[tokio::test]
    async fn invalid_schedule_refuses_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let events = Arc::new(EventLog::open(dir.path().join("bot.log")).await.unwrap());
        let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        assert!(spawn_daily_reset(store, events, "nope").is_err());
    }

    #[tokio::test]
    async fn task_fires_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("bot.log");
        let events = Arc::new(EventLog::open(&log_path).await.unwrap());
        let store = Arc::new(InMemoryUserStore::new());
        let mut record = fixtures::record();
        record.ledger.logged_water_ml = 500;
        store.commit(UserId::from("7"), record).await;

        // Every second.
        let handle = spawn_daily_reset(store.clone(), events, "* * * * * *").unwrap();

        let mut zeroed = false;
        for _ in 0..30 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if store.get(&UserId::from("7")).await.unwrap().ledger.is_zero() {
                zeroed = true;
                break;
            }
        }
        let token = handle.cancellation_token();
        handle.shutdown().await;

        assert!(zeroed, "reset did not fire within 3s");
        assert!(token.is_cancelled());
        let log = tokio::fs::read_to_string(&log_path).await.unwrap();
        assert!(log.contains("ID7 -- Reset stats"));
    }
}

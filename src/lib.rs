//! Daily Tracker — a chat bot that tracks water, food and workouts against
//! personal daily goals.

pub mod agent;
pub mod channels;
pub mod charts;
pub mod config;
pub mod error;
pub mod eventlog;
pub mod goals;
pub mod llm;
pub mod logging;
pub mod onboarding;
pub mod routes;
pub mod scheduler;
pub mod store;
pub mod tracker;
pub mod weather;

//! Agent module — command parsing, per-user dialogues, and the message loop.

pub mod agent_loop;
pub mod conversation;
pub mod submission;

pub use agent_loop::{Agent, AgentDeps, HELP_TEXT};
pub use conversation::{Conversation, ConversationRegistry};
pub use submission::{Command, Submission, SubmissionParser};

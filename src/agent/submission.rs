//! Submission types for the tracker's dispatcher.
//!
//! Every inbound message is either a slash command (with its raw argument
//! text) or free text that belongs to whichever dialogue is open.

use serde::{Deserialize, Serialize};

/// Parses user input into Submission types.
pub struct SubmissionParser;

impl SubmissionParser {
    /// Parse message content into a Submission.
    pub fn parse(content: &str) -> Submission {
        let trimmed = content.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Submission::UserInput {
                content: trimmed.to_string(),
            };
        };

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        // Telegram appends `@botname` to commands sent in groups.
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let args = args.to_string();

        let command = match name.as_str() {
            "start" => Command::Start,
            "help" | "?" => Command::Help,
            "set_profile" => Command::SetProfile,
            "log_water" => Command::LogWater { args },
            "log_food" => Command::LogFood { args },
            "log_workout" => Command::LogWorkout { args },
            "check_progress" => Command::CheckProgress,
            "progress_graphs" => Command::ProgressGraphs,
            _ => return Submission::UnknownCommand { name },
        };
        Submission::Command(command)
    }
}

/// A recognised slash command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum Command {
    Start,
    Help,
    SetProfile,
    LogWater { args: String },
    LogFood { args: String },
    LogWorkout { args: String },
    CheckProgress,
    ProgressGraphs,
}

impl Command {
    /// Whether the command closes an open dialogue before running.
    ///
    /// `/start` and `/help` are informational and leave it alone.
    pub fn interrupts_dialogue(&self) -> bool {
        !matches!(self, Self::Start | Self::Help)
    }
}

/// A submission to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Submission {
    /// Plain text: an answer for the open dialogue, if any.
    UserInput { content: String },
    Command(Command),
    /// Something that looked like a command but isn't one of ours.
    UnknownCommand { name: String },
}

impl Submission {
    pub fn user_input(content: impl Into<String>) -> Self {
        Self::UserInput {
            content: content.into(),
        }
    }

    pub fn is_command(&self) -> bool {
        !matches!(self, Self::UserInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_user_input() {
        assert_eq!(
            SubmissionParser::parse("  80 \n"),
            Submission::user_input("80")
        );
        assert!(!SubmissionParser::parse("Москва").is_command());
    }

    #[test]
    fn test_parser_bare_commands() {
        assert_eq!(
            SubmissionParser::parse("/start"),
            Submission::Command(Command::Start)
        );
        assert_eq!(
            SubmissionParser::parse("/help"),
            Submission::Command(Command::Help)
        );
        assert_eq!(
            SubmissionParser::parse("/set_profile"),
            Submission::Command(Command::SetProfile)
        );
        assert_eq!(
            SubmissionParser::parse("/check_progress"),
            Submission::Command(Command::CheckProgress)
        );
        assert_eq!(
            SubmissionParser::parse("/progress_graphs"),
            Submission::Command(Command::ProgressGraphs)
        );
    }

    #[test]
    fn test_parser_command_args() {
        assert_eq!(
            SubmissionParser::parse("/log_water 250"),
            Submission::Command(Command::LogWater { args: "250".into() })
        );
        assert_eq!(
            SubmissionParser::parse("/log_food  куриная грудка "),
            Submission::Command(Command::LogFood {
                args: "куриная грудка".into()
            })
        );
        assert_eq!(
            SubmissionParser::parse("/log_workout бег 30"),
            Submission::Command(Command::LogWorkout {
                args: "бег 30".into()
            })
        );
    }

    #[test]
    fn test_parser_missing_args_are_empty() {
        assert_eq!(
            SubmissionParser::parse("/log_water"),
            Submission::Command(Command::LogWater { args: String::new() })
        );
    }

    #[test]
    fn test_parser_case_and_bot_suffix() {
        assert_eq!(
            SubmissionParser::parse("/LOG_WATER@TrackerBot 300"),
            Submission::Command(Command::LogWater { args: "300".into() })
        );
        assert_eq!(
            SubmissionParser::parse("/start@TrackerBot"),
            Submission::Command(Command::Start)
        );
    }

    #[test]
    fn test_parser_unknown_command() {
        assert_eq!(
            SubmissionParser::parse("/weather"),
            Submission::UnknownCommand {
                name: "weather".into()
            }
        );
        assert!(SubmissionParser::parse("/weather").is_command());
    }

    #[test]
    fn test_interrupts_dialogue() {
        assert!(!Command::Start.interrupts_dialogue());
        assert!(!Command::Help.interrupts_dialogue());
        assert!(Command::SetProfile.interrupts_dialogue());
        assert!(Command::CheckProgress.interrupts_dialogue());
        assert!(
            Command::LogWater {
                args: String::new()
            }
            .interrupts_dialogue()
        );
    }
}

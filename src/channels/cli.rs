//! Terminal channel: each stdin line is a message from one local user.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{
    Channel, IncomingMessage, MessageStream, OutgoingResponse, ReplyKeyboard, StatusUpdate,
};
use crate::error::ChannelError;

/// Identity every stdin line is attributed to.
pub const CLI_USER_ID: &str = "local-user";

/// Replies go to stdout, statuses and the prompt to stderr.
#[derive(Default)]
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

/// Render a reply for the terminal. Keyboard buttons become a bracketed hint.
fn render(response: &OutgoingResponse) -> String {
    let mut out = response.content.clone();
    if let Some(ReplyKeyboard::Suggest(buttons)) = &response.keyboard {
        for button in buttons {
            out.push_str(&format!("\n  [{button}]"));
        }
    }
    if let Some(path) = &response.attachment {
        out.push_str(&format!("\n  (file: {})", path.display()));
    }
    out
}

/// Forward non-blank stdin lines until EOF, a read error, or the receiver
/// going away.
async fn read_stdin(tx: tokio::sync::mpsc::UnboundedSender<IncomingMessage>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("stdin read failed: {}", e);
                return;
            }
        };
        let text = line.trim();
        if text.is_empty() {
            prompt();
        } else if tx.send(IncomingMessage::new("cli", CLI_USER_ID, text)).is_err() {
            return;
        }
    }
}

fn prompt() {
    eprint!("> ");
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(read_stdin(tx));
        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        })))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", render(&response));
        prompt();
        Ok(())
    }

    async fn send_status(
        &self,
        status: StatusUpdate,
        _metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        match status {
            StatusUpdate::Thinking(msg) => eprintln!("… {msg}"),
            StatusUpdate::Status(msg) => eprintln!("{msg}"),
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

use std::io;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::data::{AgentEvent, McpConfig};

/// Errors raised while talking to the agent runtime
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to start agent runtime '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode tool provider configuration: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed event from agent runtime ({source}): {line}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("agent runtime exited with {status}: {stderr}")]
    ProcessFailed { status: ExitStatus, stderr: String },
    #[error("i/o error while reading agent runtime: {0}")]
    Io(#[from] io::Error),
}

/// How the agent runtime treats tool permission prompts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    Plan,
    /// Tool providers run locally, so prompts are skipped
    #[default]
    BypassPermissions,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::Plan => "plan",
            PermissionMode::BypassPermissions => "bypassPermissions",
        }
    }
}

/// Everything the agent runtime needs for one run
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub mcp_config: McpConfig,
    pub max_turns: Option<u32>,
    pub permission_mode: PermissionMode,
}

/// Lazy sequence of events from a running agent
///
/// Dropping the stream tells the producer to stop.
pub struct EventStream {
    rx: mpsc::Receiver<Result<AgentEvent, ClientError>>,
}

impl EventStream {
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<AgentEvent, ClientError>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }

    /// Next event, or `None` once the producer has finished
    pub async fn next(&mut self) -> Option<Result<AgentEvent, ClientError>> {
        self.rx.recv().await
    }
}

/// Starts an agent run and hands back its event stream
pub trait AgentClient {
    fn query(&self, request: &AgentRequest) -> Result<EventStream, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_mode_wire_names() {
        assert_eq!(PermissionMode::default().as_str(), "bypassPermissions");
        assert_eq!(PermissionMode::AcceptEdits.as_str(), "acceptEdits");
    }

    #[tokio::test]
    async fn test_stream_ends_when_sender_dropped() {
        let (tx, mut stream) = EventStream::channel(4);
        tx.send(Ok(AgentEvent::Unknown)).await.unwrap();
        drop(tx);

        assert!(matches!(stream.next().await, Some(Ok(AgentEvent::Unknown))));
        assert!(stream.next().await.is_none());
    }
}

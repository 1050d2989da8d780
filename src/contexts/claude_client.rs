use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::agent_client::{AgentClient, AgentRequest, ClientError, EventStream};
use crate::data::AgentEvent;

const EVENT_BUFFER: usize = 64;
const MAX_LINE_IN_ERROR: usize = 200;

/// Runs the `claude` CLI in print mode and reads its stream-json output
#[derive(Debug, Clone)]
pub struct ClaudeCliClient {
    program: String,
}

impl ClaudeCliClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for a request
    pub fn command_args(request: &AgentRequest) -> Result<Vec<String>, ClientError> {
        let mcp_config = request.mcp_config.to_json().map_err(ClientError::Encode)?;

        let mut args = vec![
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--system-prompt".to_string(),
            request.system_prompt.clone(),
        ];
        if let Some(max_turns) = request.max_turns {
            args.push("--max-turns".to_string());
            args.push(max_turns.to_string());
        }
        args.extend([
            "--permission-mode".to_string(),
            request.permission_mode.as_str().to_string(),
            "--mcp-config".to_string(),
            mcp_config,
            "--print".to_string(),
            request.prompt.clone(),
        ]);
        Ok(args)
    }
}

impl AgentClient for ClaudeCliClient {
    fn query(&self, request: &AgentRequest) -> Result<EventStream, ClientError> {
        let args = Self::command_args(request)?;

        debug!(
            program = %self.program,
            providers = ?request.mcp_config.names().collect::<Vec<_>>(),
            max_turns = ?request.max_turns,
            "starting agent runtime"
        );

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ClientError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Io(std::io::Error::other("agent stdout not captured")))?;
        let stderr_task = match child.stderr.take() {
            Some(stderr) => tokio::spawn(async move {
                let mut buf = String::new();
                if let Err(e) = BufReader::new(stderr).read_to_string(&mut buf).await {
                    warn!(error = %e, "failed to read agent runtime stderr");
                }
                buf
            }),
            None => tokio::spawn(async { String::new() }),
        };

        let (tx, stream) = EventStream::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(child, stdout, stderr_task, tx));
        Ok(stream)
    }
}

/// Forwards parsed stdout lines until EOF, an error, or the consumer going away,
/// then waits for the exit status unless the consumer has gone.
/// Returning drops `child`, which kills it if still running.
async fn pump_events(
    mut child: Child,
    stdout: ChildStdout,
    stderr_task: JoinHandle<String>,
    tx: mpsc::Sender<Result<AgentEvent, ClientError>>,
) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = tokio::select! {
            _ = tx.closed() => {
                debug!("event stream dropped, stopping agent runtime");
                return;
            }
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => match AgentEvent::from_line(&line) {
                Ok(Some(event)) => {
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(source) => {
                    let line: String = line.chars().take(MAX_LINE_IN_ERROR).collect();
                    let _ = tx.send(Err(ClientError::Decode { line, source })).await;
                    return;
                }
            },
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(Err(ClientError::Io(e))).await;
                return;
            }
        }
    }

    // stdout can close long before the process exits
    let status = tokio::select! {
        _ = tx.closed() => {
            debug!("event stream dropped after stdout closed, stopping agent runtime");
            return;
        }
        status = child.wait() => status,
    };
    let status = match status {
        Ok(status) => status,
        Err(e) => {
            let _ = tx.send(Err(ClientError::Io(e))).await;
            return;
        }
    };
    debug!(%status, "agent runtime exited");

    if !status.success() {
        let stderr = stderr_task.await.unwrap_or_default();
        let _ = tx
            .send(Err(ClientError::ProcessFailed {
                status,
                stderr: stderr.trim().to_string(),
            }))
            .await;
    }
}

use std::io::{self, Write};
use thiserror::Error;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::agent_client::{AgentClient, AgentRequest, ClientError};
use super::renderer::EventRenderer;
use crate::config::RunBudget;
use crate::data::AgentEvent;
use crate::run_summary::{RunOutcome, RunSummary};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to write agent output: {0}")]
    Output(#[source] io::Error),
}

/// Drives one agent run and relays its events to a renderer
pub struct WorkflowRunner<C: AgentClient> {
    client: C,
    budget: RunBudget,
    cancel: CancellationToken,
}

impl<C: AgentClient> WorkflowRunner<C> {
    pub fn new(client: C, budget: RunBudget, cancel: CancellationToken) -> Self {
        Self {
            client,
            budget,
            cancel,
        }
    }

    /// Submits `request` and renders events until the stream ends, the run is
    /// cancelled, or the time budget runs out.
    ///
    /// The request's turn budget is overridden by the runner's when set.
    pub async fn run<W: Write>(
        &self,
        mut request: AgentRequest,
        renderer: &mut EventRenderer<W>,
    ) -> Result<RunSummary, RunnerError> {
        if self.budget.max_turns.is_some() {
            request.max_turns = self.budget.max_turns;
        }

        let mut summary = RunSummary::begin(&request.prompt);
        info!(
            instruction = %summary.instruction_sha256,
            max_turns = ?request.max_turns,
            timeout = ?self.budget.timeout,
            "submitting workflow to agent"
        );

        let mut stream = self.client.query(&request)?;
        let deadline = self.budget.timeout.map(|timeout| Instant::now() + timeout);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    warn!("run cancelled");
                    return Ok(summary.finish(RunOutcome::Cancelled));
                }
                _ = wait_for(deadline) => {
                    warn!(timeout = ?self.budget.timeout, "run exceeded its time budget");
                    return Ok(summary.finish(RunOutcome::TimedOut));
                }
                next = stream.next() => next,
            };

            let Some(event) = next else {
                break;
            };
            let event = event?;

            summary.observe(&event);
            renderer.render(&event).map_err(RunnerError::Output)?;
            if let AgentEvent::Result(result) = &event {
                debug!(
                    subtype = %result.subtype,
                    turns = result.num_turns,
                    duration_ms = result.duration_ms,
                    "agent reported result"
                );
            }
        }

        let outcome = if summary.has_result() {
            RunOutcome::Completed
        } else {
            warn!("agent stream ended without a result");
            RunOutcome::StreamEnded
        };
        Ok(summary.finish(outcome))
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::{EventStream, PermissionMode};
    use crate::data::McpConfig;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted lines, then optionally keeps the stream open
    struct ScriptedClient {
        lines: Vec<&'static str>,
        hold_open: bool,
        seen_turns: Mutex<Option<Option<u32>>>,
    }

    impl ScriptedClient {
        fn new(lines: Vec<&'static str>) -> Self {
            Self {
                lines,
                hold_open: false,
                seen_turns: Mutex::new(None),
            }
        }

        fn held_open(mut self) -> Self {
            self.hold_open = true;
            self
        }
    }

    impl AgentClient for ScriptedClient {
        fn query(&self, request: &AgentRequest) -> Result<EventStream, ClientError> {
            *self.seen_turns.lock().unwrap() = Some(request.max_turns);
            let (tx, stream) = EventStream::channel(16);
            let lines = self.lines.clone();
            let hold_open = self.hold_open;
            tokio::spawn(async move {
                for line in lines {
                    let event = AgentEvent::from_line(line).unwrap().unwrap();
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
                if hold_open {
                    tx.closed().await;
                }
            });
            Ok(stream)
        }
    }

    fn request() -> AgentRequest {
        AgentRequest {
            prompt: "run the retention workflow".to_string(),
            system_prompt: "persona".to_string(),
            mcp_config: McpConfig::default(),
            max_turns: None,
            permission_mode: PermissionMode::BypassPermissions,
        }
    }

    const TOOL: &str = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"1","name":"mcp__kumo-rfm__predict","input":{}}]}}"#;
    const TEXT: &str = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Wrote emails.json"}]}}"#;
    const RESULT: &str = r#"{"type":"result","subtype":"success","num_turns":3,"total_cost_usd":0.0421}"#;

    #[tokio::test]
    async fn test_completed_run_renders_everything() {
        let runner = WorkflowRunner::new(
            ScriptedClient::new(vec![r#"{"type":"system","subtype":"init"}"#, TOOL, TEXT, RESULT]),
            RunBudget::default(),
            CancellationToken::new(),
        );
        let mut renderer = EventRenderer::new(Vec::new());

        let summary = runner.run(request(), &mut renderer).await.unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();

        assert_eq!(summary.outcome, Some(RunOutcome::Completed));
        assert_eq!(summary.tool_calls, vec!["mcp__kumo-rfm__predict"]);
        assert_eq!(
            output,
            "[Tool: mcp__kumo-rfm__predict]\nWrote emails.json\n\n\nReview complete. Total cost: $0.0421\n"
        );
    }

    #[tokio::test]
    async fn test_stream_without_result() {
        let runner = WorkflowRunner::new(
            ScriptedClient::new(vec![TOOL]),
            RunBudget::default(),
            CancellationToken::new(),
        );
        let mut renderer = EventRenderer::new(Vec::new());
        let summary = runner.run(request(), &mut renderer).await.unwrap();
        assert_eq!(summary.outcome, Some(RunOutcome::StreamEnded));
        assert!(!summary.succeeded());
    }

    #[tokio::test]
    async fn test_cancellation_stops_run() {
        let cancel = CancellationToken::new();
        let runner = WorkflowRunner::new(
            ScriptedClient::new(vec![TOOL]).held_open(),
            RunBudget::default(),
            cancel.clone(),
        );
        let mut renderer = EventRenderer::new(Vec::new());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let summary = runner.run(request(), &mut renderer).await.unwrap();
        assert_eq!(summary.outcome, Some(RunOutcome::Cancelled));
        assert_eq!(summary.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_stops_run() {
        let runner = WorkflowRunner::new(
            ScriptedClient::new(vec![TEXT]).held_open(),
            RunBudget {
                max_turns: None,
                timeout: Some(Duration::from_millis(50)),
            },
            CancellationToken::new(),
        );
        let mut renderer = EventRenderer::new(Vec::new());

        let summary = runner.run(request(), &mut renderer).await.unwrap();
        assert_eq!(summary.outcome, Some(RunOutcome::TimedOut));
        assert_eq!(summary.text_blocks, 1);
    }

    #[tokio::test]
    async fn test_turn_budget_forwarded() {
        let client = ScriptedClient::new(vec![RESULT]);
        let runner = WorkflowRunner::new(client, RunBudget::new(Some(30), None), CancellationToken::new());
        let mut renderer = EventRenderer::new(Vec::new());

        runner.run(request(), &mut renderer).await.unwrap();
        assert_eq!(*runner.client.seen_turns.lock().unwrap(), Some(Some(30)));
    }

    #[tokio::test]
    async fn test_client_error_propagates() {
        struct FailingClient;
        impl AgentClient for FailingClient {
            fn query(&self, _request: &AgentRequest) -> Result<EventStream, ClientError> {
                let (tx, stream) = EventStream::channel(1);
                tokio::spawn(async move {
                    let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
                    let _ = tx
                        .send(Err(ClientError::Decode {
                            line: "{".to_string(),
                            source,
                        }))
                        .await;
                });
                Ok(stream)
            }
        }

        let runner = WorkflowRunner::new(FailingClient, RunBudget::default(), CancellationToken::new());
        let mut renderer = EventRenderer::new(Vec::new());
        let err = runner.run(request(), &mut renderer).await.unwrap_err();
        assert!(matches!(err, RunnerError::Client(ClientError::Decode { .. })));
    }
}

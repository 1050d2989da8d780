//! Record of what a single agent run observed
//!
//! The summary is assembled from the event stream as it is rendered and can be
//! written to disk as JSON after the run ends.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::data::{AgentEvent, ContentBlock};

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// A result event was received
    Completed,
    /// Caller cancelled before a result arrived
    Cancelled,
    /// Time budget elapsed before a result arrived
    TimedOut,
    /// Stream ended cleanly without a result event
    StreamEnded,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Cancelled => "cancelled",
            RunOutcome::TimedOut => "timed_out",
            RunOutcome::StreamEnded => "stream_ended",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// SHA-256 of the instruction that was sent
    pub instruction_sha256: String,
    pub session_id: Option<String>,
    /// Tool names in the order the agent invoked them
    pub tool_calls: Vec<String>,
    pub assistant_messages: usize,
    pub text_blocks: usize,
    pub result_subtype: Option<String>,
    pub is_error: bool,
    pub num_turns: Option<u32>,
    pub total_cost_usd: Option<f64>,
    pub outcome: Option<RunOutcome>,
}

impl RunSummary {
    pub fn begin(instruction: &str) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            instruction_sha256: fingerprint(instruction),
            session_id: None,
            tool_calls: Vec::new(),
            assistant_messages: 0,
            text_blocks: 0,
            result_subtype: None,
            is_error: false,
            num_turns: None,
            total_cost_usd: None,
            outcome: None,
        }
    }

    pub fn observe(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::Assistant(message) => {
                self.assistant_messages += 1;
                if self.session_id.is_none() {
                    self.session_id = message.session_id.clone();
                }
                for block in message.content() {
                    match block {
                        ContentBlock::ToolUse { name, .. } => self.tool_calls.push(name.clone()),
                        ContentBlock::Text { .. } => self.text_blocks += 1,
                        _ => {}
                    }
                }
            }
            AgentEvent::Result(result) => {
                self.result_subtype = Some(result.subtype.clone());
                self.is_error = result.is_error;
                self.num_turns = Some(result.num_turns);
                self.total_cost_usd = result.total_cost_usd;
                if result.session_id.is_some() {
                    self.session_id = result.session_id.clone();
                }
            }
            AgentEvent::System(_) | AgentEvent::User(_) | AgentEvent::Unknown => {}
        }
    }

    pub fn finish(mut self, outcome: RunOutcome) -> Self {
        self.finished_at = Some(Utc::now());
        self.outcome = Some(outcome);
        self
    }

    pub fn has_result(&self) -> bool {
        self.result_subtype.is_some()
    }

    /// Whether the run ended with a successful result event
    pub fn succeeded(&self) -> bool {
        self.outcome == Some(RunOutcome::Completed) && !self.is_error
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize run summary")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write run summary to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read run summary {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse run summary")
    }
}

fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

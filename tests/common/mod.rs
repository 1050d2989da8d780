#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Serializes writing executable scripts against spawning processes so a
/// forked child never holds a script open for writing (ETXTBSY).
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

pub fn spawn_lock() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Writes an executable shell script standing in for the agent runtime
pub fn fake_runtime(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-claude");
    let _guard = spawn_lock();
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Script body that records its arguments and replays `lines` on stdout
pub fn replay_body(args_file: &Path, lines: &[&str]) -> String {
    let mut body = format!("printf '%s\\n' \"$@\" > '{}'\n", args_file.display());
    body.push_str("cat <<'EOF'\n");
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    body.push_str("EOF");
    body
}

pub const INIT: &str = r#"{"type":"system","subtype":"init","session_id":"s-1","mcp_servers":[{"name":"supabase","status":"connected"},{"name":"kumo-rfm","status":"connected"}]}"#;
pub const TOOL_SQL: &str = r#"{"type":"assistant","session_id":"s-1","message":{"content":[{"type":"tool_use","id":"t1","name":"mcp__supabase__execute_sql","input":{"query":"select customer_id from policies"}}]}}"#;
pub const TOOL_RESULT: &str = r#"{"type":"user","session_id":"s-1","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":"[]"}]}}"#;
pub const TEXT_DONE: &str = r#"{"type":"assistant","session_id":"s-1","message":{"content":[{"type":"text","text":"Saved emails.json"}]}}"#;
pub const RESULT: &str = r#"{"type":"result","subtype":"success","is_error":false,"num_turns":5,"duration_ms":1200,"session_id":"s-1","total_cost_usd":1.2345}"#;

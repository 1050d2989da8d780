use std::io::{self, Write};

use crate::data::{AgentEvent, ContentBlock, ResultMessage};

/// Writes agent events to a console-like sink as they arrive
pub struct EventRenderer<W: Write> {
    out: W,
}

impl<W: Write> EventRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn render(&mut self, event: &AgentEvent) -> io::Result<()> {
        match event {
            AgentEvent::Assistant(message) => {
                for block in message.content() {
                    self.render_block(block)?;
                }
            }
            AgentEvent::Result(result) => self.render_result(result)?,
            AgentEvent::System(_) | AgentEvent::User(_) | AgentEvent::Unknown => {}
        }
        Ok(())
    }

    fn render_block(&mut self, block: &ContentBlock) -> io::Result<()> {
        match block {
            ContentBlock::ToolUse { name, .. } => writeln!(self.out, "[Tool: {}]", name),
            ContentBlock::Text { text } => {
                writeln!(self.out, "{}", text)?;
                self.out.flush()
            }
            ContentBlock::ToolResult { .. } | ContentBlock::Thinking { .. } | ContentBlock::Unknown => {
                Ok(())
            }
        }
    }

    fn render_result(&mut self, result: &ResultMessage) -> io::Result<()> {
        if let Some(cost) = result.total_cost_usd {
            writeln!(self.out, "\n\nReview complete. Total cost: ${:.4}", cost)?;
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_lines(lines: &[&str]) -> String {
        let mut renderer = EventRenderer::new(Vec::new());
        for line in lines {
            let event = AgentEvent::from_line(line).unwrap().unwrap();
            renderer.render(&event).unwrap();
        }
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_tool_use_renders_bracketed_name() {
        let output = render_lines(&[
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"X","input":{}}]}}"#,
        ]);
        assert!(output.lines().any(|line| line == "[Tool: X]"));
    }

    #[test]
    fn test_text_renders_verbatim() {
        let output = render_lines(&[
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hello"}]}}"#,
        ]);
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn test_blocks_render_in_order() {
        let output = render_lines(&[
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Looking up policies"},{"type":"tool_use","id":"t1","name":"mcp__supabase__list_tables","input":{}},{"type":"thinking","thinking":"hidden"}]}}"#,
        ]);
        assert_eq!(output, "Looking up policies\n[Tool: mcp__supabase__list_tables]\n");
    }

    #[test]
    fn test_result_with_cost() {
        let output = render_lines(&[r#"{"type":"result","subtype":"success","total_cost_usd":1.2345}"#]);
        assert!(output.lines().any(|line| line.contains("$1.2345")));
        assert_eq!(output, "\n\nReview complete. Total cost: $1.2345\n");
    }

    #[test]
    fn test_cost_rounded_to_four_places() {
        let output = render_lines(&[r#"{"type":"result","subtype":"success","total_cost_usd":0.5}"#]);
        assert!(output.contains("$0.5000"));
    }

    #[test]
    fn test_result_without_cost_renders_nothing() {
        let output = render_lines(&[r#"{"type":"result","subtype":"success","is_error":false}"#]);
        assert!(output.is_empty());
    }

    #[test]
    fn test_system_user_and_unknown_render_nothing() {
        let output = render_lines(&[
            r#"{"type":"system","subtype":"init"}"#,
            r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":"rows"}]}}"#,
            r#"{"type":"rate_limit","retry_after":3}"#,
        ]);
        assert!(output.is_empty());
    }
}

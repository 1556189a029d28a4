use serde::Deserialize;
use serde_json::Value;

/// Events from Claude CLI's stream-json output format
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "assistant")]
    Assistant {
        message: AssistantMessage,
        #[serde(default)]
        session_id: String,
    },

    #[serde(rename = "user")]
    User {
        #[serde(default)]
        message: Option<UserMessage>,
    },

    #[serde(rename = "result")]
    Result {
        #[serde(default)]
        subtype: String,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        is_error: bool,
    },

    #[serde(rename = "system")]
    System {
        #[serde(default)]
        subtype: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
pub struct UserMessage {
    #[serde(default)]
    pub content: UserContent,
}

/// User message content is either plain text or a list of blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    Blocks(Vec<ContentBlock>),
    Text(String),
}

impl Default for UserContent {
    fn default() -> Self {
        UserContent::Blocks(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "tool_use")]
    ToolUse {
        name: String,
        #[serde(default)]
        input: Value,
        #[serde(default)]
        id: String,
    },

    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_result")]
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },

    /// Thinking blocks, images and anything newer than this parser.
    #[serde(other)]
    Other,
}

/// One typed event from a running agent session.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A fragment of assistant prose.
    Text(String),
    /// The agent started a tool call.
    ToolStart { name: String, input: Value },
    /// The in-flight tool call finished.
    ToolResult { is_error: bool, content: String },
    /// The agent's explicit terminal status.
    Finished {
        is_error: bool,
        result: Option<String>,
    },
}

impl StreamEvent {
    /// Flatten a wire event into the typed events the session runner consumes.
    pub fn into_agent_events(self) -> Vec<AgentEvent> {
        match self {
            StreamEvent::Assistant { message, .. } => message
                .content
                .into_iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(AgentEvent::Text(text)),
                    ContentBlock::ToolUse { name, input, .. } => {
                        Some(AgentEvent::ToolStart { name, input })
                    }
                    ContentBlock::ToolResult { .. } | ContentBlock::Other => None,
                })
                .collect(),
            StreamEvent::User { message } => match message.map(|m| m.content) {
                Some(UserContent::Blocks(blocks)) => blocks
                    .into_iter()
                    .filter_map(|block| match block {
                        ContentBlock::ToolResult {
                            content, is_error, ..
                        } => Some(AgentEvent::ToolResult {
                            is_error,
                            content: render_tool_content(&content),
                        }),
                        _ => None,
                    })
                    .collect(),
                Some(UserContent::Text(_)) | None => Vec::new(),
            },
            StreamEvent::Result {
                result, is_error, ..
            } => vec![AgentEvent::Finished { is_error, result }],
            StreamEvent::System { .. } => Vec::new(),
        }
    }
}

/// Parse one line of stream-json output.
///
/// Lines that are not stream-json events (stderr noise, partial writes) yield
/// no events.
pub fn parse_line(line: &str) -> Vec<AgentEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<StreamEvent>(trimmed) {
        Ok(event) => event.into_agent_events(),
        Err(e) => {
            tracing::debug!(error = %e, line = trimmed, "ignoring non stream-json line");
            Vec::new()
        }
    }
}

/// Render a tool result payload as text.
///
/// Strings are used as-is, block lists contribute their `text` fields, and
/// anything else is serialized.
pub fn render_tool_content(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item.get("text").and_then(|t| t.as_str()) {
                Some(text) => text.to_string(),
                None => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Get an emoji for a tool
pub fn tool_emoji(name: &str) -> &'static str {
    match name {
        "Read" => "\u{1F4D6}",
        "Write" => "\u{1F4DD}",
        "Edit" => "\u{270F}\u{FE0F}",
        "Bash" => "\u{2699}\u{FE0F}",
        "Glob" => "\u{1F50D}",
        "Grep" => "\u{1F50E}",
        "Task" => "\u{1F916}",
        _ => "\u{1F527}",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assistant_tool_use() {
        let json = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read","input":{"file_path":"/foo/bar.rs"},"id":"123"}]},"session_id":"abc"}"#;
        let events = parse_line(json);
        assert_eq!(events.len(), 1);
        match &events[0] {
            AgentEvent::ToolStart { name, input } => {
                assert_eq!(name, "Read");
                assert_eq!(input["file_path"], "/foo/bar.rs");
            }
            other => panic!("Expected ToolStart, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_assistant_text_and_tool_in_order() {
        let json = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Let me look"},{"type":"tool_use","name":"Bash","input":{"command":"ls"},"id":"1"}]}}"#;
        let events = parse_line(json);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], AgentEvent::Text("Let me look".into()));
        assert!(matches!(&events[1], AgentEvent::ToolStart { name, .. } if name == "Bash"));
    }

    #[test]
    fn test_parse_tool_result_string_content() {
        let json = r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"1","content":"file contents","is_error":false}]}}"#;
        assert_eq!(
            parse_line(json),
            vec![AgentEvent::ToolResult {
                is_error: false,
                content: "file contents".into()
            }]
        );
    }

    #[test]
    fn test_parse_tool_result_block_content_with_error() {
        let json = r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"1","content":[{"type":"text","text":"line one"},{"type":"text","text":"line two"}],"is_error":true}]}}"#;
        assert_eq!(
            parse_line(json),
            vec![AgentEvent::ToolResult {
                is_error: true,
                content: "line one\nline two".into()
            }]
        );
    }

    #[test]
    fn test_parse_result_event() {
        let json = r#"{"type":"result","subtype":"success","result":"All done","is_error":false}"#;
        assert_eq!(
            parse_line(json),
            vec![AgentEvent::Finished {
                is_error: false,
                result: Some("All done".into())
            }]
        );
    }

    #[test]
    fn test_unknown_blocks_and_system_events_are_skipped() {
        let thinking = r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"hmm"}]}}"#;
        assert!(parse_line(thinking).is_empty());
        let system = r#"{"type":"system","subtype":"init","tools":[]}"#;
        assert!(parse_line(system).is_empty());
    }

    #[test]
    fn test_non_json_lines_are_ignored() {
        assert!(parse_line("warning: something on stderr").is_empty());
        assert!(parse_line("").is_empty());
        assert!(parse_line(r#"{"type":"assistant","mess"#).is_empty());
    }

    #[test]
    fn test_render_tool_content() {
        assert_eq!(render_tool_content(&Value::Null), "");
        assert_eq!(render_tool_content(&serde_json::json!({"ok": true})), r#"{"ok":true}"#);
    }

    #[test]
    fn test_tool_emoji_fallback() {
        assert_eq!(tool_emoji("Read"), "\u{1F4D6}");
        assert_eq!(tool_emoji("SomethingNew"), "\u{1F527}");
    }
}

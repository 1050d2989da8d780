use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::config::OUTPUT_FILE_NAME;

/// Four-step retention workflow handed to the agent
pub const DEFAULT_INSTRUCTION_TEMPLATE: &str = r#"
Hello Claude! I'm working with an insurance company to try and retain customers whose policies are about to expire.

I have our data in a bunch of different csv files available here:
{{input.data_dir}}
The files are called {{input.file_names}}.
Do not infer results without executing the corresponding tool.

I want you to execute a multi-step workflow. Make sure you do exactly what I ask, and do not create/do unnecessary things

1) First, access my Supabase tables and make a list of the customer_id's whose policies are going to expire within the next 30 days.
2) Then, predict the likelihood of each of these customer_id's to renew their policies within the next 60 days.
3) For the customer_id's most likely to renew, predict what insurance policy they might be most interested in purchasing next.
4) Then, generate emails for each of these customers offering discounts for their current policy to encourage them to renew, and
    offer them a bundling discount for their current insurance, as well as the insurance they are most likely to buy next. Make sure the emails
    don't seem spammy- keep them concise and professional, avoiding whimsical things like emojis. Store these in a JSON file called {{input.output_file}}, and put that
    in this current directory, which is {{input.output_dir}}. That is the only output
    that you should create.
{{input.notes?}}"#;

/// Errors that can occur while populating an instruction template
#[derive(Debug, PartialEq, Eq)]
pub enum PopulateError {
    MissingMandatoryPlaceholder(String),
    InvalidPlaceholderPath(String),
    InvalidInput(String),
}

impl fmt::Display for PopulateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PopulateError::MissingMandatoryPlaceholder(ph) => {
                write!(f, "Required placeholder '{}' could not be resolved", ph)
            }
            PopulateError::InvalidPlaceholderPath(path) => {
                write!(f, "Invalid path '{}' in placeholder", path)
            }
            PopulateError::InvalidInput(details) => {
                write!(f, "Instruction input could not be serialized: {}", details)
            }
        }
    }
}

impl std::error::Error for PopulateError {}

/// Values substituted into the instruction template
#[derive(Debug, Clone, Serialize)]
pub struct InstructionInput {
    pub data_dir: String,
    pub file_names: String,
    pub output_dir: String,
    pub output_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl InstructionInput {
    pub fn new(data_dir: &Path, files: &[String], output_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.display().to_string(),
            file_names: files.join(", "),
            output_dir: output_dir.display().to_string(),
            output_file: OUTPUT_FILE_NAME.to_string(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Builds the default workflow instruction for the given data and output locations
pub fn build_instruction(
    data_dir: &Path,
    files: &[String],
    output_dir: &Path,
) -> Result<String, PopulateError> {
    populate(
        DEFAULT_INSTRUCTION_TEMPLATE,
        &InstructionInput::new(data_dir, files, output_dir),
    )
}

/// Replaces placeholders in a template with values from `input`
///
/// Supports:
/// - Mandatory: {{input.prop_name}}
/// - Optional: {{input.prop_name?}}
/// - Nested: {{input.prop1.prop2}}
pub fn populate<T: Serialize>(template: &str, input: &T) -> Result<String, PopulateError> {
    let input_json =
        serde_json::to_value(input).map_err(|e| PopulateError::InvalidInput(e.to_string()))?;

    let mut result = template.to_string();
    let mut offset = 0;

    while let Some(start) = result[offset..].find("{{") {
        let start = offset + start;
        let Some(end_pos) = result[start..].find("}}") else {
            break;
        };
        let end = start + end_pos;

        let placeholder = result[start + 2..end].trim();
        let (path, is_optional) = match placeholder.strip_suffix('?') {
            Some(path) => (path, true),
            None => (placeholder, false),
        };
        if !is_placeholder_path(path) {
            // literal braces, e.g. a JSON sample in the template
            offset = start + 2;
            continue;
        }

        match resolve_path(&input_json, path)? {
            Some(value) => {
                let replacement = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    serde_json::Value::Null => String::new(),
                    other => serde_json::to_string(other)
                        .map_err(|e| PopulateError::InvalidInput(e.to_string()))?,
                };
                result.replace_range(start..end + 2, &replacement);
                offset = start + replacement.len();
            }
            None if is_optional => {
                result.replace_range(start..end + 2, "");
                offset = start;
            }
            None => {
                return Err(PopulateError::MissingMandatoryPlaceholder(path.to_string()));
            }
        }
    }

    Ok(result)
}

/// Dotted identifier path such as `input.notes`
fn is_placeholder_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Resolves a dotted path rooted at "input"
fn resolve_path<'a>(
    value: &'a serde_json::Value,
    path: &str,
) -> Result<Option<&'a serde_json::Value>, PopulateError> {
    let mut parts = path.split('.');
    if parts.next() != Some("input") {
        return Err(PopulateError::InvalidPlaceholderPath(path.to_string()));
    }

    let mut current = value;
    for part in parts {
        match current.get(part) {
            Some(v) => current = v,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

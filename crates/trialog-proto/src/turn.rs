//! Turn records and the trial summary record.
//!
//! Records are stored as JSON, one record per list element, so any reader can
//! decode them without sharing code with the writer.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub input: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, input: Value) -> Self {
        Self {
            name: name.into(),
            input,
        }
    }
}

/// One unit of conversation. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTurn")]
pub struct Turn {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Turn {
    fn bare(role: Role) -> Self {
        Self {
            role,
            content: None,
            tool_calls: None,
            tool_results: None,
            tool_name: None,
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::bare(Role::User)
        }
    }

    /// An assistant message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::bare(Role::Assistant)
        }
    }

    /// An assistant turn that only requests tool calls.
    pub fn assistant_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::bare(Role::Assistant)
        }
    }

    /// The output of one tool invocation.
    pub fn tool_result(tool_name: impl Into<String>, output: Value) -> Self {
        Self {
            tool_results: Some(output),
            tool_name: Some(tool_name.into()),
            ..Self::bare(Role::Tool)
        }
    }

    /// Attaches tool calls to this turn.
    #[must_use]
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(calls);
        self
    }

    /// Attaches tool results to this turn.
    #[must_use]
    pub fn with_tool_results(mut self, results: Value) -> Self {
        self.tool_results = Some(results);
        self
    }

    /// Encodes the turn as a storable record.
    pub fn to_record(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a stored record.
    pub fn from_record(record: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(record)?)
    }
}

/// Final outcome of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub reward: f64,
}

impl SummaryRecord {
    pub fn new(reward: f64) -> Self {
        Self { reward }
    }

    pub fn to_record(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_record(record: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(record)?)
    }
}

/// Wire shape accepted when decoding a turn.
///
/// Besides the current layout this accepts assistant steps written by older
/// harness revisions, which carried `msg_content` and a paired
/// `fn_call_to_fn_output` list instead of `role`/`content`/`tool_calls`.
#[derive(Deserialize)]
struct RawTurn {
    role: Option<Role>,
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
    tool_results: Option<Value>,
    tool_name: Option<String>,
    // Outer `Some` means the key was present, even with a null value.
    #[serde(default, deserialize_with = "present")]
    msg_content: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    fn_call_to_fn_output: Option<Option<Vec<LegacyFnCall>>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct LegacyFnCall {
    function_call: LegacyFunction,
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
struct LegacyFunction {
    name: String,
    #[serde(default, alias = "input")]
    input_args: Value,
}

impl TryFrom<RawTurn> for Turn {
    type Error = &'static str;

    fn try_from(raw: RawTurn) -> Result<Self, Self::Error> {
        let legacy = raw.msg_content.is_some() || raw.fn_call_to_fn_output.is_some();
        let role = match (raw.role, legacy) {
            (Some(role), _) => role,
            (None, true) => Role::Assistant,
            (None, false) => return Err("record has no role"),
        };

        let mut turn = Turn {
            role,
            content: raw.content.or(raw.msg_content.flatten()),
            tool_calls: raw.tool_calls,
            tool_results: raw.tool_results,
            tool_name: raw.tool_name,
        };

        if let Some(pairs) = raw
            .fn_call_to_fn_output
            .flatten()
            .filter(|pairs| !pairs.is_empty())
        {
            let (calls, outputs): (Vec<_>, Vec<_>) = pairs
                .into_iter()
                .map(|pair| {
                    (
                        ToolCall::new(pair.function_call.name, pair.function_call.input_args),
                        pair.value,
                    )
                })
                .unzip();
            turn.tool_calls.get_or_insert_with(Vec::new).extend(calls);
            if turn.tool_results.is_none() {
                turn.tool_results = Some(Value::Array(outputs));
            }
        }

        Ok(turn)
    }
}

//! Rebuilds a displayable transcript from raw turns.
//!
//! Tool calls and tool results are correlated one-to-one in emission order:
//! every call joins a FIFO of pending calls and every result resolves the
//! oldest pending one. Output is append-only, so the viewer can feed newly
//! fetched turns through the same `Correlator` without touching items it has
//! already rendered.

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::VecDeque;
use trialog_proto::{Role, ToolCall, Turn};

/// One renderable entry of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayItem {
    /// Plain text from any role.
    Message { role: Role, text: String },
    /// A call whose result arrived in the same turn.
    ToolExchange {
        seq: usize,
        name: String,
        input: Value,
        output: Value,
    },
    /// A call still waiting for its result at the time it was rendered.
    ToolCall { seq: usize, name: String, input: Value },
    /// A result; `seq` names the call it answers, if any was pending.
    ToolResult {
        seq: Option<usize>,
        name: Option<String>,
        output: Value,
    },
    /// A stored record the reader could not decode.
    Unreadable { index: u64, error: String },
}

impl DisplayItem {
    /// Role the item is grouped under in the viewer.
    pub fn role(&self) -> Role {
        match self {
            DisplayItem::Message { role, .. } => *role,
            DisplayItem::ToolExchange { .. } | DisplayItem::ToolCall { .. } => Role::Assistant,
            DisplayItem::ToolResult { .. } => Role::Tool,
            DisplayItem::Unreadable { .. } => Role::Tool,
        }
    }

    /// Structured form of tool items, `None` for plain messages.
    pub fn structured(&self) -> Option<Value> {
        match self {
            DisplayItem::ToolExchange {
                name,
                input,
                output,
                ..
            } => Some(json!({ "name": name, "input": input, "output": output })),
            DisplayItem::ToolCall { name, input, .. } => {
                Some(json!({ "name": name, "input": input }))
            }
            DisplayItem::ToolResult { name, output, .. } => Some(match name {
                Some(name) => json!({ "name": name, "output": output }),
                None => json!({ "output": output }),
            }),
            DisplayItem::Message { .. } | DisplayItem::Unreadable { .. } => None,
        }
    }
}

/// Incremental call/result correlation state for one conversation.
#[derive(Debug, Clone, Default)]
pub struct Correlator {
    next_seq: usize,
    pending: VecDeque<(usize, String)>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls still waiting for a result.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn next_seq(&mut self) -> usize {
        self.next_seq += 1;
        self.next_seq
    }

    fn resolve(&mut self, tool_name: Option<&str>, output: Value, out: &mut Vec<DisplayItem>) {
        let (seq, name) = match self.pending.pop_front() {
            Some((seq, call_name)) => (Some(seq), Some(tool_name.map_or(call_name, str::to_string))),
            None => (None, tool_name.map(str::to_string)),
        };
        out.push(DisplayItem::ToolResult { seq, name, output });
    }

    /// Converts one turn into display items, appending them to `out`.
    pub fn push_turn(&mut self, turn: &Turn, out: &mut Vec<DisplayItem>) {
        if let Some(text) = turn.content.as_deref().filter(|t| !t.is_empty()) {
            if turn.role == Role::Tool && turn.tool_results.is_none() {
                self.resolve(
                    turn.tool_name.as_deref(),
                    Value::String(text.to_string()),
                    out,
                );
                return;
            }
            out.push(DisplayItem::Message {
                role: turn.role,
                text: text.to_string(),
            });
        }

        let calls: &[ToolCall] = turn.tool_calls.as_deref().unwrap_or_default();

        match (turn.role, &turn.tool_results) {
            // Calls answered inside the same turn pair up by position.
            (Role::Assistant, Some(Value::Array(results))) if !calls.is_empty() => {
                let mut results = results.iter();
                for call in calls {
                    let seq = self.next_seq();
                    match results.next() {
                        Some(output) => out.push(DisplayItem::ToolExchange {
                            seq,
                            name: call.name.clone(),
                            input: call.input.clone(),
                            output: output.clone(),
                        }),
                        None => {
                            self.pending.push_back((seq, call.name.clone()));
                            out.push(DisplayItem::ToolCall {
                                seq,
                                name: call.name.clone(),
                                input: call.input.clone(),
                            });
                        }
                    }
                }
                for extra in results {
                    self.resolve(turn.tool_name.as_deref(), extra.clone(), out);
                }
            }
            (_, results) => {
                for call in calls {
                    let seq = self.next_seq();
                    self.pending.push_back((seq, call.name.clone()));
                    out.push(DisplayItem::ToolCall {
                        seq,
                        name: call.name.clone(),
                        input: call.input.clone(),
                    });
                }
                match (turn.role, results) {
                    (_, None) => {}
                    // An assistant step may report several results at once.
                    (Role::Assistant, Some(Value::Array(results))) => {
                        for output in results {
                            self.resolve(turn.tool_name.as_deref(), output.clone(), out);
                        }
                    }
                    (_, Some(output)) => {
                        self.resolve(turn.tool_name.as_deref(), output.clone(), out);
                    }
                }
            }
        }
    }

    /// Converts a batch of turns in order.
    pub fn push_turns(&mut self, turns: &[Turn]) -> Vec<DisplayItem> {
        let mut out = Vec::new();
        for turn in turns {
            self.push_turn(turn, &mut out);
        }
        out
    }
}

/// Reconstructs a complete transcript from scratch.
pub fn reconstruct(turns: &[Turn]) -> Vec<DisplayItem> {
    Correlator::new().push_turns(turns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup(id: &str) -> ToolCall {
        ToolCall::new("lookup", json!({ "id": id }))
    }

    #[test]
    fn plain_messages_keep_order_and_role() {
        let items = reconstruct(&[Turn::user("hello"), Turn::assistant("hi there")]);
        assert_eq!(
            items,
            vec![
                DisplayItem::Message {
                    role: Role::User,
                    text: "hello".to_string()
                },
                DisplayItem::Message {
                    role: Role::Assistant,
                    text: "hi there".to_string()
                },
            ]
        );
    }

    #[test]
    fn results_pair_with_calls_in_emission_order() {
        let turns = vec![
            Turn::assistant_calls(vec![lookup("1"), lookup("2")]),
            Turn::tool_result("lookup", json!("first")),
            Turn::tool_result("lookup", json!("second")),
        ];
        let items = reconstruct(&turns);
        assert_eq!(items.len(), 4);
        assert!(matches!(&items[0], DisplayItem::ToolCall { seq: 1, .. }));
        assert!(matches!(&items[1], DisplayItem::ToolCall { seq: 2, .. }));
        assert_eq!(
            items[2],
            DisplayItem::ToolResult {
                seq: Some(1),
                name: Some("lookup".to_string()),
                output: json!("first")
            }
        );
        assert!(matches!(&items[3], DisplayItem::ToolResult { seq: Some(2), .. }));
    }

    #[test]
    fn same_turn_results_form_exchanges() {
        let turn = Turn::assistant_calls(vec![lookup("1")]).with_tool_results(json!([{"ok": true}]));
        let items = reconstruct(&[turn]);
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].structured(),
            Some(json!({"name": "lookup", "input": {"id": "1"}, "output": {"ok": true}}))
        );
    }

    #[test]
    fn short_result_list_leaves_calls_pending() {
        let turn = Turn::assistant_calls(vec![lookup("1"), lookup("2")])
            .with_tool_results(json!(["only one"]));
        let mut correlator = Correlator::new();
        let items = correlator.push_turns(&[turn]);
        assert!(matches!(&items[0], DisplayItem::ToolExchange { seq: 1, .. }));
        assert!(matches!(&items[1], DisplayItem::ToolCall { seq: 2, .. }));
        assert_eq!(correlator.pending(), 1);
    }

    #[test]
    fn incremental_feeding_matches_batch() {
        let turns = vec![
            Turn::user("find order 42"),
            Turn::assistant_calls(vec![lookup("42")]),
            Turn::tool_result("lookup", json!({"status": "shipped"})),
            Turn::assistant("It shipped."),
        ];

        let batch = reconstruct(&turns);

        let mut correlator = Correlator::new();
        let mut incremental = correlator.push_turns(&turns[..2]);
        incremental.extend(correlator.push_turns(&turns[2..]));

        assert_eq!(batch, incremental);
        assert_eq!(correlator.pending(), 0);
    }

    #[test]
    fn orphan_result_has_no_seq() {
        let items = reconstruct(&[Turn::tool_result("lookup", json!(1))]);
        assert_eq!(
            items[0],
            DisplayItem::ToolResult {
                seq: None,
                name: Some("lookup".to_string()),
                output: json!(1)
            }
        );
    }

    #[test]
    fn tool_text_content_counts_as_result() {
        let mut turn = Turn::tool_result("lookup", Value::Null);
        turn.tool_results = None;
        turn.content = Some("plain output".to_string());
        let items = reconstruct(&[Turn::assistant_calls(vec![lookup("1")]), turn]);
        assert_eq!(
            items[1],
            DisplayItem::ToolResult {
                seq: Some(1),
                name: Some("lookup".to_string()),
                output: json!("plain output")
            }
        );
    }

    #[test]
    fn tool_array_output_is_one_result() {
        let turns = vec![
            Turn::assistant_calls(vec![lookup("1"), lookup("2")]),
            Turn::tool_result("lookup", json!(["a", "b"])),
        ];
        let mut correlator = Correlator::new();
        let items = correlator.push_turns(&turns);
        assert_eq!(items.len(), 3);
        assert_eq!(correlator.pending(), 1);
    }
}

//! # Prompt Adapter
//!
//! Interactive input behind a trait so the edit flow can be driven by a
//! terminal, a script, or a test. Each [`PromptSpec`] asks one question and
//! gets one [`PromptValue`] back.
//!
//! [`collect_interactive_ops`] turns the standard interactive questions into
//! edit ops, so interactive and flag input end up in the same batch.

use std::collections::VecDeque;

use nsc_claims::ResponsePermission;
use nsc_core::{
    format_duration, format_timestamp, parse_data_size, parse_duration, parse_expiry, parse_limit,
};
use thiserror::Error;

use crate::ops::EditOp;

/// Prompt failures. A cancelled prompt aborts the edit.
#[derive(Error, Debug)]
pub enum PromptError {
    /// Input ended or the user aborted.
    #[error("prompt cancelled")]
    Cancelled,

    /// The answer did not fit the question.
    #[error("unexpected answer to {label:?}: {detail}")]
    UnexpectedAnswer {
        /// The question.
        label: String,
        /// What was wrong.
        detail: String,
    },

    /// Interactive mode requested without a prompt.
    #[error("interactive input is not available")]
    Unavailable,

    /// Reading or writing the terminal failed.
    #[error("prompt I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSpec {
    /// Free text with a default.
    Text {
        /// Question shown to the user.
        label: String,
        /// Answer used for empty input.
        default: String,
    },
    /// Yes or no.
    Confirm {
        /// Question shown to the user.
        label: String,
        /// Answer used for empty input.
        default: bool,
    },
    /// Pick one of several options.
    Select {
        /// Question shown to the user.
        label: String,
        /// The choices, in display order.
        options: Vec<String>,
        /// Index used for empty input.
        default: usize,
    },
}

impl PromptSpec {
    /// Text question.
    pub fn text(label: impl Into<String>, default: impl Into<String>) -> Self {
        Self::Text {
            label: label.into(),
            default: default.into(),
        }
    }

    /// Yes/no question.
    pub fn confirm(label: impl Into<String>, default: bool) -> Self {
        Self::Confirm {
            label: label.into(),
            default,
        }
    }

    /// Selection.
    pub fn select(label: impl Into<String>, options: Vec<String>, default: usize) -> Self {
        Self::Select {
            label: label.into(),
            options,
            default,
        }
    }

    /// The question text.
    pub fn label(&self) -> &str {
        match self {
            Self::Text { label, .. } | Self::Confirm { label, .. } | Self::Select { label, .. } => label,
        }
    }
}

/// One answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptValue {
    /// Answer to [`PromptSpec::Text`].
    Text(String),
    /// Answer to [`PromptSpec::Confirm`].
    Bool(bool),
    /// Answer to [`PromptSpec::Select`].
    Index(usize),
}

/// Asks questions.
pub trait Prompt {
    /// Ask one question.
    fn ask(&mut self, spec: &PromptSpec) -> Result<PromptValue, PromptError>;

    /// Ask a text question.
    fn text(&mut self, label: &str, default: &str) -> Result<String, PromptError> {
        match self.ask(&PromptSpec::text(label, default))? {
            PromptValue::Text(s) => Ok(s),
            other => Err(unexpected(label, &other)),
        }
    }

    /// Ask a yes/no question.
    fn confirm(&mut self, label: &str, default: bool) -> Result<bool, PromptError> {
        match self.ask(&PromptSpec::confirm(label, default))? {
            PromptValue::Bool(b) => Ok(b),
            other => Err(unexpected(label, &other)),
        }
    }

    /// Ask for one of `options`.
    fn select(&mut self, label: &str, options: Vec<String>, default: usize) -> Result<usize, PromptError> {
        let count = options.len();
        match self.ask(&PromptSpec::select(label, options, default))? {
            PromptValue::Index(i) if i < count => Ok(i),
            PromptValue::Index(i) => Err(PromptError::UnexpectedAnswer {
                label: label.to_string(),
                detail: format!("index {i} out of range for {count} options"),
            }),
            other => Err(unexpected(label, &other)),
        }
    }
}

fn unexpected(label: &str, got: &PromptValue) -> PromptError {
    PromptError::UnexpectedAnswer {
        label: label.to_string(),
        detail: format!("got {got:?}"),
    }
}

/// Answers questions from a fixed script, in order. Running out of answers
/// cancels.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<PromptValue>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    /// A prompt that replays `answers`.
    pub fn new(answers: impl IntoIterator<Item = PromptValue>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Labels of the questions asked so far.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    /// Answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, spec: &PromptSpec) -> Result<PromptValue, PromptError> {
        self.asked.push(spec.label().to_string());
        let answer = self.answers.pop_front().ok_or(PromptError::Cancelled)?;
        // Text answers to non-text questions are coerced the way a terminal would.
        Ok(match (spec, answer) {
            (PromptSpec::Confirm { default, .. }, PromptValue::Text(t)) => {
                PromptValue::Bool(parse_yes_no(&t).unwrap_or(*default))
            }
            (PromptSpec::Select { default, .. }, PromptValue::Text(t)) => {
                PromptValue::Index(t.trim().parse().unwrap_or(*default))
            }
            (PromptSpec::Text { default, .. }, PromptValue::Text(t)) if t.is_empty() => {
                PromptValue::Text(default.clone())
            }
            (_, answer) => answer,
        })
    }
}

/// Parse `y`/`yes`/`true` and `n`/`no`/`false`.
pub fn parse_yes_no(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" => Some(true),
        "n" | "no" | "false" => Some(false),
        _ => None,
    }
}

// ─── Interactive edit questions ──────────────────────────────────────────

/// Current values shown as prompt defaults.
#[derive(Debug, Clone, Default)]
pub struct InteractiveDefaults {
    /// Current max payload.
    pub payload: i64,
    /// Current not-before.
    pub nbf: i64,
    /// Current expiry.
    pub exp: i64,
    /// Current response permissions, if any.
    pub resp: Option<ResponsePermission>,
}

/// Ask for payload limit, validity window and response permissions.
///
/// Every question is answered, so the returned ops always set payload,
/// not-before and expiry. Response permissions are set when confirmed and
/// removed otherwise.
pub fn collect_interactive_ops(
    prompt: &mut dyn Prompt,
    current: &InteractiveDefaults,
) -> Result<Vec<EditOp>, PromptError> {
    let mut ops = Vec::new();

    let payload = prompt.text("max payload (-1 is unlimited)", &current.payload.to_string())?;
    ops.push(EditOp::SetPayload(parse_answer("max payload", &payload, parse_data_size)?));

    let nbf = prompt.text("valid from ('0' is always)", &format_timestamp(current.nbf))?;
    ops.push(EditOp::SetNotBefore(parse_answer("valid from", &nbf, parse_expiry)?));

    let exp = prompt.text("valid until ('0' is always)", &format_timestamp(current.exp))?;
    ops.push(EditOp::SetExpiry(parse_answer("valid until", &exp, parse_expiry)?));

    if prompt.confirm("set response permissions?", current.resp.is_some())? {
        let (max_default, ttl_default) = match &current.resp {
            Some(resp) => (resp.max.to_string(), format_duration(resp.ttl)),
            None => ("1".to_string(), "0".to_string()),
        };
        let max = prompt.text(
            "number of messages allowed as a response (-1 is unlimited)",
            &max_default,
        )?;
        let max = parse_answer("response max", &max, parse_limit)?;
        let ttl = prompt.text("amount of time the permission is valid (0 is always)", &ttl_default)?;
        let ttl = parse_answer("response ttl", &ttl, parse_duration)?;
        ops.push(EditOp::SetResponsePermissions {
            max_msgs: Some(max),
            ttl: Some(ttl),
        });
    } else {
        ops.push(EditOp::RemoveResponsePermissions);
    }

    Ok(ops)
}

fn parse_answer<T>(
    label: &str,
    text: &str,
    parse: impl Fn(&str) -> Result<T, nsc_core::CoreError>,
) -> Result<T, PromptError> {
    parse(text).map_err(|e| PromptError::UnexpectedAnswer {
        label: label.to_string(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn text(s: &str) -> PromptValue {
        PromptValue::Text(s.to_string())
    }

    #[test]
    fn scripted_prompt_replays_in_order() {
        let mut p = ScriptedPrompt::new([text("hello"), PromptValue::Bool(true), PromptValue::Index(1)]);
        assert_eq!(p.text("a", "").unwrap(), "hello");
        assert!(p.confirm("b", false).unwrap());
        assert_eq!(p.select("c", vec!["x".into(), "y".into()], 0).unwrap(), 1);
        assert_eq!(p.asked(), ["a", "b", "c"]);
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn running_out_cancels() {
        let mut p = ScriptedPrompt::new([]);
        assert!(matches!(p.text("a", ""), Err(PromptError::Cancelled)));
    }

    #[test]
    fn select_out_of_range_is_rejected() {
        let mut p = ScriptedPrompt::new([PromptValue::Index(5)]);
        let err = p.select("pick", vec!["only".into()], 0).unwrap_err();
        assert!(matches!(err, PromptError::UnexpectedAnswer { .. }));
    }

    #[test]
    fn text_answers_coerce_for_confirm_and_select() {
        let mut p = ScriptedPrompt::new([text("yes"), text("1")]);
        assert!(p.confirm("ok?", false).unwrap());
        assert_eq!(p.select("pick", vec!["a".into(), "b".into()], 0).unwrap(), 1);
    }

    #[test]
    fn yes_no_parsing() {
        assert_eq!(parse_yes_no(" Y "), Some(true));
        assert_eq!(parse_yes_no("false"), Some(false));
        assert_eq!(parse_yes_no("maybe"), None);
    }

    #[test]
    fn interactive_ops_without_response_permissions() {
        let mut p = ScriptedPrompt::new([text("5"), text("0"), text("0"), PromptValue::Bool(false)]);
        let ops = collect_interactive_ops(&mut p, &InteractiveDefaults::default()).unwrap();
        assert_eq!(
            ops,
            vec![
                EditOp::SetPayload(5),
                EditOp::SetNotBefore(0),
                EditOp::SetExpiry(0),
                EditOp::RemoveResponsePermissions,
            ]
        );
    }

    #[test]
    fn interactive_ops_with_dates_and_response_permissions() {
        let mut p = ScriptedPrompt::new([
            text("-1"),
            text("2018-01-01"),
            text("2050-01-01"),
            PromptValue::Bool(true),
            text("10"),
            text("2s"),
        ]);
        let ops = collect_interactive_ops(&mut p, &InteractiveDefaults::default()).unwrap();
        assert_eq!(ops[0], EditOp::SetPayload(-1));
        assert_eq!(ops[1], EditOp::SetNotBefore(1_514_764_800));
        assert_eq!(ops[2], EditOp::SetExpiry(2_524_608_000));
        assert_eq!(
            ops[3],
            EditOp::SetResponsePermissions {
                max_msgs: Some(10),
                ttl: Some(Duration::from_secs(2)),
            }
        );
    }

    #[test]
    fn accepting_defaults_keeps_response_permissions() {
        let current = InteractiveDefaults {
            payload: 2048,
            nbf: 0,
            exp: 0,
            resp: Some(ResponsePermission {
                max: 100,
                ttl: Duration::from_millis(4),
            }),
        };
        let mut p = ScriptedPrompt::new([text(""), text(""), text(""), text(""), text(""), text("")]);
        let ops = collect_interactive_ops(&mut p, &current).unwrap();
        assert_eq!(p.remaining(), 0);
        assert_eq!(ops[0], EditOp::SetPayload(2048));
        assert_eq!(
            ops[3],
            EditOp::SetResponsePermissions {
                max_msgs: Some(100),
                ttl: Some(Duration::from_millis(4)),
            }
        );
    }

    #[test]
    fn bad_interactive_answer_names_the_question() {
        let mut p = ScriptedPrompt::new([text("lots")]);
        let err = collect_interactive_ops(&mut p, &InteractiveDefaults::default()).unwrap_err();
        assert!(err.to_string().contains("max payload"));
    }
}

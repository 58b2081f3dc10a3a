//! Confidence threshold editing

use crate::config::ThresholdPolicy;
use tracing::warn;

/// Outcome of one keystroke-level edit of the threshold field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdEdit {
    Accepted,
    /// A finite number outside [0, 1], kept because the policy is permissive
    AcceptedOutOfRange,
    Rejected,
}

impl ThresholdEdit {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, ThresholdEdit::Rejected)
    }
}

/// The threshold input field: what the user typed plus the value sent with requests.
///
/// An empty field is a transient editing state. It displays as empty and
/// contributes `0.0` to requests; it is not a reset to the default.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdField {
    text: String,
    value: f64,
    policy: ThresholdPolicy,
}

impl ThresholdField {
    pub fn new(initial: f64, policy: ThresholdPolicy) -> Self {
        Self {
            text: initial.to_string(),
            value: initial,
            policy,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Apply raw field text. Rejected input leaves the field untouched.
    pub fn edit(&mut self, raw: &str) -> ThresholdEdit {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            self.text = raw.to_string();
            self.value = 0.0;
            return ThresholdEdit::Accepted;
        }

        let parsed = match parse_number(trimmed) {
            Some(v) => v,
            None => return ThresholdEdit::Rejected,
        };

        let in_range = (0.0..=1.0).contains(&parsed);
        if !in_range && self.policy == ThresholdPolicy::Strict {
            return ThresholdEdit::Rejected;
        }

        self.text = raw.to_string();
        self.value = parsed;

        if in_range {
            ThresholdEdit::Accepted
        } else {
            warn!(
                "Confidence threshold {} is outside [0, 1]; sending it unchanged",
                parsed
            );
            ThresholdEdit::AcceptedOutOfRange
        }
    }
}

/// Finite decimal numbers only; `NaN` and infinities are not thresholds.
///
/// Deliberately stricter than a browser's `Number()`: `"Infinity"`, hex such as
/// `"0x10"` and overflowing `"1e400"` are rejected rather than coerced.
fn parse_number(s: &str) -> Option<f64> {
    let looks_numeric = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !looks_numeric {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

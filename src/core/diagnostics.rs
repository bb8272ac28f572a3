//! Diagnostics - Severity plus message list returned by every lifecycle operation
//!
//! Fan-out operations attempt every item and fold each outcome into one
//! accumulator with [`Diagnostics::merge`]. Severity only escalates inside a
//! value; [`Diagnostics::ignore_error`] is the single way down.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome severity, ordered `Success < Warning < Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Severity {
    #[default]
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One reported message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.text)
    }
}

/// Aggregated result of one or many operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    severity: Severity,
    messages: Vec<Message>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a value holding a single error message
    pub fn error(text: impl ToString) -> Self {
        let mut diagnostics = Self::new();
        diagnostics.add_error(text);
        diagnostics
    }

    /// Append a message and escalate the overall severity
    pub fn add(&mut self, severity: Severity, text: impl ToString) {
        self.escalate(severity);
        self.messages.push(Message {
            severity,
            text: text.to_string(),
        });
    }

    pub fn add_info(&mut self, text: impl ToString) {
        self.add(Severity::Success, text);
    }

    pub fn add_warning(&mut self, text: impl ToString) {
        self.add(Severity::Warning, text);
    }

    pub fn add_error(&mut self, text: impl ToString) {
        self.add(Severity::Error, text);
    }

    /// Fold another value into this one. Nothing is dropped, duplicates included.
    pub fn merge(&mut self, other: Diagnostics) {
        self.escalate(other.severity);
        self.messages.extend(other.messages);
    }

    /// Builder form of [`Diagnostics::merge`]
    pub fn merged(mut self, other: Diagnostics) -> Self {
        self.merge(other);
        self
    }

    /// True while no error has been recorded
    pub fn success(&self) -> bool {
        self.severity < Severity::Error
    }

    /// Demote every error to a warning. Afterwards `success()` always holds.
    pub fn ignore_error(&mut self) {
        if self.severity == Severity::Error {
            self.severity = Severity::Warning;
        }

        for message in &mut self.messages {
            if message.severity == Severity::Error {
                message.severity = Severity::Warning;
            }
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages at exactly the given severity
    pub fn texts(&self, severity: Severity) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(move |m| m.severity == severity)
            .map(|m| m.text.as_str())
    }

    fn escalate(&mut self, severity: Severity) {
        if severity > self.severity {
            self.severity = severity;
        }
    }
}

impl FromIterator<Diagnostics> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostics>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::merged)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", message)?;
        }
        Ok(())
    }
}

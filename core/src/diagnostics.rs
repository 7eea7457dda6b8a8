//! Advisory diagnostics.
//!
//! Nothing in the engine fails a caller: bad records are skipped, bad
//! triggers are dropped, unresolved placeholders stay literal. Each of those
//! outcomes produces a [`Diagnostic`], which is logged through `tracing` and
//! kept in a bounded [`DiagnosticLog`] so hosts can surface it.

use std::collections::VecDeque;
use std::fmt;

use chrono::{Local, NaiveDateTime};
use thiserror::Error;

/// Which family of record or name a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Parameter,
    Addon,
    Action,
    Handler,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parameter => "parameter",
            Self::Addon => "add-on",
            Self::Action => "action",
            Self::Handler => "handler",
        })
    }
}

/// Why a trigger was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    #[error("unknown")]
    Unknown,
    #[error("disabled")]
    Disabled,
    #[error("locked")]
    Locked,
    #[error("cooldown")]
    Cooldown,
    #[error("recursive")]
    Recursive,
}

/// Failure reported by a handler. Recovered by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("missing argument '{0}'")]
    MissingArgument(String),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("{0}")]
    Host(String),
}

impl HandlerError {
    pub fn missing(name: &str) -> Self {
        Self::MissingArgument(name.to_string())
    }

    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("malformed {kind} definition in {origin}: {reason}")]
    MalformedDefinition {
        kind: DefinitionKind,
        origin: String,
        reason: String,
    },

    #[error("duplicate {kind} '{id}' in {origin} ignored")]
    DuplicateDefinition {
        kind: DefinitionKind,
        id: String,
        origin: String,
    },

    #[error("unknown {kind} '{name}'")]
    UnknownReference { kind: DefinitionKind, name: String },

    #[error("action '{action_id}' rejected: {reason}")]
    GatingRejection { action_id: String, reason: Rejection },

    #[error("recursive trigger of action '{action_id}' rejected")]
    RecursionRejection { action_id: String },

    #[error("cyclic event chain: '{event}' is already being raised")]
    CyclicEvent { event: String },

    #[error("circular parameter reference: @{key}")]
    CircularParameterReference { key: String },

    #[error("missing parameter: @{key}")]
    MissingParameter { key: String },

    #[error("handler '{action}' failed: {source}")]
    HandlerFailed {
        action: String,
        #[source]
        source: HandlerError,
    },

    #[error("cannot register handler '{name}': {reason}")]
    InvalidRegistration { name: String, reason: String },

    #[error("queue drain stopped after {steps} step(s), {dropped} pending action(s) dropped")]
    DrainLimitReached { steps: usize, dropped: usize },
}

impl Diagnostic {
    /// Diagnostic for a refused trigger.
    pub fn rejected(action_id: &str, reason: Rejection) -> Self {
        match reason {
            Rejection::Recursive => Self::RecursionRejection {
                action_id: action_id.to_string(),
            },
            reason => Self::GatingRejection {
                action_id: action_id.to_string(),
                reason,
            },
        }
    }

    pub fn emit(&self) {
        tracing::warn!("{}", self);
    }
}

/// A diagnostic with the wall-clock time it was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEntry {
    pub at: NaiveDateTime,
    pub diagnostic: Diagnostic,
}

/// Bounded buffer of recent diagnostics; the oldest entry is dropped first.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<DiagnosticEntry>,
    capacity: usize,
}

impl DiagnosticLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Log and keep a diagnostic.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(DiagnosticEntry {
            at: Local::now().naive_local(),
            diagnostic,
        });
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.record(diagnostic);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain everything recorded so far.
    pub fn take(&mut self) -> Vec<DiagnosticEntry> {
        self.entries.drain(..).collect()
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages() {
        let d = Diagnostic::rejected("open_door", Rejection::Cooldown);
        assert_eq!(d.to_string(), "action 'open_door' rejected: cooldown");

        let d = Diagnostic::rejected("open_door", Rejection::Recursive);
        assert_eq!(
            d,
            Diagnostic::RecursionRejection {
                action_id: "open_door".into()
            }
        );
    }

    #[test]
    fn handler_failure_keeps_source() {
        let d = Diagnostic::HandlerFailed {
            action: "TeleportPlayer".into(),
            source: HandlerError::missing("x"),
        };
        assert_eq!(
            d.to_string(),
            "handler 'TeleportPlayer' failed: missing argument 'x'"
        );
    }

    #[test]
    fn log_drops_oldest_past_capacity() {
        let mut log = DiagnosticLog::new(2);
        for key in ["a", "b", "c"] {
            log.record(Diagnostic::MissingParameter { key: key.into() });
        }

        let kept: Vec<_> = log.take().into_iter().map(|e| e.diagnostic).collect();
        assert_eq!(
            kept,
            vec![
                Diagnostic::MissingParameter { key: "b".into() },
                Diagnostic::MissingParameter { key: "c".into() },
            ]
        );
        assert!(log.is_empty());
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut log = DiagnosticLog::new(0);
        log.record(Diagnostic::MissingParameter { key: "a".into() });
        assert!(log.is_empty());
    }
}

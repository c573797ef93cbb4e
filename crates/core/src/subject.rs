// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `jobs.<mode>.<target>.<category>.<operation>` subject namespace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Read-only vs. state-changing operations. Encoded as the second subject token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Query,
    Modify,
}

crate::simple_display! {
    Mode {
        Query => "query",
        Modify => "modify",
    }
}

impl FromStr for Mode {
    type Err = SubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Mode::Query),
            "modify" => Ok(Mode::Modify),
            other => Err(SubjectError::InvalidMode(other.to_string())),
        }
    }
}

/// Which worker(s) a job subject targets.
///
/// Serializes to/from the bare subject token: `_any`, `_all`, `label:k:v`,
/// or a sanitized hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    /// Deliver to exactly one available worker (queue-group arbitration).
    Any,
    /// Deliver a copy to every live worker.
    All,
    /// Deliver to every worker whose labels include `key=value`.
    Label { key: String, value: String },
    /// Deliver to exactly the worker with this sanitized hostname.
    Host(String),
}

impl TargetSelector {
    /// Absent/`_any` request parameter resolves to this before any live-registry lookup.
    pub const ANY_TOKEN: &'static str = "_any";
    pub const ALL_TOKEN: &'static str = "_all";

    pub fn is_broadcast(&self) -> bool {
        matches!(self, TargetSelector::All | TargetSelector::Label { .. })
    }

    /// The subject token this selector encodes.
    pub fn token(&self) -> String {
        match self {
            TargetSelector::Any => Self::ANY_TOKEN.to_string(),
            TargetSelector::All => Self::ALL_TOKEN.to_string(),
            TargetSelector::Label { key, value } => format!("label:{key}:{value}"),
            TargetSelector::Host(host) => host.clone(),
        }
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for TargetSelector {
    type Err = SubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == Self::ANY_TOKEN {
            Ok(TargetSelector::Any)
        } else if s == Self::ALL_TOKEN {
            Ok(TargetSelector::All)
        } else if let Some(rest) = s.strip_prefix("label:") {
            let (key, value) = rest.split_once(':').ok_or_else(|| SubjectError::InvalidSelector(s.to_string()))?;
            if key.is_empty() || value.is_empty() {
                return Err(SubjectError::InvalidSelector(s.to_string()));
            }
            Ok(TargetSelector::Label { key: key.to_string(), value: value.to_string() })
        } else {
            Ok(TargetSelector::Host(s.to_string()))
        }
    }
}

/// A parsed `jobs.<mode>.<target>.<category>.<operation>` subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub mode: Mode,
    pub selector: TargetSelector,
    pub category: String,
    pub operation: String,
}

pub const SUBJECT_PREFIX: &str = "jobs";

impl Subject {
    pub fn new(mode: Mode, selector: TargetSelector, category: impl Into<String>, operation: impl Into<String>) -> Self {
        Self { mode, selector, category: category.into(), operation: operation.into() }
    }

    /// Render the full dotted subject string.
    pub fn to_subject_string(&self) -> String {
        format!("{}.{}.{}.{}.{}", SUBJECT_PREFIX, self.mode, self.selector, self.category, self.operation)
    }

    /// `<category>.<operation>`, as stored on `Job.operation.type`.
    pub fn operation_type(&self) -> String {
        format!("{}.{}", self.category, self.operation)
    }

    /// Parse a subject string into its four logical parts.
    ///
    /// Fails with [`SubjectError::TooFewTokens`] if fewer than five
    /// dot-separated tokens are present (`jobs` + mode + target + category +
    /// operation, where operation itself may contain further dots).
    pub fn parse(subject: &str) -> Result<Self, SubjectError> {
        let mut parts = subject.splitn(5, '.');
        let prefix = parts.next().ok_or(SubjectError::TooFewTokens)?;
        if prefix != SUBJECT_PREFIX {
            return Err(SubjectError::WrongPrefix(prefix.to_string()));
        }
        let mode = parts.next().ok_or(SubjectError::TooFewTokens)?.parse()?;
        let selector = parts.next().ok_or(SubjectError::TooFewTokens)?.parse()?;
        let category = parts.next().ok_or(SubjectError::TooFewTokens)?.to_string();
        let operation = parts.next().ok_or(SubjectError::TooFewTokens)?.to_string();
        if category.is_empty() || operation.is_empty() {
            return Err(SubjectError::TooFewTokens);
        }
        Ok(Subject { mode, selector, category, operation })
    }

    /// Filter subject for a worker's "any" consumer: `jobs.<mode>._any.>`.
    pub fn any_filter(mode: Mode) -> String {
        format!("{SUBJECT_PREFIX}.{mode}.{}.>", TargetSelector::ANY_TOKEN)
    }

    /// Filter subject for a worker's "all" consumer: `jobs.<mode>._all.>`.
    pub fn all_filter(mode: Mode) -> String {
        format!("{SUBJECT_PREFIX}.{mode}.{}.>", TargetSelector::ALL_TOKEN)
    }

    /// Filter subject for a worker's direct consumer: `jobs.<mode>.<host>.>`.
    pub fn direct_filter(mode: Mode, sanitized_host: &str) -> String {
        format!("{SUBJECT_PREFIX}.{mode}.{sanitized_host}.>")
    }

    /// Filter subject for a worker's label consumer: `jobs.<mode>.label:<k>:<v>.>`.
    pub fn label_filter(mode: Mode, key: &str, value: &str) -> String {
        format!("{SUBJECT_PREFIX}.{mode}.label:{key}:{value}.>")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubjectError {
    #[error("invalid-subject: fewer than five tokens")]
    TooFewTokens,
    #[error("invalid-subject: expected prefix 'jobs', got {0:?}")]
    WrongPrefix(String),
    #[error("invalid-subject: unrecognized mode {0:?}")]
    InvalidMode(String),
    #[error("invalid-subject: malformed selector {0:?}")]
    InvalidSelector(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_unicast_subject() {
        let subject = Subject::new(Mode::Modify, TargetSelector::Host("web_01".into()), "command", "exec.execute");
        let s = subject.to_subject_string();
        assert_eq!(s, "jobs.modify.web_01.command.exec.execute");
        let parsed = Subject::parse(&s).unwrap();
        assert_eq!(parsed, subject);
    }

    #[test]
    fn round_trips_broadcast_subject() {
        let subject = Subject::new(Mode::Query, TargetSelector::All, "node", "hostname.get");
        let s = subject.to_subject_string();
        let parsed = Subject::parse(&s).unwrap();
        assert_eq!(parsed, subject);
    }

    #[test]
    fn round_trips_label_subject() {
        let subject = Subject::new(Mode::Query, TargetSelector::Label { key: "env".into(), value: "prod".into() }, "node", "uptime.get");
        let s = subject.to_subject_string();
        assert_eq!(s, "jobs.query.label:env:prod.node.uptime.get");
        let parsed = Subject::parse(&s).unwrap();
        assert_eq!(parsed, subject);
    }

    #[test]
    fn rejects_too_few_tokens() {
        assert_eq!(Subject::parse("jobs.modify.web_01"), Err(SubjectError::TooFewTokens));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(matches!(Subject::parse("jobs.sideways.web_01.node.hostname.get"), Err(SubjectError::InvalidMode(_))));
    }

    #[test]
    fn operation_type_joins_category_and_operation() {
        let subject = Subject::new(Mode::Modify, TargetSelector::Any, "command", "shell.execute");
        assert_eq!(subject.operation_type(), "command.shell.execute");
    }
}

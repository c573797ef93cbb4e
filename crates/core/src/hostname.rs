// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker hostname and its registry-key sanitization.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// The original, unsanitized hostname reported by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hostname(pub String);

impl Hostname {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self(hostname.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sanitize to a registry-key-safe form: every byte outside
    /// `[A-Za-z0-9_]` becomes `_`. Pure function; many-to-one.
    pub fn sanitized(&self) -> SanitizedHostname {
        sanitize(&self.0)
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Hostname {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Hostname {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for Hostname {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A hostname after [`sanitize`], suitable for use as a registry/subject key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SanitizedHostname(pub String);

impl SanitizedHostname {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The registry storage key for this sanitized hostname: `workers.<host>`.
    pub fn registry_key(&self) -> String {
        format!("workers.{}", self.0)
    }
}

impl fmt::Display for SanitizedHostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for SanitizedHostname {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
///
/// Many-to-one: e.g. `a-b` and `a.b` both sanitize to `a_b`. Callers that
/// register a hostname must detect collisions against a different original
/// hostname already holding the sanitized key (see `fleet_storage::Registry`).
pub fn sanitize(hostname: &str) -> SanitizedHostname {
    let sanitized: String = hostname
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    SanitizedHostname(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_dots_and_dashes_to_underscore() {
        assert_eq!(sanitize("Johns-MacBook-Pro.local").as_str(), "Johns_MacBook_Pro_local");
        assert_eq!(sanitize("web-01").as_str(), "web_01");
    }

    #[test]
    fn distinct_hostnames_can_collide_after_sanitization() {
        let a = sanitize("a-b");
        let b = sanitize("a.b");
        assert_eq!(a, b);
    }

    #[test]
    fn already_clean_hostnames_are_unchanged() {
        assert_eq!(sanitize("web_01").as_str(), "web_01");
    }

    #[test]
    fn registry_key_is_namespaced() {
        let h = Hostname::new("web-01");
        assert_eq!(h.sanitized().registry_key(), "workers.web_01");
    }
}

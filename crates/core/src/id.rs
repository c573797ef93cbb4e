// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier: a fixed-size, time-orderable ID.

use crate::clock::Clock;
use std::fmt;

/// Maximum byte length for an inline ID (4-char prefix + 8-char timestamp + 11-char suffix).
pub const ID_MAX_LEN: usize = 23;

const TIMESTAMP_LEN: usize = 8;
const SUFFIX_LEN: usize = 11;
const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fixed-size inline ID buffer. Always <= 23 ASCII bytes, `Copy`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IdBuf {
    len: u8,
    buf: [u8; ID_MAX_LEN],
}

impl std::hash::Hash for IdBuf {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Hash only the active bytes so it matches str::hash, which
        // Borrow<str> HashMap lookups require.
        self.as_str().hash(state);
    }
}

impl IdBuf {
    pub fn new(s: &str) -> Self {
        debug_assert!(s.len() <= ID_MAX_LEN, "ID exceeds {} bytes: {:?}", ID_MAX_LEN, s);
        let len = s.len().min(ID_MAX_LEN);
        let mut buf = [0u8; ID_MAX_LEN];
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self { len: len as u8, buf }
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only constructed from &str, always valid UTF-8.
        match std::str::from_utf8(&self.buf[..self.len as usize]) {
            Ok(s) => s,
            Err(_) => unreachable!("IdBuf constructed from non-UTF-8"),
        }
    }
}

impl std::borrow::Borrow<str> for IdBuf {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for IdBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl serde::Serialize for IdBuf {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for IdBuf {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.len() > ID_MAX_LEN {
            return Err(serde::de::Error::custom(format!("ID exceeds {} bytes: {:?}", ID_MAX_LEN, s)));
        }
        Ok(IdBuf::new(s))
    }
}

fn base36_fixed(mut n: u64, width: usize) -> String {
    let mut digits = vec![b'0'; width];
    for slot in digits.iter_mut().rev() {
        let d = (n % 36) as usize;
        *slot = BASE36_ALPHABET[d];
        n /= 36;
    }
    // SAFETY: BASE36_ALPHABET is ASCII.
    String::from_utf8(digits).unwrap_or_default()
}

/// Unique identifier for a job instance.
///
/// Format: `job_` + 8-char base36 epoch-ms timestamp + 11-char random suffix,
/// so IDs sort lexicographically in (roughly) creation order — useful for
/// range scans over the job store without a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct JobId(pub IdBuf);

impl JobId {
    pub const PREFIX: &'static str = "job_";

    /// Generate a new ID using the given clock for its time component.
    pub fn new(clock: &impl Clock) -> Self {
        let ts = base36_fixed(clock.epoch_ms(), TIMESTAMP_LEN);
        let suffix = nanoid::nanoid!(SUFFIX_LEN);
        Self(IdBuf::new(&format!("{}{}{}", Self::PREFIX, ts, suffix)))
    }

    /// Parse an existing ID string (e.g. from storage or the wire).
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(IdBuf::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The storage key for this job's blob: `jobs.<job-id>`.
    pub fn store_key(&self) -> String {
        format!("jobs.{}", self.as_str())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl std::ops::Deref for JobId {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;

    #[test]
    fn ids_are_lexicographically_ordered_by_creation_time() {
        let clock = FakeClock::new();
        let first = JobId::new(&clock);
        clock.advance(std::time::Duration::from_millis(5));
        let second = JobId::new(&clock);
        assert!(first.as_str() < second.as_str());
    }

    #[test]
    fn round_trips_through_from_string() {
        let clock = FakeClock::new();
        let id = JobId::new(&clock);
        let parsed = JobId::from_string(id.as_str());
        assert_eq!(id, parsed);
    }

    #[test]
    fn id_fits_inline_buffer() {
        let clock = FakeClock::new();
        let id = JobId::new(&clock);
        assert_eq!(id.as_str().len(), ID_MAX_LEN);
        assert!(id.as_str().starts_with(JobId::PREFIX));
    }
}

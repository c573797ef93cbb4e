// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only, per-job [`StatusEvent`] log.

use crate::error::StorageError;
use fleet_core::{EventKind, JobId, StatusEvent};
use fleet_wire::MessageBus;

const BUCKET: &str = "events";

pub struct EventLog<'a> {
    bus: &'a dyn MessageBus,
}

impl<'a> EventLog<'a> {
    pub fn new(bus: &'a dyn MessageBus) -> Self {
        Self { bus }
    }

    /// Append `event` if it's the next legal step in `event.job_id`'s
    /// history. Redelivered messages naturally retry the same append: if
    /// the event at `event.sequence` is already stored with the same kind,
    /// this is a no-op rather than an error (idempotent redelivery).
    pub async fn append(&self, event: &StatusEvent) -> Result<(), StorageError> {
        let existing = self.list(&event.job_id).await?;
        let expected_sequence = existing.len() as u64 + 1;

        if event.sequence < expected_sequence {
            let prior = &existing[(event.sequence - 1) as usize];
            if prior.kind == event.kind {
                return Ok(());
            }
            return Err(StorageError::OutOfOrderEvent {
                job_id: event.job_id.as_str().to_string(),
                sequence: event.sequence,
                expected: expected_sequence,
            });
        }
        if event.sequence > expected_sequence {
            return Err(StorageError::OutOfOrderEvent {
                job_id: event.job_id.as_str().to_string(),
                sequence: event.sequence,
                expected: expected_sequence,
            });
        }

        if let Some(last) = existing.last() {
            if !last.kind.can_transition_to(event.kind) {
                return Err(StorageError::IllegalTransition {
                    job_id: event.job_id.as_str().to_string(),
                    sequence: event.sequence,
                    from: last.kind.to_string(),
                });
            }
        } else if event.kind != EventKind::Acknowledged {
            return Err(StorageError::IllegalTransition {
                job_id: event.job_id.as_str().to_string(),
                sequence: event.sequence,
                from: "<none>".to_string(),
            });
        }

        let encoded = serde_json::to_vec(event).map_err(|e| StorageError::Corrupt(event.job_id.as_str().to_string(), e))?;
        self.bus.kv_put(BUCKET, &event.store_key(), encoded, None).await?;
        Ok(())
    }

    /// All events for `job_id`, ordered by sequence.
    pub async fn list(&self, job_id: &JobId) -> Result<Vec<StatusEvent>, StorageError> {
        let prefix = StatusEvent::log_prefix(job_id);
        let mut keys = self.bus.kv_keys(BUCKET, &prefix).await?;
        keys.sort();
        let mut events = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.bus.kv_get(BUCKET, &key).await? {
                events.push(serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt(key, e))?);
            }
        }
        Ok(events)
    }

    pub async fn latest(&self, job_id: &JobId) -> Result<Option<StatusEvent>, StorageError> {
        Ok(self.list(job_id).await?.into_iter().last())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::FakeClock;
    use fleet_wire::InProcessBus;

    #[tokio::test]
    async fn events_must_arrive_in_lifecycle_order() {
        let clock = FakeClock::new();
        let bus = InProcessBus::with_clock(clock.clone());
        let log = EventLog::new(&bus);
        let job_id = JobId::new(&clock);

        log.append(&StatusEvent::new(&clock, job_id, 1, EventKind::Acknowledged, "web_01")).await.unwrap();
        log.append(&StatusEvent::new(&clock, job_id, 2, EventKind::Started, "web_01")).await.unwrap();
        log.append(&StatusEvent::new(&clock, job_id, 3, EventKind::Completed, "web_01")).await.unwrap();

        let events = log.list(&job_id).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events.last().unwrap().kind, EventKind::Completed);
    }

    #[tokio::test]
    async fn skipping_started_is_rejected() {
        let clock = FakeClock::new();
        let bus = InProcessBus::with_clock(clock.clone());
        let log = EventLog::new(&bus);
        let job_id = JobId::new(&clock);

        log.append(&StatusEvent::new(&clock, job_id, 1, EventKind::Acknowledged, "web_01")).await.unwrap();
        let err = log.append(&StatusEvent::new(&clock, job_id, 2, EventKind::Completed, "web_01")).await.unwrap_err();
        assert!(matches!(err, StorageError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn redelivered_append_of_the_same_event_is_a_no_op() {
        let clock = FakeClock::new();
        let bus = InProcessBus::with_clock(clock.clone());
        let log = EventLog::new(&bus);
        let job_id = JobId::new(&clock);

        let ack = StatusEvent::new(&clock, job_id, 1, EventKind::Acknowledged, "web_01");
        log.append(&ack).await.unwrap();
        log.append(&ack).await.unwrap();

        assert_eq!(log.list(&job_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn first_event_must_be_acknowledged() {
        let clock = FakeClock::new();
        let bus = InProcessBus::with_clock(clock.clone());
        let log = EventLog::new(&bus);
        let job_id = JobId::new(&clock);

        let err = log.append(&StatusEvent::new(&clock, job_id, 1, EventKind::Started, "web_01")).await.unwrap_err();
        assert!(matches!(err, StorageError::IllegalTransition { .. }));
    }
}

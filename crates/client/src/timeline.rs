//! Ordered, deduplicated event timeline of one run.
//!
//! Merges are idempotent and commutative: any interleaving of the same
//! events produces the same strictly ascending sequence.

use fogsync_protocol::RunEvent;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    run_id: String,
    events: Vec<RunEvent>,
}

impl Timeline {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            events: Vec::new(),
        }
    }

    /// Build a timeline from a fetched backlog. Order of `events` is irrelevant.
    pub fn from_backlog(run_id: impl Into<String>, events: Vec<RunEvent>) -> Self {
        let mut timeline = Self::new(run_id);
        timeline.merge_all(events);
        timeline
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Highest event id held, 0 when empty. Used as the stream resume cursor.
    pub fn cursor(&self) -> u64 {
        self.events.last().map(|e| e.id).unwrap_or(0)
    }

    /// Insert `event` at its ordered position. Returns false for id 0 or a
    /// duplicate id; the first copy of an id wins.
    pub fn merge(&mut self, event: RunEvent) -> bool {
        if event.id == 0 {
            return false;
        }
        match self.events.binary_search_by_key(&event.id, |e| e.id) {
            Ok(_) => false,
            Err(pos) => {
                self.events.insert(pos, event);
                true
            }
        }
    }

    /// Merge a batch, returning how many events were new.
    pub fn merge_all(&mut self, events: impl IntoIterator<Item = RunEvent>) -> usize {
        events
            .into_iter()
            .map(|event| self.merge(event))
            .filter(|inserted| *inserted)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(id: u64) -> RunEvent {
        RunEvent {
            id,
            run_id: "r1".to_string(),
            event_type: "log".to_string(),
            message: Some(format!("event {id}")),
            ..RunEvent::default()
        }
    }

    fn ids(timeline: &Timeline) -> Vec<u64> {
        timeline.events().iter().map(|e| e.id).collect()
    }

    #[test]
    fn out_of_order_delivery_ends_sorted() {
        let mut timeline = Timeline::new("r1");
        assert!(timeline.merge(ev(5)));
        assert!(timeline.merge(ev(3)));
        assert_eq!(ids(&timeline), vec![3, 5]);
        assert_eq!(timeline.cursor(), 5);
    }

    #[test]
    fn duplicates_and_zero_ids_are_dropped() {
        let mut timeline = Timeline::from_backlog("r1", vec![ev(1), ev(2)]);
        assert!(!timeline.merge(ev(2)));
        assert!(!timeline.merge(ev(0)));

        let mut changed = ev(1);
        changed.message = Some("rewritten".to_string());
        assert!(!timeline.merge(changed));
        assert_eq!(timeline.events()[0].message.as_deref(), Some("event 1"));
        assert_eq!(ids(&timeline), vec![1, 2]);
    }

    #[test]
    fn every_interleaving_converges() {
        let batches: [&[u64]; 4] = [&[4, 1, 3], &[2, 4, 2], &[9, 7], &[1, 8, 6, 5]];
        let mut reference = Timeline::new("r1");
        for batch in batches {
            reference.merge_all(batch.iter().copied().map(ev));
        }
        let expected: Vec<u64> = (1..=9).collect();
        assert_eq!(ids(&reference), expected);

        // Reverse batch order and reverse each batch.
        let mut reversed = Timeline::new("r1");
        for batch in batches.iter().rev() {
            reversed.merge_all(batch.iter().rev().copied().map(ev));
        }
        assert_eq!(reversed, reference);

        // Re-merging everything is a no-op.
        let again = reversed.merge_all(reference.events().to_vec());
        assert_eq!(again, 0);
        assert_eq!(reversed, reference);
    }

    #[test]
    fn replay_past_cursor_only_adds_newer_events() {
        let mut timeline = Timeline::from_backlog("r1", vec![ev(3), ev(1), ev(2)]);
        let cursor = timeline.cursor();
        assert_eq!(cursor, 3);

        // A daemon that over-replays still cannot double count.
        let added = timeline.merge_all(vec![ev(2), ev(3), ev(4), ev(5)]);
        assert_eq!(added, 2);
        assert_eq!(ids(&timeline), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_timeline_cursor_is_zero() {
        assert_eq!(Timeline::new("r1").cursor(), 0);
        assert!(Timeline::default().is_empty());
    }
}

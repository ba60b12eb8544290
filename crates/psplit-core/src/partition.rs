//! Sweep-line partitioning of presence ranges into occupancy segments.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::SplitError;
use crate::model::{Participant, Segment, Window};
use crate::time::ClockTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Arrive,
    Depart,
}

#[derive(Debug, Clone, Copy)]
struct Event {
    at: ClockTime,
    kind: EventKind,
    participant: usize,
}

/// Split `window` into the ordered segments during which at least one
/// participant is on court.
///
/// Presence is clamped to the window first, and zero-length presences are
/// dropped before any event is generated, so they never show up as
/// occupants. Idle stretches produce no segment. Events are ordered by
/// timestamp only; same-instant ties cannot create a segment, so their order
/// does not matter.
pub fn partition(window: &Window, participants: &[Participant]) -> Result<Vec<Segment>, SplitError> {
    window.validate()?;

    let mut events = Vec::with_capacity(participants.len() * 2);
    for (index, participant) in participants.iter().enumerate() {
        let (arrival, departure) = participant.clamped(window);
        if arrival == departure {
            continue;
        }
        events.push(Event {
            at: arrival,
            kind: EventKind::Arrive,
            participant: index,
        });
        events.push(Event {
            at: departure,
            kind: EventKind::Depart,
            participant: index,
        });
    }
    events.sort_by_key(|event| event.at);

    let mut segments = Vec::new();
    let mut occupants: BTreeSet<usize> = BTreeSet::new();
    let mut last = window.start;

    for event in &events {
        if event.at > last && !occupants.is_empty() {
            let names = occupants
                .iter()
                .map(|&index| participants[index].name.clone())
                .collect();
            segments.push(Segment::new(last, event.at, names));
        }
        match event.kind {
            EventKind::Arrive => {
                occupants.insert(event.participant);
            }
            EventKind::Depart => {
                occupants.remove(&event.participant);
            }
        }
        last = event.at;
    }

    debug!(
        participants = participants.len(),
        events = events.len(),
        segments = segments.len(),
        "Partitioned presence timeline"
    );

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn hm(hour: u32, minute: u32) -> ClockTime {
        ClockTime::from_hm(hour, minute).unwrap()
    }

    fn window() -> Window {
        Window::new(hm(18, 0), hm(20, 0))
    }

    #[test]
    fn test_single_participant_spans_window() {
        let players = vec![Participant::new("A", hm(18, 0), hm(20, 0))];
        let segments = partition(&window(), &players).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, hm(18, 0));
        assert_eq!(segments[0].end, hm(20, 0));
        assert_eq!(segments[0].duration, TimeDelta::hours(2));
        assert_eq!(segments[0].occupants, vec!["A".to_string()]);
    }

    #[test]
    fn test_identical_ranges_share_one_segment() {
        let players = vec![
            Participant::new("A", hm(18, 0), hm(20, 0)),
            Participant::new("B", hm(18, 0), hm(20, 0)),
        ];
        let segments = partition(&window(), &players).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].occupants, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_staggered_arrivals_split_the_timeline() {
        let players = vec![
            Participant::new("A", hm(18, 0), hm(20, 0)),
            Participant::new("B", hm(19, 0), hm(20, 0)),
            Participant::new("C", hm(18, 30), hm(19, 30)),
        ];
        let segments = partition(&window(), &players).unwrap();

        let bounds: Vec<_> = segments.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(
            bounds,
            vec![
                (hm(18, 0), hm(18, 30)),
                (hm(18, 30), hm(19, 0)),
                (hm(19, 0), hm(19, 30)),
                (hm(19, 30), hm(20, 0)),
            ]
        );
        assert_eq!(segments[2].occupants, vec!["A", "B", "C"]);
        assert_eq!(segments[3].occupants, vec!["A", "B"]);
    }

    #[test]
    fn test_idle_time_emits_no_segment() {
        let players = vec![
            Participant::new("A", hm(18, 0), hm(18, 30)),
            Participant::new("B", hm(19, 30), hm(20, 0)),
        ];
        let segments = partition(&window(), &players).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].end, hm(18, 30));
        assert_eq!(segments[1].start, hm(19, 30));
        assert!(segments.iter().all(|s| !s.occupants.is_empty()));
    }

    #[test]
    fn test_zero_length_presence_never_occupies() {
        let players = vec![
            Participant::new("Ghost", hm(19, 0), hm(19, 0)),
            Participant::new("Early", hm(17, 0), hm(18, 0)),
            Participant::new("B", hm(18, 0), hm(20, 0)),
        ];
        let segments = partition(&window(), &players).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].occupants, vec!["B".to_string()]);
    }

    #[test]
    fn test_out_of_window_presence_is_clamped() {
        let players = vec![Participant::new("A", hm(17, 0), hm(21, 0))];
        let segments = partition(&window(), &players).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, hm(18, 0));
        assert_eq!(segments[0].end, hm(20, 0));
    }

    #[test]
    fn test_handover_at_same_instant() {
        let players = vec![
            Participant::new("A", hm(18, 0), hm(19, 0)),
            Participant::new("B", hm(19, 0), hm(20, 0)),
        ];
        let segments = partition(&window(), &players).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].occupants, vec!["A"]);
        assert_eq!(segments[1].occupants, vec!["B"]);
    }

    #[test]
    fn test_window_closing_at_midnight() {
        let late = Window::new(hm(22, 0), hm(24, 0));
        let players = vec![
            Participant::new("A", hm(22, 0), hm(24, 0)),
            Participant::new("B", hm(23, 0), hm(24, 30)),
        ];
        let segments = partition(&late, &players).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start, hm(23, 0));
        assert_eq!(segments[1].end, hm(24, 0));
        assert_eq!(segments[1].occupants, vec!["A", "B"]);
        assert_eq!(segments[1].duration, TimeDelta::hours(1));
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let inverted = Window::new(hm(20, 0), hm(18, 0));
        let result = partition(&inverted, &[]);
        assert!(matches!(result, Err(SplitError::InvalidWindow { .. })));
    }

    #[test]
    fn test_no_participants_yields_no_segments() {
        assert!(partition(&window(), &[]).unwrap().is_empty());
    }
}

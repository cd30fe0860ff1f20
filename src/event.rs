//! Lifecycle event catalog
//!
//! The runner emits a closed set of events in a fixed relative order:
//!
//! ```text
//! Started
//!   (per epoch)
//!     EpochStarted
//!       (per batch)
//!         BatchStarted
//!         BatchFinished
//!     EpochFinished
//! Finished
//! ```
//!
//! Every `Started` is eventually followed by exactly one `Finished`, even
//! when the run is stopped early. An epoch that was entered always gets its
//! `EpochFinished`, and a batch that was started always gets its
//! `BatchFinished`.

use std::fmt;

/// A named point in the iteration lifecycle at which registered callbacks
/// are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Emitted once at the start of a run.
    Started,
    /// Emitted at the start of each epoch.
    EpochStarted,
    /// Emitted at the start of each batch, before processing.
    BatchStarted,
    /// Emitted after each batch has been processed.
    BatchFinished,
    /// Emitted every time an epoch is finished, including interrupted ones.
    EpochFinished,
    /// Emitted once when a run is finished.
    Finished,
}

impl Event {
    /// Number of distinct events.
    pub const COUNT: usize = 6;

    /// All events, in their relative emission order.
    pub const ALL: [Event; Event::COUNT] = [
        Event::Started,
        Event::EpochStarted,
        Event::BatchStarted,
        Event::BatchFinished,
        Event::EpochFinished,
        Event::Finished,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_are_distinct() {
        for (i, a) in Event::ALL.iter().enumerate() {
            for b in &Event::ALL[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_index_matches_catalog_order() {
        for (i, event) in Event::ALL.iter().enumerate() {
            assert_eq!(event.index(), i);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Event::BatchStarted.to_string(), "BatchStarted");
        assert_eq!(Event::Finished.to_string(), "Finished");
    }
}

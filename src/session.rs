//! Reassembly of multi-part shares from a stream of scanned QR payloads.
//!
//! Scans arrive in any order, repeat constantly while the camera points at a code, and may
//! switch to a different share's codes part way through. [`ScanState`] is the pure state
//! machine; [`ScanSession`] owns one, routes plain shares around it and starts over after
//! each completed share.

use std::collections::{BTreeMap, HashSet};
use std::mem;

use serde::Serialize;
use tracing::{debug, warn};

use crate::chunks::{looks_like_payload, parse_payload, QrChunk};

/// Reassembly progress for a multi-part share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub collected: usize,
    pub expected_total: usize,
    /// 1-based positions still to scan.
    pub missing: Vec<usize>,
}

/// What a scanned payload did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A new part was stored.
    Progress(ScanProgress),
    /// The part was already collected.
    Duplicate { index: usize },
    /// The part belongs to a set with a different size; earlier parts were dropped and
    /// collection restarted from this one.
    Restarted {
        discarded: usize,
        progress: ScanProgress,
    },
    /// A whole share is available.
    Complete(String),
    /// The payload belongs to the share completed just before.
    Stale,
    /// The payload has the chunk shape but an impossible position or total.
    Rejected,
    /// The state had already completed.
    Ignored,
}

/// Reassembly state for one share.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Empty,
    Collecting {
        collected: BTreeMap<usize, String>,
        expected_total: usize,
    },
    Complete {
        data: String,
    },
}

impl ScanState {
    /// Applies one parsed chunk and returns the next state.
    ///
    /// * A chunk whose total differs from the collecting set discards everything collected
    ///   and seeds a new set.
    /// * A chunk whose index is already collected changes nothing.
    /// * The chunk that fills the set moves to `Complete` with the parts joined in order.
    ///
    /// `Complete` absorbs further chunks unchanged.
    pub fn apply(self, chunk: QrChunk) -> (ScanState, ScanOutcome) {
        match self {
            ScanState::Complete { data } => (ScanState::Complete { data }, ScanOutcome::Ignored),
            ScanState::Empty => Self::seed(chunk, 0),
            ScanState::Collecting {
                collected,
                expected_total,
            } if expected_total != chunk.total => Self::seed(chunk, collected.len()),
            ScanState::Collecting {
                mut collected,
                expected_total,
            } => {
                if collected.contains_key(&chunk.index) {
                    let index = chunk.index;
                    return (
                        ScanState::Collecting {
                            collected,
                            expected_total,
                        },
                        ScanOutcome::Duplicate { index },
                    );
                }

                collected.insert(chunk.index, chunk.data);
                Self::settle(collected, expected_total, ScanOutcome::Progress)
            }
        }
    }

    /// Progress of the set being collected, if any.
    pub fn progress(&self) -> Option<ScanProgress> {
        match self {
            ScanState::Collecting {
                collected,
                expected_total,
            } => Some(progress_of(collected, *expected_total)),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ScanState::Complete { .. })
    }

    fn seed(chunk: QrChunk, discarded: usize) -> (ScanState, ScanOutcome) {
        let expected_total = chunk.total;
        let mut collected = BTreeMap::new();
        collected.insert(chunk.index, chunk.data);

        Self::settle(collected, expected_total, |progress| {
            if discarded > 0 {
                ScanOutcome::Restarted {
                    discarded,
                    progress,
                }
            } else {
                ScanOutcome::Progress(progress)
            }
        })
    }

    fn settle(
        collected: BTreeMap<usize, String>,
        expected_total: usize,
        outcome: impl FnOnce(ScanProgress) -> ScanOutcome,
    ) -> (ScanState, ScanOutcome) {
        if collected.len() == expected_total {
            let data: String = collected.into_values().collect();
            (
                ScanState::Complete { data: data.clone() },
                ScanOutcome::Complete(data),
            )
        } else {
            let progress = progress_of(&collected, expected_total);
            (
                ScanState::Collecting {
                    collected,
                    expected_total,
                },
                outcome(progress),
            )
        }
    }
}

fn progress_of(collected: &BTreeMap<usize, String>, expected_total: usize) -> ScanProgress {
    ScanProgress {
        collected: collected.len(),
        expected_total,
        missing: (0..expected_total)
            .filter(|i| !collected.contains_key(i))
            .map(|i| i + 1)
            .collect(),
    }
}

/// Owns the reassembly state for one scanning interaction.
///
/// After a share completes the state starts over empty, and payloads of the share just
/// completed are reported as `Stale` so a code still in view does not seed the next share.
/// That memory lasts until a part of another set is accepted, after which the completed
/// share can be scanned again.
#[derive(Debug, Default)]
pub struct ScanSession {
    state: ScanState,
    pending: Vec<String>,
    retired: HashSet<String>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one decoded QR payload into the session.
    pub fn ingest(&mut self, text: &str) -> ScanOutcome {
        if self.retired.contains(text) {
            return ScanOutcome::Stale;
        }

        let Some(chunk) = parse_payload(text) else {
            if looks_like_payload(text) {
                warn!("ignoring QR part with an impossible position or total");
                return ScanOutcome::Rejected;
            }
            debug!("single-part share of {} characters scanned", text.len());
            self.retire(vec![text.to_string()]);
            return ScanOutcome::Complete(text.to_string());
        };

        if matches!(self.state, ScanState::Empty) {
            self.retired.clear();
        }

        let total = chunk.total;
        let state = mem::take(&mut self.state);
        let (state, outcome) = state.apply(chunk);

        match &outcome {
            ScanOutcome::Progress(progress) => {
                self.pending.push(text.to_string());
                debug!(
                    "scanned {}/{} parts",
                    progress.collected, progress.expected_total
                );
            }
            ScanOutcome::Restarted { discarded, progress } => {
                self.pending = vec![text.to_string()];
                debug!(
                    "different set detected, discarded {} parts, now expecting {}",
                    discarded, progress.expected_total
                );
            }
            ScanOutcome::Duplicate { index } => {
                debug!("part {} already scanned, ignoring", index + 1);
            }
            ScanOutcome::Complete(data) => {
                let mut payloads = mem::take(&mut self.pending);
                payloads.retain(|p| parse_payload(p).is_some_and(|c| c.total == total));
                payloads.push(text.to_string());
                self.retire(payloads);
                debug!("multi-part share of {} characters complete", data.len());
                // the completed string has been handed out; start over
                self.state = ScanState::Empty;
                return outcome;
            }
            ScanOutcome::Stale | ScanOutcome::Rejected | ScanOutcome::Ignored => {}
        }

        self.state = state;
        outcome
    }

    pub fn progress(&self) -> Option<ScanProgress> {
        self.state.progress()
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Drops everything collected, including the memory of the last completed share.
    pub fn cancel(&mut self) {
        self.state = ScanState::Empty;
        self.pending.clear();
        self.retired.clear();
    }

    fn retire(&mut self, payloads: Vec<String>) {
        self.retired = payloads.into_iter().collect();
    }
}

use futures::channel::mpsc;
use futures::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::session::{ScanOutcome, ScanProgress, ScanSession};

/// Events delivered by a frame source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Text decoded from one camera frame.
    Decoded(String),
    /// The operator aborted scanning.
    Cancel,
}

/// Drops an identical payload seen again within `window` of its last acceptance.
///
/// The camera decodes the same code many times per second; only the first sighting in each
/// window reaches the session.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer { window, last: None }
    }

    /// Returns `true` if `text` observed at `now` should be processed.
    pub fn admit(&mut self, text: &str, now: Instant) -> bool {
        if let Some((last_text, accepted_at)) = &self.last {
            if last_text == text && now.saturating_duration_since(*accepted_at) < self.window {
                return false;
            }
        }
        self.last = Some((text.to_string(), now));
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Consumes scan events one at a time and emits every reconstructed share.
///
/// The loop owns its [`ScanSession`]; nothing else mutates it. Closing the event channel or
/// sending [`ScanEvent::Cancel`] ends the loop and drops whatever was collected.
///
/// # Examples
///
/// ```ignore
/// let (mut events, mut shares, scan_loop) = scanner::new(16, Duration::from_secs(1));
/// tokio::spawn(scan_loop.run());
/// events.send(ScanEvent::Decoded(text)).await?;
/// let share = shares.next().await;
/// ```
pub struct ScanLoop {
    pub event_receiver: mpsc::Receiver<ScanEvent>,
    pub share_sender: mpsc::Sender<String>,
    session: ScanSession,
    debouncer: Debouncer,
}

/// Totals reported when a scan loop stops.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub completed: usize,
    pub cancelled: bool,
}

impl ScanLoop {
    pub fn new(
        event_receiver: mpsc::Receiver<ScanEvent>,
        share_sender: mpsc::Sender<String>,
        debounce: Duration,
    ) -> Self {
        Self {
            event_receiver,
            share_sender,
            session: ScanSession::new(),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Runs until the event channel closes, a cancel arrives, or the share receiver is
    /// dropped.
    pub async fn run(mut self) -> ScanSummary {
        info!("scan loop started");
        let mut summary = ScanSummary::default();

        while let Some(event) = self.event_receiver.next().await {
            match event {
                ScanEvent::Decoded(text) => {
                    let Some(share) = self.handle_decoded(&text, Instant::now()) else {
                        continue;
                    };
                    summary.completed += 1;
                    if self.share_sender.send(share).await.is_err() {
                        warn!("share receiver dropped, stopping scan loop");
                        break;
                    }
                }
                ScanEvent::Cancel => {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        self.session.cancel();
        self.debouncer.reset();
        info!(
            "scan loop stopped after {} shares (cancelled: {})",
            summary.completed, summary.cancelled
        );
        summary
    }

    /// Processes one decoded payload and returns a completed share, if any.
    pub fn handle_decoded(&mut self, text: &str, now: Instant) -> Option<String> {
        let text = text.trim();
        if text.is_empty() || !self.debouncer.admit(text, now) {
            return None;
        }

        match self.session.ingest(text) {
            ScanOutcome::Complete(share) => Some(share),
            ScanOutcome::Restarted { discarded, .. } => {
                warn!("different QR set detected, {discarded} collected parts discarded");
                None
            }
            outcome => {
                debug!("scan outcome: {outcome:?}");
                None
            }
        }
    }

    pub fn progress(&self) -> Option<ScanProgress> {
        self.session.progress()
    }
}

/// Creates a scan loop together with the sender feeding it and the receiver of completed
/// shares.
pub fn new(
    buffer: usize,
    debounce: Duration,
) -> (
    mpsc::Sender<ScanEvent>,
    mpsc::Receiver<String>,
    ScanLoop,
) {
    let (event_sender, event_receiver) = mpsc::channel(buffer);
    let (share_sender, share_receiver) = mpsc::channel(buffer);
    (
        event_sender,
        share_receiver,
        ScanLoop::new(event_receiver, share_sender, debounce),
    )
}

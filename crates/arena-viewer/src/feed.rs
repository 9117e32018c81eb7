//! Event feed: the transport side of the engine.
//!
//! A reader task decodes newline-delimited JSON events and pushes them into
//! a bounded channel. The driver drains the channel on the caller's task and
//! applies each event to the engine synchronously, one at a time.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use arena_protocol::GameEvent;
use arena_state::{EventOutcome, TaskStateEngine};

use crate::ViewerError;

/// Counters from the reader task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub lines: usize,
    pub forwarded: usize,
    pub skipped: usize,
}

/// Counters from [`drive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStats {
    pub applied: usize,
    pub ignored: usize,
}

pub struct EventFeed {
    rx: mpsc::Receiver<GameEvent>,
    reader: JoinHandle<Result<FeedStats, ViewerError>>,
}

impl EventFeed {
    /// Spawn a reader over `source`. Blank, undecodable and invalid lines
    /// are skipped.
    pub fn spawn<R>(source: R, capacity: usize) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let reader = tokio::spawn(async move {
            let mut stats = FeedStats::default();
            let mut lines = source.lines();
            while let Some(line) = lines.next_line().await? {
                stats.lines += 1;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let event = match GameEvent::from_json(line).and_then(|event| event.validate().map(|()| event)) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(line = stats.lines, error = %e, "Skipping malformed event");
                        stats.skipped += 1;
                        continue;
                    }
                };
                if tx.send(event).await.is_err() {
                    tracing::debug!("Event feed receiver dropped; stopping reader");
                    break;
                }
                stats.forwarded += 1;
            }
            tracing::debug!(?stats, "Event source exhausted");
            Ok::<_, ViewerError>(stats)
        });
        Self { rx, reader }
    }

    /// Feed already-decoded events, as a simulated transport would.
    pub fn from_events(events: Vec<GameEvent>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let reader = tokio::spawn(async move {
            let mut stats = FeedStats::default();
            for event in events {
                stats.lines += 1;
                if tx.send(event).await.is_err() {
                    break;
                }
                stats.forwarded += 1;
            }
            Ok::<_, ViewerError>(stats)
        });
        Self { rx, reader }
    }

    pub async fn recv(&mut self) -> Option<GameEvent> {
        self.rx.recv().await
    }

    /// Wait for the reader task and return its counters.
    pub async fn finish(self) -> Result<FeedStats, ViewerError> {
        drop(self.rx);
        self.reader
            .await
            .map_err(|e| ViewerError::FeedTask(e.to_string()))?
    }
}

/// Apply every event from `feed` to `engine` until the source is exhausted.
pub async fn drive(engine: &mut TaskStateEngine, feed: &mut EventFeed) -> DriveStats {
    let mut stats = DriveStats::default();
    while let Some(event) = feed.recv().await {
        let game_id = event.routing_game_id();
        match event.timestamp_utc() {
            Ok(Some(at)) => tracing::trace!(game_id, event_type = event.event_type(), %at, "Event received"),
            Ok(None) => tracing::trace!(game_id, event_type = event.event_type(), "Event received"),
            Err(e) => tracing::warn!(game_id, error = %e, "Event timestamp unreadable"),
        }
        match engine.handle_game_event(game_id, &event) {
            EventOutcome::Applied => stats.applied += 1,
            EventOutcome::Ignored(reason) => {
                tracing::debug!(game_id, ?reason, "Event ignored");
                stats.ignored += 1;
            }
        }
    }
    stats
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Native filesystem event source
//!
//! Thin wrapper over `notify`'s recommended watcher that forwards raw events
//! into a tokio channel. Directories are always watched non-recursively;
//! recursion is handled by the watch engine so it can track exactly which
//! directories are covered.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Bridges OS change notifications into async code

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Raw event or error as produced by the OS backend
pub type NativeEvent = notify::Result<Event>;

/// Native events buffered per watcher before new ones are dropped
pub const DEFAULT_NATIVE_QUEUE_CAPACITY: usize = 4096;

/// One native watcher. Dropping it stops all of its watches and closes the
/// event channel.
pub struct NativeWatcher {
    watcher: RecommendedWatcher,
}

impl NativeWatcher {
    /// Create a watcher whose events queue up to `capacity` deep.
    ///
    /// The OS callback never blocks: when the queue is full the event is
    /// dropped and counted on the returned [`NativeEvents`].
    pub fn new(capacity: usize) -> notify::Result<(Self, NativeEvents)> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let counter = dropped.clone();

        let watcher = RecommendedWatcher::new(
            move |result: NativeEvent| enqueue(&tx, &counter, result),
            notify::Config::default(),
        )?;

        Ok((Self { watcher }, NativeEvents { rx, dropped }))
    }

    /// Watch one directory (or file) without descending into it
    pub fn add(&mut self, path: &Path) -> notify::Result<()> {
        self.watcher.watch(path, RecursiveMode::NonRecursive)
    }

    pub fn remove(&mut self, path: &Path) -> notify::Result<()> {
        self.watcher.unwatch(path)
    }
}

impl std::fmt::Debug for NativeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeWatcher").finish_non_exhaustive()
    }
}

/// Receiving side of a [`NativeWatcher`]
pub struct NativeEvents {
    rx: mpsc::Receiver<NativeEvent>,
    dropped: Arc<AtomicU64>,
}

impl NativeEvents {
    pub async fn recv(&mut self) -> Option<NativeEvent> {
        self.rx.recv().await
    }

    /// Events lost to a full queue since the last call
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

fn enqueue(tx: &mpsc::Sender<NativeEvent>, dropped: &AtomicU64, event: NativeEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
        // Receiver gone means the session is shutting down
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> NativeEvent {
        Ok(Event::new(notify::EventKind::Any))
    }

    #[tokio::test]
    async fn test_full_queue_counts_dropped_events() {
        let (tx, rx) = mpsc::channel(2);
        let dropped = Arc::new(AtomicU64::new(0));
        let mut events = NativeEvents {
            rx,
            dropped: dropped.clone(),
        };

        for _ in 0..5 {
            enqueue(&tx, &dropped, event());
        }
        assert_eq!(events.take_dropped(), 3);
        assert_eq!(events.take_dropped(), 0);

        assert!(events.recv().await.is_some());
        assert!(events.recv().await.is_some());
        enqueue(&tx, &dropped, event());
        assert_eq!(events.take_dropped(), 0);
    }

    #[test]
    fn test_closed_queue_is_not_an_overflow() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let dropped = AtomicU64::new(0);
        enqueue(&tx, &dropped, event());
        assert_eq!(dropped.load(Ordering::Relaxed), 0);
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Watch Engine
//!
//! Per-client change notification sessions. Each session owns one native
//! watcher and a lock-guarded set of watched directories, and multiplexes:
//!
//! - subscription requests arriving from the client (handled by a spawned
//!   receiver task that reports its terminal outcome on a oneshot)
//! - native change events, translated to share-relative [`WatchEvent`]s
//! - session cancellation
//!
//! Recursive subscriptions are expanded by the engine: every directory in the
//! subtree is watched individually, and directories created later under a
//! recursive watch are added before their CREATE event is forwarded.
//!
//! Subscriptions are resolved through symlinks and must land inside the
//! share. Watches are registered under the resolved path, so events for a
//! directory reached through an in-share symlink are reported under its real
//! location.
//!
//! Per-subscription failures never end the session; they are reported in-band
//! as ATTRIB events carrying `error: ...` in `old_path`.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Bridges native filesystem events to remote watch streams

use crate::domain::path_confinement::{ConfinementError, PathConfinement};
use crate::domain::watch::{WatchEvent, WatchEventKind, WatchSubscription};
use crate::infrastructure::watcher::{NativeEvents, NativeWatcher, DEFAULT_NATIVE_QUEUE_CAPACITY};
use futures::{Stream, StreamExt};
use notify::event::{EventKind, ModifyKind, RenameMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Confinement(#[from] ConfinementError),

    #[error("{0}")]
    Native(#[from] notify::Error),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("subscription stream failed: {0}")]
    Receive(String),

    #[error("watch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("watch session closed")]
    Closed,
}

impl WatchError {
    /// Text for an in-band error event; avoids echoing host paths back
    fn client_message(&self) -> String {
        match self {
            WatchError::Confinement(ConfinementError::Escape(_)) => {
                "path escapes share root".to_string()
            }
            WatchError::Io { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

/// Creates watch sessions for one share
#[derive(Debug, Clone)]
pub struct WatchEngine {
    confinement: PathConfinement,
}

impl WatchEngine {
    pub fn new(confinement: PathConfinement) -> Self {
        Self { confinement }
    }

    /// Start a new session with its own native watcher
    pub fn open_session(&self) -> Result<WatchSession, WatchError> {
        let (watcher, native_events) = NativeWatcher::new(DEFAULT_NATIVE_QUEUE_CAPACITY)?;
        Ok(WatchSession {
            subscriptions: Subscriptions {
                confinement: self.confinement.clone(),
                inner: Arc::new(Mutex::new(SubscriptionSet {
                    watcher: Some(watcher),
                    watched: HashMap::new(),
                })),
            },
            native_events,
        })
    }
}

/// Native watcher plus the directories registered with it. Both live under
/// one lock so membership and the OS watch list never disagree.
struct SubscriptionSet {
    watcher: Option<NativeWatcher>,
    /// watched absolute path -> recursive flag
    watched: HashMap<PathBuf, bool>,
}

impl SubscriptionSet {
    fn add(&mut self, path: &Path, recursive: bool) -> Result<(), WatchError> {
        if let Some(existing) = self.watched.get_mut(path) {
            *existing |= recursive;
            return Ok(());
        }
        let watcher = self.watcher.as_mut().ok_or(WatchError::Closed)?;
        watcher.add(path)?;
        self.watched.insert(path.to_path_buf(), recursive);
        Ok(())
    }

    /// Drop `path` and everything registered beneath it
    fn remove_tree(&mut self, path: &Path) {
        let gone: Vec<PathBuf> = self
            .watched
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        for p in gone {
            self.watched.remove(&p);
            if let Some(watcher) = self.watcher.as_mut() {
                // The OS usually drops the watch itself when the directory goes
                let _ = watcher.remove(&p);
            }
        }
    }
}

/// Cloneable handle on a session's subscription state
#[derive(Clone)]
struct Subscriptions {
    confinement: PathConfinement,
    inner: Arc<Mutex<SubscriptionSet>>,
}

impl Subscriptions {
    /// Confine and register `path`; with `recursive`, walk and register every
    /// directory below it. Failures below the top directory are skipped.
    ///
    /// Returns the number of paths newly registered or upgraded. Blocking.
    fn subscribe(&self, path: &str, recursive: bool) -> Result<usize, WatchError> {
        let abs = self.confinement.confine(path)?;
        let io_err = |source: std::io::Error| WatchError::Io {
            path: path.to_string(),
            source,
        };
        let resolved = std::fs::canonicalize(&abs).map_err(io_err)?;
        if !self.confinement.contains(&resolved) {
            warn!(path = %path, "Watch target escapes share root");
            return Err(ConfinementError::Escape(path.to_string()).into());
        }
        let meta = std::fs::metadata(&resolved).map_err(io_err)?;

        self.inner.lock().add(&resolved, recursive)?;
        let mut added = 1;

        if recursive && meta.is_dir() {
            added += self.add_subdirectories(&resolved);
        }
        Ok(added)
    }

    /// True when `path`'s parent is watched recursively
    fn covered_recursively(&self, path: &Path) -> bool {
        path.parent()
            .and_then(|parent| self.inner.lock().watched.get(parent).copied())
            .unwrap_or(false)
    }

    /// Register a newly created directory and anything already inside it
    fn add_created_directory(&self, path: &Path) {
        match std::fs::canonicalize(path) {
            Ok(resolved) if self.confinement.contains(&resolved) => {}
            Ok(_) => {
                warn!(path = ?path, "New directory resolves outside share root");
                return;
            }
            Err(e) => {
                debug!(path = ?path, error = %e, "New directory vanished");
                return;
            }
        }

        let result = self.inner.lock().add(path, true);
        match result {
            Ok(()) => {
                let nested = self.add_subdirectories(path);
                debug!(path = ?path, nested, "Auto-watching new directory");
            }
            Err(e) => warn!(path = ?path, error = %e, "Failed to watch new directory"),
        }
    }

    /// Walk `root` without holding the lock, then register each directory
    fn add_subdirectories(&self, root: &Path) -> usize {
        let mut dirs = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Skipping unreadable entry during walk"),
            }
        }

        let mut added = 0;
        for dir in dirs {
            let result = self.inner.lock().add(&dir, true);
            match result {
                Ok(()) => added += 1,
                Err(e) => debug!(path = ?dir, error = %e, "Skipping subdirectory"),
            }
        }
        added
    }

    fn forget(&self, path: &Path) {
        self.inner.lock().remove_tree(path);
    }

    fn watched_count(&self) -> usize {
        self.inner.lock().watched.len()
    }

    /// Tear down the native watcher. Later adds fail with `Closed`.
    fn close(&self) {
        let mut set = self.inner.lock();
        set.watched.clear();
        set.watcher = None;
    }
}

/// One client's watch stream
pub struct WatchSession {
    subscriptions: Subscriptions,
    native_events: NativeEvents,
}

impl WatchSession {
    /// Subscribe before (or outside of) the streaming loop
    pub async fn subscribe(&self, subscription: WatchSubscription) -> Result<usize, WatchError> {
        let subs = self.subscriptions.clone();
        tokio::task::spawn_blocking(move || subs.subscribe(&subscription.path, subscription.recursive))
            .await?
    }

    /// Number of directories currently registered
    pub fn watched_count(&self) -> usize {
        self.subscriptions.watched_count()
    }

    /// Run the session until the client goes away or `cancel` fires.
    ///
    /// `requests` is the client's subscription stream. An error on it ends the
    /// session. Its clean end (half-close) ends the session only once nothing
    /// is watched; otherwise events keep flowing until the watch set empties.
    /// Events are sent on `events`; when its receiver is dropped the session
    /// ends.
    pub async fn run<S, E>(
        mut self,
        requests: S,
        events: mpsc::Sender<WatchEvent>,
        cancel: CancellationToken,
    ) -> Result<(), WatchError>
    where
        S: Stream<Item = Result<WatchSubscription, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
    {
        let (done_tx, mut done_rx) = oneshot::channel();
        let receiver = tokio::spawn(receive_subscriptions(
            requests,
            self.subscriptions.clone(),
            events.clone(),
            done_tx,
        ));
        let mut requests_open = true;

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Watch session cancelled");
                    break Ok(());
                }
                _ = events.closed() => {
                    debug!("Watch client went away");
                    break Ok(());
                }
                outcome = &mut done_rx, if requests_open => match outcome {
                    Ok(Ok(())) => {
                        debug!("Client closed its subscription stream");
                        requests_open = false;
                    }
                    Ok(Err(e)) => break Err(WatchError::Receive(e)),
                    Err(_) => break Err(WatchError::Receive("receiver task ended".into())),
                },
                native = self.native_events.recv() => {
                    let dropped = self.native_events.take_dropped();
                    if dropped > 0 {
                        warn!(dropped, "Native event queue overflowed");
                        let notice = WatchEvent::watcher_error(format!(
                            "event queue overflow, {dropped} events dropped"
                        ));
                        if !forward(&events, notice, &cancel).await {
                            break Ok(());
                        }
                    }

                    match native {
                        Some(Ok(event)) => {
                            if !self.dispatch(event, &events, &cancel).await {
                                break Ok(());
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Native watcher error");
                            if !forward(&events, WatchEvent::watcher_error(&e), &cancel).await {
                                break Ok(());
                            }
                        }
                        None => break Err(WatchError::Closed),
                    }
                }
            }

            if !requests_open && self.subscriptions.watched_count() == 0 {
                debug!("Nothing left to watch after half-close");
                break Ok(());
            }
        };

        receiver.abort();
        self.subscriptions.close();
        info!("Watch session ended");
        result
    }

    /// Translate and forward one native event. Returns false once the client
    /// is gone or the session is cancelled.
    async fn dispatch(
        &self,
        event: notify::Event,
        events: &mpsc::Sender<WatchEvent>,
        cancel: &CancellationToken,
    ) -> bool {
        for (kind, path, old_path) in classify(&event) {
            let confinement = &self.subscriptions.confinement;
            let Some(rel) = confinement.relative_to_root(&path) else {
                continue;
            };

            // Keep the watch set in step before the client hears about it
            match kind {
                WatchEventKind::Create => self.maybe_watch_new_directory(&path).await,
                WatchEventKind::Delete => self.subscriptions.forget(&path),
                WatchEventKind::Rename => {
                    self.subscriptions.forget(old_path.as_deref().unwrap_or(path.as_path()));
                    self.maybe_watch_new_directory(&path).await;
                }
                _ => {}
            }

            let out = match old_path {
                Some(old) => {
                    let Some(old_rel) = confinement.relative_to_root(&old) else {
                        continue;
                    };
                    WatchEvent::renamed(old_rel, rel)
                }
                None => WatchEvent::new(kind, rel),
            };

            if !forward(events, out, cancel).await {
                return false;
            }
        }
        true
    }

    async fn maybe_watch_new_directory(&self, path: &Path) {
        if !self.subscriptions.covered_recursively(path) {
            return;
        }
        // lstat: a symlink to a directory is not descended into
        let is_dir = tokio::fs::symlink_metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return;
        }

        let subs = self.subscriptions.clone();
        let path = path.to_path_buf();
        if let Err(e) = tokio::task::spawn_blocking(move || subs.add_created_directory(&path)).await {
            warn!(error = %WatchError::from(e), "Auto-watch task failed");
        }
    }
}

/// Send one event, giving up if the session is cancelled while the client
/// is not reading. Returns false when the event could not be delivered.
async fn forward(
    events: &mpsc::Sender<WatchEvent>,
    event: WatchEvent,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        sent = events.send(event) => sent.is_ok(),
        _ = cancel.cancelled() => false,
    }
}

async fn receive_subscriptions<S, E>(
    mut requests: S,
    subscriptions: Subscriptions,
    events: mpsc::Sender<WatchEvent>,
    done: oneshot::Sender<Result<(), String>>,
) where
    S: Stream<Item = Result<WatchSubscription, E>> + Unpin,
    E: Display,
{
    let outcome = loop {
        match requests.next().await {
            Some(Ok(sub)) => {
                let subs = subscriptions.clone();
                let requested = sub.path.clone();
                let result =
                    tokio::task::spawn_blocking(move || subs.subscribe(&sub.path, sub.recursive))
                        .await
                        .map_err(WatchError::from)
                        .and_then(|r| r);

                match result {
                    Ok(added) => debug!(path = %requested, added, "Subscribed"),
                    Err(e) => {
                        warn!(path = %requested, error = %e, "Subscription failed");
                        let event = WatchEvent::subscription_error(
                            requested.replace('\\', "/"),
                            e.client_message(),
                        );
                        if events.send(event).await.is_err() {
                            break Ok(());
                        }
                    }
                }
            }
            Some(Err(e)) => break Err(e.to_string()),
            None => break Ok(()),
        }
    };
    let _ = done.send(outcome);
}

/// Map a native event to `(kind, path, rename source)` triples.
///
/// A rename seen as separate halves yields RENAME for the old name and CREATE
/// for the new one. A paired rename notification is reported as one RENAME
/// with its source only when the backend delivers it without the halves.
fn classify(event: &notify::Event) -> Vec<(WatchEventKind, PathBuf, Option<PathBuf>)> {
    let each = |kind: WatchEventKind| {
        event
            .paths
            .iter()
            .map(|p| (kind, p.clone(), None))
            .collect::<Vec<_>>()
    };

    match &event.kind {
        EventKind::Create(_) => each(WatchEventKind::Create),
        EventKind::Remove(_) => each(WatchEventKind::Delete),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => each(WatchEventKind::Rename),
            RenameMode::To => each(WatchEventKind::Create),
            // inotify sends From and To before Both; they already cover it
            RenameMode::Both if cfg!(target_os = "linux") => Vec::new(),
            RenameMode::Both => match event.paths.as_slice() {
                [from, to] => vec![(WatchEventKind::Rename, to.clone(), Some(from.clone()))],
                _ => each(WatchEventKind::Rename),
            },
            RenameMode::Any | RenameMode::Other => each(WatchEventKind::Rename),
        },
        EventKind::Modify(_) => each(WatchEventKind::Modify),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut e = notify::Event::new(kind);
        for p in paths {
            e = e.add_path(PathBuf::from(p));
        }
        e
    }

    fn kinds(event: &notify::Event) -> Vec<WatchEventKind> {
        classify(event).into_iter().map(|(k, _, _)| k).collect()
    }

    #[test]
    fn test_classify_basic_kinds() {
        assert_eq!(
            kinds(&event(EventKind::Create(CreateKind::File), &["/s/a"])),
            [WatchEventKind::Create]
        );
        assert_eq!(
            kinds(&event(EventKind::Remove(RemoveKind::Any), &["/s/a"])),
            [WatchEventKind::Delete]
        );
        assert_eq!(
            kinds(&event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/s/a"]
            )),
            [WatchEventKind::Modify]
        );
        assert_eq!(
            kinds(&event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                &["/s/a"]
            )),
            [WatchEventKind::Modify]
        );
    }

    #[test]
    fn test_classify_drops_unrecognized() {
        assert!(kinds(&event(EventKind::Any, &["/s/a"])).is_empty());
        assert!(kinds(&event(EventKind::Other, &["/s/a"])).is_empty());
        assert!(kinds(&event(
            EventKind::Access(notify::event::AccessKind::Read),
            &["/s/a"]
        ))
        .is_empty());
    }

    #[test]
    fn test_classify_rename_halves() {
        let from = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/s/old"]);
        let to = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/s/new"]);
        assert_eq!(kinds(&from), [WatchEventKind::Rename]);
        assert_eq!(kinds(&to), [WatchEventKind::Create]);
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_classify_paired_rename() {
        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/s/old", "/s/new"],
        );
        let out = classify(&both);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1, PathBuf::from("/s/new"));
        assert_eq!(out[0].2, Some(PathBuf::from("/s/old")));
    }

    #[tokio::test]
    async fn test_join_failure_is_a_task_error() {
        let task = tokio::spawn(std::future::pending::<()>());
        task.abort();
        let err = WatchError::from(task.await.unwrap_err());
        assert!(matches!(err, WatchError::Task(_)));
        assert!(err.client_message().starts_with("watch task failed"));
    }

    #[tokio::test]
    async fn test_forward_gives_up_on_cancel() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        assert!(forward(&tx, WatchEvent::new(WatchEventKind::Create, "a"), &cancel).await);

        // Channel is full and nobody reads it
        cancel.cancel();
        let sent = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            forward(&tx, WatchEvent::new(WatchEventKind::Create, "b"), &cancel),
        )
        .await
        .expect("forward blocked past cancellation");
        assert!(!sent);
    }

    #[test]
    fn test_client_message_hides_escape_path() {
        let e = WatchError::Confinement(ConfinementError::Escape("../../etc".into()));
        assert_eq!(e.client_message(), "path escapes share root");
    }
}

//! The watch loop: wait for notifications, route them, extend the registry.
//!
//! One dispatcher runs on one worker thread and is the only code touching
//! its registry, so the registry needs no locking.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, select};
use notify::Event;

use super::event::{ChangeEvent, ChangeKind};
use super::handler::ChangeHandler;
use super::registry::WatchRegistry;
use crate::types::{WatchConfig, WatchHandle};

/// Default bound on a single wait. Only a liveness check, not a deadline.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Observable phase of the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    Idle = 0,
    Waiting = 1,
    Dispatching = 2,
    Stopped = 3,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoopState::Waiting,
            2 => LoopState::Dispatching,
            3 => LoopState::Stopped,
            _ => LoopState::Idle,
        }
    }
}

/// Loop state shared between the worker and its controller.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<AtomicU8>);

impl SharedState {
    pub fn get(&self) -> LoopState {
        LoopState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: LoopState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// The wait timed out without events.
    Idle,
    /// The wait was woken without events (stop request or spurious wake).
    Woken,
    /// A batch of this many change events was dispatched.
    Dispatched(usize),
    /// The event source is gone; no further events can arrive.
    Disconnected,
}

/// Tunables for the loop.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherOptions {
    pub poll_timeout: Duration,
    /// Forward synthetic Created events for entries found inside a newly
    /// registered directory.
    pub sync_new_directories: bool,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            sync_new_directories: true,
        }
    }
}

/// Drives the wait → dispatch → extend cycle.
pub struct Dispatcher {
    registry: WatchRegistry,
    events: Receiver<notify::Result<Event>>,
    wake: Receiver<()>,
    handler: Box<dyn ChangeHandler>,
    options: DispatcherOptions,
    state: SharedState,
}

impl Dispatcher {
    pub fn new(
        registry: WatchRegistry,
        events: Receiver<notify::Result<Event>>,
        wake: Receiver<()>,
        handler: Box<dyn ChangeHandler>,
        options: DispatcherOptions,
    ) -> Self {
        Self {
            registry,
            events,
            wake,
            handler,
            options,
            state: SharedState::default(),
        }
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Run iterations until `stop` is set or the event source disconnects.
    pub fn run(mut self, stop: &AtomicBool) {
        crate::log_event!(
            "watcher",
            "started",
            "{} directories watched",
            self.registry.len()
        );

        while !stop.load(Ordering::SeqCst) {
            match self.run_iteration() {
                Iteration::Idle => crate::debug_event!("watcher", "idle"),
                Iteration::Woken => crate::debug_event!("watcher", "woken"),
                Iteration::Dispatched(count) => {
                    crate::debug_event!("watcher", "dispatched", "{count} events")
                }
                Iteration::Disconnected => {
                    tracing::error!("[watcher] event source disconnected");
                    break;
                }
            }
        }

        self.state.set(LoopState::Stopped);
        crate::log_event!("watcher", "stopped");
    }

    /// Wait for the next batch and dispatch it.
    pub fn run_iteration(&mut self) -> Iteration {
        self.state.set(LoopState::Waiting);

        let first = select! {
            recv(self.events) -> message => match message {
                Ok(result) => result,
                Err(_) => return Iteration::Disconnected,
            },
            recv(self.wake) -> _ => {
                self.state.set(LoopState::Idle);
                return Iteration::Woken;
            }
            default(self.options.poll_timeout) => {
                self.state.set(LoopState::Idle);
                return Iteration::Idle;
            }
        };

        self.state.set(LoopState::Dispatching);

        // Everything already queued belongs to this batch
        let mut batch = Vec::new();
        collect(first, &mut batch);
        for result in self.events.try_iter() {
            collect(result, &mut batch);
        }

        let count = batch.len();
        self.dispatch(batch);
        self.state.set(LoopState::Idle);
        Iteration::Dispatched(count)
    }

    /// Route a batch of events, then re-arm every handle it touched.
    pub fn dispatch(&mut self, batch: Vec<ChangeEvent>) {
        let mut touched: Vec<WatchHandle> = Vec::new();
        let mut seen = HashSet::new();

        for event in batch {
            let Some(handle) = self.registry.resolve(&event.watched_directory) else {
                // A watched directory reporting its own removal
                if event.kind == ChangeKind::Deleted {
                    if let Some(own) = self.registry.resolve(&event.path()) {
                        if seen.insert(own) {
                            touched.push(own);
                        }
                    }
                }
                crate::debug_event!(
                    "watcher",
                    "unrouted",
                    "{:?} {}",
                    event.kind,
                    event.path().display()
                );
                continue;
            };
            if seen.insert(handle) {
                touched.push(handle);
            }

            let config = match self.registry.lookup(handle) {
                Ok(config) => Arc::clone(config),
                Err(e) => {
                    tracing::error!("[watcher] skipping {}: {e}", event.path().display());
                    continue;
                }
            };

            self.forward(handle, &event, &config);

            match event.kind {
                ChangeKind::Created => self.register_new_directory(&event, &config),
                ChangeKind::Deleted => {
                    let path = event.path();
                    if self.registry.contains_directory(&path) {
                        self.registry.drop_subtree(&path);
                    }
                }
                ChangeKind::Modified => {}
            }
        }

        for handle in touched {
            // Dropping an invalid handle is logged by the registry
            self.registry.rearm(handle);
        }
    }

    fn forward(&mut self, handle: WatchHandle, event: &ChangeEvent, config: &WatchConfig) {
        crate::debug_event!(
            self.handler.name(),
            "event",
            "{:?} {} {handle}",
            event.kind,
            event.path().display()
        );

        if let Err(e) = self.handler.handle(handle, event, config) {
            tracing::error!("[{}] handler error: {e}", self.handler.name());
        }
    }

    fn register_new_directory(&mut self, event: &ChangeEvent, config: &Arc<WatchConfig>) {
        let path = event.path();
        // Symlinked directories are mirrored as links, never watched
        let is_dir = std::fs::symlink_metadata(&path)
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return;
        }

        let extension = match self.registry.extend(&path, config) {
            Ok(extension) => extension,
            Err(e) => {
                tracing::error!("[watcher] cannot register new directory {}: {e}", path.display());
                return;
            }
        };

        crate::log_event!(
            "watcher",
            "registered new directory",
            "{} ({} watches)",
            path.display(),
            extension.handles.len()
        );

        if !self.options.sync_new_directories {
            return;
        }

        // Entries created before the watches existed produced no events
        for entry in extension.existing {
            let Some(created) = ChangeEvent::for_path(ChangeKind::Created, &entry) else {
                continue;
            };
            let Some(handle) = self.registry.resolve(&created.watched_directory) else {
                continue;
            };
            let owner = match self.registry.lookup(handle) {
                Ok(owner) => Arc::clone(owner),
                Err(_) => continue,
            };
            self.forward(handle, &created, &owner);
        }
    }
}

fn collect(result: notify::Result<Event>, batch: &mut Vec<ChangeEvent>) {
    match result {
        Ok(event) => batch.extend(ChangeEvent::from_notify(&event)),
        Err(e) => tracing::error!("[watcher] file watch error: {e}"),
    }
}

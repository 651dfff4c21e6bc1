//! Process-level controls for the watch loop.
//!
//! [`WatchCopy`] installs every watch up front (so configuration and I/O
//! problems surface before anything runs) and then hands the registry to a
//! single dedicated worker thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, unbounded};

use super::backend::NotifyBackend;
use super::dispatcher::{Dispatcher, DispatcherOptions, LoopState, SharedState};
use super::error::WatchError;
use super::handler::ChangeHandler;
use super::handlers::CopyHandler;
use super::registry::WatchRegistry;
use crate::types::WatchConfig;

/// Flags shared by the controller, stop handles and the worker.
struct Control {
    started: AtomicBool,
    running: AtomicBool,
    stop: AtomicBool,
    wake: Sender<()>,
}

/// Clears `running` when the worker exits, including by panic.
struct RunningGuard(Arc<Control>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
    }
}

/// Cloneable handle that can stop the loop from any thread.
#[derive(Clone)]
pub struct StopHandle {
    control: Arc<Control>,
}

impl StopHandle {
    /// Request termination after the current iteration.
    ///
    /// Does nothing before the loop was started, and nothing the second time.
    pub fn stop(&self) {
        if !self.control.started.load(Ordering::SeqCst) {
            crate::debug_event!("watcher", "stop ignored", "not started");
            return;
        }
        if !self.control.stop.swap(true, Ordering::SeqCst) {
            crate::log_event!("watcher", "stop requested");
        }
        // Full means a wake is already pending
        let _ = self.control.wake.try_send(());
    }

    /// True while the worker is running.
    pub fn is_active(&self) -> bool {
        self.control.running.load(Ordering::SeqCst)
    }
}

/// Recursive directory watcher that mirrors changes via a [`ChangeHandler`].
pub struct WatchCopy {
    configs: Vec<Arc<WatchConfig>>,
    dispatcher: Option<Dispatcher>,
    worker: Option<JoinHandle<()>>,
    control: Arc<Control>,
    state: SharedState,
    watched: usize,
}

impl WatchCopy {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> WatchCopyBuilder {
        WatchCopyBuilder::new()
    }

    /// Resolved configs, in the order given.
    pub fn configs(&self) -> &[Arc<WatchConfig>] {
        &self.configs
    }

    /// Number of directories watched after the initial walk.
    pub fn initially_watched(&self) -> usize {
        self.watched
    }

    /// Start the loop on a dedicated worker thread.
    ///
    /// With `run_in_background` the call returns immediately; otherwise it
    /// blocks until the loop ends (stop it through a [`StopHandle`]).
    pub fn start(&mut self, run_in_background: bool) -> Result<(), WatchError> {
        let dispatcher = self.dispatcher.take().ok_or(WatchError::AlreadyStarted)?;

        self.control.started.store(true, Ordering::SeqCst);
        self.control.running.store(true, Ordering::SeqCst);

        let control = Arc::clone(&self.control);
        let spawned = thread::Builder::new()
            .name("watchcopy".to_string())
            .spawn(move || {
                let _guard = RunningGuard(Arc::clone(&control));
                dispatcher.run(&control.stop);
            });

        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                self.control.running.store(false, Ordering::SeqCst);
                return Err(WatchError::SpawnFailed(e));
            }
        };

        if run_in_background {
            self.worker = Some(worker);
            Ok(())
        } else {
            worker.join().map_err(|_| WatchError::WorkerPanicked)
        }
    }

    /// Request termination after the current iteration. Idempotent.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// True iff the loop was started and the worker has not finished.
    pub fn is_active(&self) -> bool {
        self.control.running.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            control: Arc::clone(&self.control),
        }
    }

    /// Current loop phase.
    pub fn state(&self) -> LoopState {
        self.state.get()
    }

    /// Wait for a background worker to finish.
    pub fn join(&mut self) -> Result<(), WatchError> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| WatchError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

/// Builder for constructing a [`WatchCopy`].
pub struct WatchCopyBuilder {
    configs: Vec<WatchConfig>,
    handler: Option<Box<dyn ChangeHandler>>,
    options: DispatcherOptions,
}

impl WatchCopyBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            configs: Vec::new(),
            handler: None,
            options: DispatcherOptions::default(),
        }
    }

    /// Add one source/destination pair.
    pub fn config(mut self, config: WatchConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Add several source/destination pairs.
    pub fn configs(mut self, configs: impl IntoIterator<Item = WatchConfig>) -> Self {
        self.configs.extend(configs);
        self
    }

    /// Set the change handler. Defaults to [`CopyHandler`].
    pub fn handler(mut self, handler: impl ChangeHandler) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Bound on a single wait for notifications.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.options.poll_timeout = timeout;
        self
    }

    /// Whether entries already inside a newly created directory are
    /// forwarded as Created events.
    pub fn sync_new_directories(mut self, enabled: bool) -> Self {
        self.options.sync_new_directories = enabled;
        self
    }

    /// Resolve every config and watch every source tree.
    pub fn build(self) -> Result<WatchCopy, WatchError> {
        if self.configs.is_empty() {
            return Err(WatchError::NoConfigs);
        }

        let listing = self
            .configs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        crate::log_event!("watcher", "start", "configs {listing}");

        let (events_tx, events_rx) = unbounded();
        let backend = NotifyBackend::new(events_tx)?;
        let mut registry = WatchRegistry::new(backend);

        let mut configs = Vec::with_capacity(self.configs.len());
        let mut watched = 0;
        for config in &self.configs {
            let resolved = config
                .resolve()
                .map_err(|source| WatchError::SourceUnreadable {
                    path: config.source.clone(),
                    source,
                })?;
            let resolved = Arc::new(resolved);
            watched += registry.register_tree(&resolved)?;
            configs.push(resolved);
        }

        let (wake_tx, wake_rx) = bounded(1);
        let handler = self
            .handler
            .unwrap_or_else(|| Box::new(CopyHandler::new()));
        let dispatcher = Dispatcher::new(registry, events_rx, wake_rx, handler, self.options);
        let state = dispatcher.state();

        Ok(WatchCopy {
            configs,
            dispatcher: Some(dispatcher),
            worker: None,
            control: Arc::new(Control {
                started: AtomicBool::new(false),
                running: AtomicBool::new(false),
                stop: AtomicBool::new(false),
                wake: wake_tx,
            }),
            state,
            watched,
        })
    }
}

impl Default for WatchCopyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

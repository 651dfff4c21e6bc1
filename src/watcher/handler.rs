//! Handler trait for routed change events.

use super::WatchError;
use super::event::ChangeEvent;
use crate::types::{WatchConfig, WatchHandle};

/// Receives every change event together with the config that owns it.
///
/// Called on the watch worker thread; a slow handler delays the next
/// iteration of the loop.
pub trait ChangeHandler: Send + 'static {
    /// Handler name for logging.
    fn name(&self) -> &str;

    /// Apply one change. Errors are logged by the loop and never stop it.
    fn handle(
        &mut self,
        handle: WatchHandle,
        event: &ChangeEvent,
        config: &WatchConfig,
    ) -> Result<(), WatchError>;
}

//! Recursive directory watcher that mirrors changes into destination trees.
//!
//! # Architecture
//!
//! ```text
//! WatchCopy (controls: start / stop / is_active)
//!   - one dedicated worker thread
//!         |
//!     Dispatcher (wait -> dispatch -> extend)
//!         |                      |
//!   WatchRegistry            ChangeHandler
//!   (handle -> config,       (CopyHandler by default)
//!    NotifyBackend)
//! ```
//!
//! Each directory gets its own non-recursive watch. New directories are
//! registered by the loop itself as their creation events arrive.
//!
//! Some OS backends coalesce or drop events under heavy load. The loop has
//! no way to notice that, so a burst of changes may leave the mirror stale
//! until the affected files change again.

mod backend;
mod dispatcher;
mod error;
mod event;
mod handler;
pub mod handlers;
mod registry;
mod watch_copy;

pub use backend::{NotifyBackend, WatchBackend};
pub use dispatcher::{
    DEFAULT_POLL_TIMEOUT, Dispatcher, DispatcherOptions, Iteration, LoopState, SharedState,
};
pub use error::WatchError;
pub use event::{ChangeEvent, ChangeKind};
pub use handler::ChangeHandler;
pub use handlers::CopyHandler;
pub use registry::{Extension, WatchRegistry};
pub use watch_copy::{StopHandle, WatchCopy, WatchCopyBuilder};

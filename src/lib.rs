pub mod cli;
pub mod config;
pub mod logging;
pub mod mapping;
pub mod types;
pub mod watcher;

pub use config::Settings;
pub use mapping::{MappingError, Properties, configs_from_properties};
pub use types::{WatchConfig, WatchHandle};
pub use watcher::{ChangeEvent, ChangeHandler, ChangeKind, CopyHandler, WatchCopy, WatchError};

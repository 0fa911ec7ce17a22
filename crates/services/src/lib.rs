#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod offline;
pub mod refresh;

pub use progress_core::Clock;

pub use api::{HttpProgressApi, ProgressApi};
pub use config::{ApiConfig, SyncConfig};
pub use error::{ApiError, ConfigError};
pub use events::{CompletionTracker, EventPoster};
pub use lifecycle::AppLifecycle;
pub use offline::{OfflineState, ProgressStateStore};
pub use refresh::{
    DashboardState, DashboardStatus, DebouncedTask, Identity, RefreshCoordinator,
};

//! Server-backed dashboard state: single-flight fetches, cache hydration and
//! debounced refreshes.

mod coordinator;
mod debounce;
mod state;

pub use coordinator::RefreshCoordinator;
pub use debounce::{DebouncedTask, TaskFuture};
pub use state::{DashboardState, DashboardStatus, Identity};

// Infrastructure module - Background services and utilities
pub mod heartbeat;
pub mod task_manager;
pub mod timer;

pub use heartbeat::{HeartbeatManager, HeartbeatStatus, PendingHeartbeat};
pub use task_manager::TaskManager;
pub use timer::{ReconnectConfig, ReconnectPolicy};

use super::connection::ConnectionManager;
use super::machine::{ConnectionState, SessionMachine};
use crate::infrastructure::{PendingHeartbeat, ReconnectConfig, TaskManager};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Consolidated mutable state for RealtimeSession.
///
/// Guarded by a single mutex that is never held across an await point, so
/// transitions and the actions they produce run without interleaving.
pub struct ClientState {
    /// Lifecycle, rooms and backoff
    pub machine: SessionMachine,

    /// Outbound writer for the live connection
    pub connection: ConnectionManager,

    /// Unanswered heartbeat, if any
    pub heartbeat: PendingHeartbeat,

    /// Reader, writer and heartbeat tasks of the current attempt
    pub task_manager: TaskManager,

    /// The single pending reconnect timer
    pub reconnect_timer: Option<JoinHandle<()>>,

    /// Sender for state change notifications
    pub state_change_tx: watch::Sender<ConnectionState>,
}

impl ClientState {
    pub fn new(reconnect: ReconnectConfig) -> Self {
        let (state_change_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            machine: SessionMachine::new(reconnect),
            connection: ConnectionManager::new(),
            heartbeat: PendingHeartbeat::default(),
            task_manager: TaskManager::new(),
            reconnect_timer: None,
            state_change_tx,
        }
    }

    /// Stops everything tied to the current transport
    pub fn teardown_connection(&mut self) {
        self.task_manager.abort_all();
        self.connection.clear_writer();
        self.heartbeat.clear();
    }

    pub fn cancel_reconnect_timer(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
    }

    /// Notify state change watchers if the machine moved
    pub fn notify_state_change(&self) {
        let current = self.machine.state();
        self.state_change_tx.send_if_modified(|state| {
            if *state == current {
                return false;
            }
            tracing::debug!("Connection state {} -> {}", state, current);
            *state = current;
            true
        });
    }
}

impl Drop for ClientState {
    fn drop(&mut self) {
        self.cancel_reconnect_timer();
    }
}

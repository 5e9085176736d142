//! Process-wide sync state.

/// Step the sync pipeline is currently executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Launching,
    CheckingAccess,
    Fetching,
    Reconciling,
}

/// At most one sync runs at a time; `Idle` is both initial and terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    Running(SyncPhase),
}

impl SyncState {
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running(_))
    }
}

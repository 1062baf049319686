#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Program is already running!")]
    AlreadyRunning,

    #[error("Failed to create single-instance lock: {reason}")]
    InstanceLock { reason: String },

    #[error("Failed to subscribe to process start events: {reason}")]
    Subscription { reason: String },

    #[error("Failed to install termination handler: {reason}")]
    SignalHandler { reason: String },

    #[error("This tool only runs on Windows")]
    Unsupported,
}

impl StartupError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DesktopError {
    #[error("Thread snapshot unavailable (os error {code})")]
    SnapshotUnavailable { code: u32 },
}

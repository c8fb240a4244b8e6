use std::time::Duration;

use entityipc_frame::FrameConfig;

/// Default number of id draws before a call gives up on finding a free id.
pub const DEFAULT_MAX_ID_ATTEMPTS: usize = 64;

/// Per-connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Framing limits and socket timeouts.
    pub frame: FrameConfig,
    /// Deadline applied by `Connection::call`. `None` waits until the reply
    /// arrives or the connection terminates.
    pub call_timeout: Option<Duration>,
    /// Id draws per call before failing with `IdExhausted`.
    pub max_id_attempts: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            call_timeout: None,
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        }
    }
}

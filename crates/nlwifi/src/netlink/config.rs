//! Manager timing configuration.

use std::time::Duration;

/// Timeouts and retry limits for a [`Manager`](super::Manager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// How long a response handler stays registered without a reply.
    pub response_timeout: Duration,
    /// How long [`get_family`](super::Manager::get_family) waits for the
    /// control family to answer.
    pub family_wait: Duration,
    /// How long the dump in flight may go without completing.
    pub dump_timeout: Duration,
    /// Delay before a dump rejected with EBUSY is resent.
    pub dump_retry_delay: Duration,
    /// Resends allowed per dump.
    pub max_dump_retries: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(5),
            family_wait: Duration::from_secs(1),
            dump_timeout: Duration::from_millis(500),
            dump_retry_delay: Duration::from_millis(300),
            max_dump_retries: 1,
        }
    }
}

impl ManagerConfig {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_family_wait(mut self, wait: Duration) -> Self {
        self.family_wait = wait;
        self
    }

    pub fn with_dump_timeout(mut self, timeout: Duration) -> Self {
        self.dump_timeout = timeout;
        self
    }

    pub fn with_dump_retry_delay(mut self, delay: Duration) -> Self {
        self.dump_retry_delay = delay;
        self
    }

    pub fn with_max_dump_retries(mut self, retries: u32) -> Self {
        self.max_dump_retries = retries;
        self
    }
}

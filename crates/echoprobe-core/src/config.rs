use crate::types::{PayloadPattern, PayloadSize};
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default value for `count`.
    pub const DEFAULT_PROBE_COUNT: usize = 5;

    /// The default value for `interval`.
    pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(1000);

    /// The default value for `probe-timeout`.
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

    /// The default value for `payload-size`.
    pub const DEFAULT_PAYLOAD_SIZE: u16 = 56;

    /// The default value for `payload-pattern`.
    pub const DEFAULT_PAYLOAD_PATTERN: u8 = 0;

    /// The default value for `read-timeout`.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);
}

/// Configuration for one bounded probing run.
///
/// Immutable for the duration of the run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RunConfig {
    /// The number of probes to send.
    pub count: usize,
    /// The pause between consecutive probe sends.
    pub interval: Duration,
    /// How long a single probe may remain unanswered before it is failed.
    pub probe_timeout: Duration,
    /// The number of ICMP payload bytes per probe.
    pub payload_size: PayloadSize,
    /// The byte the payload is filled with.
    pub payload_pattern: PayloadPattern,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            count: defaults::DEFAULT_PROBE_COUNT,
            interval: defaults::DEFAULT_PROBE_INTERVAL,
            probe_timeout: defaults::DEFAULT_PROBE_TIMEOUT,
            payload_size: PayloadSize(defaults::DEFAULT_PAYLOAD_SIZE),
            payload_pattern: PayloadPattern(defaults::DEFAULT_PAYLOAD_PATTERN),
        }
    }
}

/// Configuration for a probe session and its channel.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SessionConfig {
    /// The number of ICMP payload bytes per probe.
    pub payload_size: PayloadSize,
    /// The byte the payload is filled with.
    pub payload_pattern: PayloadPattern,
    /// The socket readiness poll timeout used by the receive loop.
    pub read_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            payload_size: PayloadSize(defaults::DEFAULT_PAYLOAD_SIZE),
            payload_pattern: PayloadPattern(defaults::DEFAULT_PAYLOAD_PATTERN),
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
        }
    }
}

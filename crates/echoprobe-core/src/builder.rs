use crate::config::{defaults, RunConfig};
use crate::constants::{MAX_PAYLOAD_SIZE, MAX_PROBE_COUNT};
use crate::error::{Error, Result};
use crate::types::{PayloadPattern, PayloadSize};
use crate::Pinger;
use std::time::Duration;

/// Build a pinger.
///
/// The target may be a host name or an IPv4/IPv6 address literal; resolution
/// happens when the run starts, not here.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use echoprobe_core::Builder;
/// use std::time::Duration;
///
/// let pinger = Builder::new("one.one.one.one")
///     .count(3)
///     .interval(Duration::from_millis(500))
///     .probe_timeout(Duration::from_secs(2))
///     .build()?;
/// let report = pinger.run_with(|result| println!("{result:?}"));
/// println!("loss: {:.1}%", report.statistics().loss_pct());
/// # Ok(())
/// # }
/// ```
///
/// # See Also
///
/// - [`Pinger`] - a bounded ICMP echo probing run.
#[derive(Debug, Clone)]
pub struct Builder {
    target: String,
    count: usize,
    interval: Duration,
    probe_timeout: Duration,
    payload_size: PayloadSize,
    payload_pattern: PayloadPattern,
    read_timeout: Duration,
}

impl Builder {
    /// Create a builder for a given target.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            count: defaults::DEFAULT_PROBE_COUNT,
            interval: defaults::DEFAULT_PROBE_INTERVAL,
            probe_timeout: defaults::DEFAULT_PROBE_TIMEOUT,
            payload_size: PayloadSize(defaults::DEFAULT_PAYLOAD_SIZE),
            payload_pattern: PayloadPattern(defaults::DEFAULT_PAYLOAD_PATTERN),
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set the number of probes to send.
    ///
    /// A count of zero is legal and completes immediately with no results.
    #[must_use]
    pub const fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the pause between consecutive probe sends.
    ///
    /// Probes are pipelined: the next send never waits for the previous
    /// reply.
    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set how long a probe may remain unanswered before it is failed.
    #[must_use]
    pub const fn probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Set the number of ICMP payload bytes per probe.
    #[must_use]
    pub const fn payload_size(mut self, payload_size: u16) -> Self {
        self.payload_size = PayloadSize(payload_size);
        self
    }

    /// Set the byte the payload is filled with.
    #[must_use]
    pub const fn payload_pattern(mut self, payload_pattern: u8) -> Self {
        self.payload_pattern = PayloadPattern(payload_pattern);
        self
    }

    /// Set the socket readiness poll timeout used by the receive loop.
    #[must_use]
    pub const fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Validate the configuration and build a [`Pinger`].
    pub fn build(self) -> Result<Pinger> {
        if self.interval.is_zero() {
            return Err(Error::BadConfig(String::from("interval must be non-zero")));
        }
        if self.probe_timeout.is_zero() {
            return Err(Error::BadConfig(String::from(
                "probe timeout must be non-zero",
            )));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::BadConfig(String::from(
                "read timeout must be non-zero",
            )));
        }
        if self.count > MAX_PROBE_COUNT {
            return Err(Error::BadConfig(format!(
                "count must not exceed {MAX_PROBE_COUNT}"
            )));
        }
        if usize::from(self.payload_size.0) > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidPayloadSize(usize::from(self.payload_size.0)));
        }
        let config = RunConfig {
            count: self.count,
            interval: self.interval,
            probe_timeout: self.probe_timeout,
            payload_size: self.payload_size,
            payload_pattern: self.payload_pattern,
        };
        Ok(Pinger::new(self.target, config, self.read_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_build() {
        let pinger = Builder::new("192.0.2.1").build().unwrap();
        assert_eq!("192.0.2.1", pinger.target());
        assert_eq!(defaults::DEFAULT_PROBE_COUNT, pinger.config().count);
        assert_eq!(defaults::DEFAULT_PROBE_INTERVAL, pinger.config().interval);
        assert_eq!(
            defaults::DEFAULT_PROBE_TIMEOUT,
            pinger.config().probe_timeout
        );
        assert_eq!(
            PayloadSize(defaults::DEFAULT_PAYLOAD_SIZE),
            pinger.config().payload_size
        );
    }

    #[test]
    fn test_custom_build() {
        let pinger = Builder::new("example.com")
            .count(10)
            .interval(Duration::from_millis(200))
            .probe_timeout(Duration::from_secs(1))
            .payload_size(64)
            .payload_pattern(0xab)
            .build()
            .unwrap();
        let config = pinger.config();
        assert_eq!(10, config.count);
        assert_eq!(Duration::from_millis(200), config.interval);
        assert_eq!(Duration::from_secs(1), config.probe_timeout);
        assert_eq!(PayloadSize(64), config.payload_size);
        assert_eq!(PayloadPattern(0xab), config.payload_pattern);
    }

    #[test_case(Builder::new("h").interval(Duration::ZERO); "zero interval")]
    #[test_case(Builder::new("h").probe_timeout(Duration::ZERO); "zero probe timeout")]
    #[test_case(Builder::new("h").read_timeout(Duration::ZERO); "zero read timeout")]
    #[test_case(Builder::new("h").count(MAX_PROBE_COUNT + 1); "count too large")]
    fn test_bad_config(builder: Builder) {
        let err = builder.build().unwrap_err();
        assert!(matches!(err, Error::BadConfig(_)));
    }

    #[test]
    fn test_payload_too_large() {
        let err = Builder::new("h").payload_size(u16::MAX).build().unwrap_err();
        assert!(matches!(err, Error::InvalidPayloadSize(_)));
    }
}

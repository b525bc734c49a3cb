//! Echoprobe - an ICMP echo probing library.
//!
//! This crate is the engine behind the `echoprobe` utility. It implements
//! ICMP Echo Request/Reply directly over a raw or datagram ICMP socket:
//! wire-correct packets, asynchronous receive, reply correlation, round-trip
//! measurement, and per-probe results with timeout and cancellation
//! semantics. ICMP echo is inherently best-effort; a lost probe is a normal
//! outcome, reported as data rather than as an error.
//!
//! # Example
//!
//! The following example probes a target five times with default
//! configuration and prints each result as it arrives:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use echoprobe_core::Builder;
//!
//! let report = Builder::new("one.one.one.one")
//!     .build()?
//!     .run_with(|result| println!("{result:?}"));
//! let stats = report.statistics();
//! println!(
//!     "{} sent, {} received, {:.1}% loss",
//!     stats.sent(),
//!     stats.received(),
//!     stats.loss_pct()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! The same run can execute on a background thread, returning a handle the
//! caller may cancel at any point:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use echoprobe_core::Builder;
//!
//! let handle = Builder::new("one.one.one.one")
//!     .count(100)
//!     .build()?
//!     .spawn_with(|result| println!("{result:?}"))?;
//! handle.cancel();
//! let _report = handle.wait()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Privileges
//!
//! Opening the ICMP socket typically requires elevated privilege or an
//! OS-granted capability (e.g. `CAP_NET_RAW`, or a `ping_group_range`
//! covering the process on Linux). When no socket can be acquired the run
//! fails immediately with a single failed result; there is no silent
//! fallback to another transport.
//!
//! # See Also
//!
//! - [`Builder`] - build a [`Pinger`].
//! - [`Pinger::run_with`] - run on the current thread with a result handler.
//! - [`Pinger::spawn_with`] - run on a background thread.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::use_self,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![deny(unsafe_code)]

mod builder;
mod config;
mod constants;
mod dns;
mod error;
mod event;
mod net;
mod pinger;
mod probe;
mod session;
mod stats;
mod types;

pub use builder::Builder;
pub use config::{defaults, RunConfig, SessionConfig};
pub use constants::{MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, MAX_PROBE_COUNT};
pub use error::{Error, IoError, IoOperation, Result};
pub use event::{EventHandler, SessionEvent};
pub use pinger::{Canceller, Pinger, RunHandle, RunReport};
pub use probe::{ProbeResult, ProbeState};
pub use session::{ProbeSession, SessionState};
pub use stats::RunStatistics;
pub use types::{PayloadPattern, PayloadSize, Sequence, SessionId};

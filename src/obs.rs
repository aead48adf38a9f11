//! Optional observability helpers for stateful decorators.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `http_decorators.gate` with the `gate`
//!   (decorator) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `http_decorators_gate_total` counter for every
//!   attempt/success/failure/cancellation, labeled by `gate` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Stateful decorators observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateKind {
	/// Client-side rate limiter admissions.
	RateLimit,
	/// Single-flight initializer attempts.
	SingleFlight,
	/// Auth token acquisitions.
	AuthToken,
}
impl GateKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GateKind::RateLimit => "rate_limit",
			GateKind::SingleFlight => "single_flight",
			GateKind::AuthToken => "auth_token",
		}
	}
}
impl Display for GateKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each gate interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateOutcome {
	/// A caller reached the gate.
	Attempt,
	/// The gate let the caller through.
	Success,
	/// The guarded operation failed.
	Failure,
	/// The caller's signal fired while it waited.
	Canceled,
}
impl GateOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GateOutcome::Attempt => "attempt",
			GateOutcome::Success => "success",
			GateOutcome::Failure => "failure",
			GateOutcome::Canceled => "canceled",
		}
	}

	/// Classifies a gate result.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => GateOutcome::Success,
			Err(e) if e.is_cancellation() => GateOutcome::Canceled,
			Err(_) => GateOutcome::Failure,
		}
	}
}
impl Display for GateOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

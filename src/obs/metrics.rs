// self
use crate::obs::{GateKind, GateOutcome};

/// Counter incremented once per gate interaction.
pub const GATE_COUNTER: &str = "http_decorators_gate_total";

/// Records a gate outcome via the global metrics recorder (when enabled).
pub fn record_gate_outcome(kind: GateKind, outcome: GateOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(GATE_COUNTER, "gate" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

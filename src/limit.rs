//! Client-side rate limiting shared by every caller of a decorated client.
//!
//! [`RateGate`] admits at most `capacity` requests per fixed window. Windows are aligned to
//! the instant the gate was built and roll forward lazily: the first caller that observes an
//! elapsed window resets the admission count, so no timer task exists and dropping the last
//! handle to the decorated client releases everything.
//!
//! Callers that find the window exhausted sleep until the next boundary and try again,
//! racing their request's [`Signal`]. A caller whose signal fires first leaves without
//! touching the admission count. Wake-ups are not FIFO; whichever waiter re-checks first
//! after a boundary wins the freed slots.

// self
use crate::{
	_prelude::*,
	client::{self, Client, ClientFuture, SharedClient},
	error::ConfigError,
	http::{Request, Signal},
	obs::{self, GateKind, GateOutcome, GateSpan},
};

/// Wraps `client` so it issues at most `max_requests` requests per `window`.
///
/// A `None` client is replaced by the default transport. Zero capacity or a zero window is
/// rejected because no caller could ever be admitted.
pub fn set_rate_limit(
	client: impl Into<Option<SharedClient>>,
	max_requests: u32,
	window: Duration,
) -> Result<SharedClient> {
	Ok(Arc::new(RateLimit::new(client, max_requests, window)?))
}

/// Decorator that gates every request through a shared [`RateGate`].
#[derive(Clone)]
pub struct RateLimit {
	inner: SharedClient,
	gate: Arc<RateGate>,
}
impl RateLimit {
	/// Builds the decorator; see [`set_rate_limit`].
	pub fn new(
		client: impl Into<Option<SharedClient>>,
		max_requests: u32,
		window: Duration,
	) -> Result<Self> {
		let gate = RateGate::new(max_requests, window)?;

		Ok(Self { inner: client::or_default(client), gate: Arc::new(gate) })
	}

	/// Returns the gate shared by every clone of this decorator.
	pub fn gate(&self) -> &Arc<RateGate> {
		&self.gate
	}
}
impl Client for RateLimit {
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let request = request.ok_or_else(Error::missing_request)?;

			self.gate.acquire(request.signal()).await?;
			self.inner.send(Some(request)).await
		})
	}
}
impl Debug for RateLimit {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimit").field("gate", &self.gate).finish()
	}
}

/// Fixed-window admission gate.
pub struct RateGate {
	capacity: u32,
	window: Duration,
	state: Mutex<WindowState>,
}
impl RateGate {
	/// Creates a gate admitting `capacity` requests per `window`, starting now.
	pub fn new(capacity: u32, window: Duration) -> Result<Self, ConfigError> {
		if capacity == 0 {
			return Err(ConfigError::ZeroRateLimitCapacity);
		}
		if window.is_zero() {
			return Err(ConfigError::ZeroRateLimitWindow);
		}

		Ok(Self {
			capacity,
			window,
			state: Mutex::new(WindowState { started_at: Instant::now(), admitted: 0 }),
		})
	}

	/// Maximum admissions per window.
	pub fn capacity(&self) -> u32 {
		self.capacity
	}

	/// Window length.
	pub fn window(&self) -> Duration {
		self.window
	}

	/// Admissions still available in the current window.
	pub fn remaining(&self) -> u32 {
		let mut state = self.state.lock();

		state.roll(Instant::now(), self.window);

		self.capacity - state.admitted
	}

	/// Waits for an admission slot or until `signal` fires.
	///
	/// A fired signal is reported before any slot is taken, even if capacity is available.
	pub async fn acquire(&self, signal: &Signal) -> Result<()> {
		const KIND: GateKind = GateKind::RateLimit;

		obs::record_gate_outcome(KIND, GateOutcome::Attempt);

		let result = GateSpan::new(KIND, "acquire").instrument(self.wait_for_slot(signal)).await;

		obs::record_gate_outcome(KIND, GateOutcome::of(&result));

		result
	}

	async fn wait_for_slot(&self, signal: &Signal) -> Result<()> {
		loop {
			signal.check()?;

			let next_window = match self.try_acquire(Instant::now()) {
				Ok(()) => return Ok(()),
				Err(next_window) => next_window,
			};

			// A window too long to end before the clock overflows never refills.
			let Some(next_window) = next_window else {
				return Err(signal.cancelled().await);
			};

			tokio::select! {
				biased;
				err = signal.cancelled() => return Err(err),
				_ = tokio::time::sleep_until(next_window) => {},
			}
		}
	}

	/// Takes a slot if one is free; otherwise returns when the current window ends.
	fn try_acquire(&self, now: Instant) -> Result<(), Option<Instant>> {
		let mut state = self.state.lock();

		state.roll(now, self.window);

		if state.admitted < self.capacity {
			state.admitted += 1;

			Ok(())
		} else {
			Err(state.started_at.checked_add(self.window))
		}
	}
}
impl Debug for RateGate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateGate")
			.field("capacity", &self.capacity)
			.field("window", &self.window)
			.finish()
	}
}

#[derive(Debug)]
struct WindowState {
	started_at: Instant,
	admitted: u32,
}
impl WindowState {
	/// Advances to the window containing `now`, clearing admissions if it moved.
	fn roll(&mut self, now: Instant, window: Duration) {
		let elapsed = now.saturating_duration_since(self.started_at);

		if elapsed < window {
			return;
		}

		let into_current = elapsed.as_nanos() % window.as_nanos();

		self.started_at = now - Duration::from_nanos(u64::try_from(into_current).unwrap_or(0));
		self.admitted = 0;
	}
}

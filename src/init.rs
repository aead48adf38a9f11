//! Single-flight initialization shared by concurrent callers.
//!
//! [`SingleFlight`] is an explicit state machine:
//!
//! - `Empty` / `Failed`: the next caller becomes the executor and moves the gate to
//!   `InProgress`.
//! - `InProgress`: later callers subscribe to the running attempt and wait for its outcome.
//! - `Ready`: the cached value is returned immediately, forever.
//!
//! A failed attempt is delivered to the executor and to every caller that was waiting on it,
//! then the gate reopens so the next caller runs a fresh attempt. Waiting callers race their
//! request's [`Signal`]; a canceled waiter leaves the gate untouched. An executor that is
//! canceled, or whose future is dropped, abandons its attempt: the gate returns to its
//! previous state and any waiters re-enter the state machine.

// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	client::{self, Client, ClientFuture, SharedClient},
	http::{Request, Signal},
	obs::{self, GateKind, GateOutcome, GateSpan},
};

type Outcome<T> = std::result::Result<T, Arc<Error>>;

/// Boxed future returned by [`Initializer::initialize`].
pub type InitFuture = Pin<Box<dyn Future<Output = Result<SharedClient>> + Send>>;

/// Setup step run once before requests flow through an [`Initialized`] client.
///
/// Receives the wrapped client and returns the client requests should use from then on,
/// typically the wrapped client with further decorators applied.
pub trait Initializer
where
	Self: Send + Sync,
{
	/// Runs the setup step.
	fn initialize(&self, client: SharedClient) -> InitFuture;
}
impl<F, Fut> Initializer for F
where
	F: Send + Sync + Fn(SharedClient) -> Fut,
	Fut: 'static + Send + Future<Output = Result<SharedClient>>,
{
	fn initialize(&self, client: SharedClient) -> InitFuture {
		Box::pin(self(client))
	}
}

/// Wraps `client` so `init` runs once, on first use, before any request is sent.
///
/// A failed `init` is retried by the next caller; once it succeeds its client is reused for
/// the lifetime of the returned value.
pub fn set_initializer(
	client: impl Into<Option<SharedClient>>,
	init: impl 'static + Initializer,
) -> SharedClient {
	Arc::new(Initialized::new(client, init))
}

/// Decorator that routes requests through the client produced by an [`Initializer`].
pub struct Initialized {
	inner: SharedClient,
	init: Box<dyn Initializer>,
	gate: SingleFlight<SharedClient>,
}
impl Initialized {
	/// Builds the decorator; see [`set_initializer`].
	pub fn new(client: impl Into<Option<SharedClient>>, init: impl 'static + Initializer) -> Self {
		Self {
			inner: client::or_default(client),
			init: Box::new(init),
			gate: SingleFlight::new(GateKind::SingleFlight),
		}
	}

	/// Current phase of the initialization gate.
	pub fn phase(&self) -> FlightPhase {
		self.gate.phase()
	}
}
impl Client for Initialized {
	fn send(&self, request: Option<Request>) -> ClientFuture<'_> {
		Box::pin(async move {
			let request = request.ok_or_else(Error::missing_request)?;
			let ready = self
				.gate
				.get_or_try_init(request.signal(), || self.init.initialize(self.inner.clone()))
				.await?;

			ready.send(Some(request)).await
		})
	}
}
impl Debug for Initialized {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Initialized").field("phase", &self.phase()).finish()
	}
}

/// Observable phase of a [`SingleFlight`] gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightPhase {
	/// No attempt has run yet.
	Empty,
	/// An attempt is running.
	InProgress,
	/// An attempt succeeded; its value is cached.
	Ready,
	/// The last attempt failed; the next caller retries.
	Failed,
}

/// Gate that runs a fallible initialization at most once at a time and caches success.
pub struct SingleFlight<T> {
	kind: GateKind,
	state: Mutex<FlightState<T>>,
}
impl<T> SingleFlight<T>
where
	T: Clone,
{
	/// Creates an empty gate; `kind` labels its spans and metrics.
	pub fn new(kind: GateKind) -> Self {
		Self { kind, state: Mutex::new(FlightState::Empty) }
	}

	/// Current phase of the gate.
	pub fn phase(&self) -> FlightPhase {
		match &*self.state.lock() {
			FlightState::Empty => FlightPhase::Empty,
			FlightState::InProgress(_) => FlightPhase::InProgress,
			FlightState::Ready(_) => FlightPhase::Ready,
			FlightState::Failed(_) => FlightPhase::Failed,
		}
	}

	/// Returns the cached value, if an attempt already succeeded.
	pub fn get(&self) -> Option<T> {
		match &*self.state.lock() {
			FlightState::Ready(value) => Some(value.clone()),
			_ => None,
		}
	}

	/// Returns the error of the last attempt while the gate is in the failed phase.
	pub fn last_error(&self) -> Option<Arc<Error>> {
		match &*self.state.lock() {
			FlightState::Failed(e) => Some(e.clone()),
			_ => None,
		}
	}

	/// Returns the cached value, running `init` if no attempt has succeeded yet.
	///
	/// Exactly one caller runs `init` per attempt; the rest wait for that attempt and share
	/// its outcome. Failures surface as [`Error::InitializationFailed`].
	pub async fn get_or_try_init<F, Fut>(&self, signal: &Signal, init: F) -> Result<T>
	where
		F: Fn() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		loop {
			signal.check()?;

			let role = {
				let mut state = self.state.lock();
				let running = match &*state {
					FlightState::Ready(value) => return Ok(value.clone()),
					FlightState::InProgress(attempt) => Some(attempt.clone()),
					FlightState::Empty | FlightState::Failed(_) => None,
				};

				match running {
					Some(attempt) => Role::Waiter(attempt),
					None => {
						let (tx, rx) = watch::channel(None);
						let previous = std::mem::replace(&mut *state, FlightState::InProgress(rx));

						Role::Executor(Attempt {
							gate: self,
							tx: Some(tx),
							previous: Some(previous),
						})
					},
				}
			};

			match role {
				Role::Executor(attempt) => return self.execute(attempt, signal, &init).await,
				Role::Waiter(mut rx) => {
					let observed = tokio::select! {
						biased;
						err = signal.cancelled() => return Err(err),
						seen = rx.wait_for(Option::is_some) =>
							seen.ok().and_then(|seen| (*seen).clone()),
					};

					match observed {
						Some(Ok(value)) => return Ok(value),
						Some(Err(e)) => return Err(Error::InitializationFailed(e)),
						// The executor abandoned its attempt; re-enter the state machine.
						None => continue,
					}
				},
			}
		}
	}

	async fn execute<F, Fut>(&self, attempt: Attempt<'_, T>, signal: &Signal, init: &F) -> Result<T>
	where
		F: Fn() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		obs::record_gate_outcome(self.kind, GateOutcome::Attempt);

		let span = GateSpan::new(self.kind, "initialize");
		let outcome = tokio::select! {
			biased;
			err = signal.cancelled() => {
				obs::record_gate_outcome(self.kind, GateOutcome::Canceled);

				// Dropping `attempt` hands the gate back to the next caller.
				return Err(err);
			},
			outcome = span.instrument(init()) => outcome,
		};

		obs::record_gate_outcome(self.kind, GateOutcome::of(&outcome));

		attempt.finish(outcome)
	}
}
impl<T> Debug for SingleFlight<T>
where
	T: Clone,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SingleFlight")
			.field("kind", &self.kind)
			.field("phase", &self.phase())
			.finish()
	}
}

enum FlightState<T> {
	Empty,
	InProgress(watch::Receiver<Option<Outcome<T>>>),
	Ready(T),
	Failed(Arc<Error>),
}

enum Role<'a, T> {
	Executor(Attempt<'a, T>),
	Waiter(watch::Receiver<Option<Outcome<T>>>),
}

/// Executor's claim on an in-progress attempt.
///
/// Dropping it without calling [`Attempt::finish`] restores the pre-attempt state and
/// closes the channel, which wakes waiters so one of them can retry.
struct Attempt<'a, T> {
	gate: &'a SingleFlight<T>,
	tx: Option<watch::Sender<Option<Outcome<T>>>>,
	previous: Option<FlightState<T>>,
}
impl<T> Attempt<'_, T>
where
	T: Clone,
{
	fn finish(mut self, outcome: Result<T>) -> Result<T> {
		let mut state = self.gate.state.lock();
		let (next, shared, result) = match outcome {
			Ok(value) => (FlightState::Ready(value.clone()), Ok(value.clone()), Ok(value)),
			Err(e) => {
				let e = Arc::new(e);

				(
					FlightState::Failed(e.clone()),
					Err(e.clone()),
					Err(Error::InitializationFailed(e)),
				)
			},
		};

		*state = next;
		self.previous = None;

		if let Some(tx) = self.tx.take() {
			tx.send_replace(Some(shared));
		}

		result
	}
}
impl<T> Drop for Attempt<'_, T> {
	fn drop(&mut self) {
		if let Some(previous) = self.previous.take() {
			*self.gate.state.lock() = previous;
		}
	}
}

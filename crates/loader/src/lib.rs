//! Asynchronous load lifecycle with synthetic progress feedback.
//!
//! A [`LoadController`] wraps one outstanding request per view: it ramps a
//! progress value towards 90% while the request is in flight, catches up to
//! 100% once it settles, then hides and resets. A [`LoadDriver`] restarts the
//! controller whenever the view's trigger key changes.

pub mod controller;
pub mod driver;
pub mod state;
pub mod timings;

pub use controller::{CycleId, LoadController};
pub use driver::{LoadDriver, LoadSink, LoadSource};
pub use shared::error::FetchFailure;
pub use state::{LoadOutcome, LoadPhase, LoadState};
pub use timings::{LoaderConfigError, LoaderTimings};

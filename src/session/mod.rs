//! Session state, its reducer, and the controller that drives generations.

mod controller;
mod state;

pub use controller::{PendingGeneration, SessionController};
pub use state::{GeneratedResult, SessionEvent, SessionState, DOWNLOAD_PREFIX};

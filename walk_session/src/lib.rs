pub mod clock;
pub mod collaborators;
pub mod controller;
pub mod error;
pub mod sampler;
pub mod summary;

#[cfg(test)]
mod test_support;

pub use controller::{SessionEvent, SessionState, WalkSession, WalkSessionController};
pub use error::SessionError;

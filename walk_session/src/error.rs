use walk_tracker_lib::store::PersistError;

use crate::{controller::SessionState, sampler::SamplerError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("location permission has not been granted")]
    PermissionDenied,
    #[error("a walk session is already active")]
    AlreadyActive,
    #[error("location fix failed: {0}")]
    SampleError(String),
    #[error("location hardware unavailable: {0}")]
    HardwareUnavailable(String),
    #[error("no subject or pet is selected")]
    ProfileUnavailable,
    #[error("failed to store walk: {0}")]
    Persist(#[from] PersistError),
    #[error("cannot {operation} while {state:?}")]
    InvalidTransition {
        state: SessionState,
        operation: &'static str,
    },
}

impl From<SamplerError> for SessionError {
    fn from(error: SamplerError) -> Self {
        match error {
            SamplerError::PermissionDenied | SamplerError::PermissionRevoked => SessionError::PermissionDenied,
            SamplerError::HardwareUnavailable(reason) => SessionError::HardwareUnavailable(reason),
            SamplerError::Fix(reason) => SessionError::SampleError(reason),
            SamplerError::AlreadySubscribed => SessionError::AlreadyActive,
        }
    }
}

use crate::persistence::PersistenceError;
use crate::populations::{EditError, PopulationConsistencyError};

use std::error::Error;
use std::fmt;

/// An error type for rejected controller requests.
///
/// Illegal requests are rejected synchronously with the
/// specific reason and leave the controller state unchanged.
/// Persistence failures leave the controller in its previous
/// state; the requested operation is not considered complete
/// and must be retried by the caller.
#[derive(Debug)]
pub enum ControllerError {
    /// `start` was called on a controller that already left
    /// the idle state.
    NotIdle,
    /// The operation requires a running controller.
    NotRunning,
    /// The operation requires a paused controller.
    NotPaused,
    /// A mode switch was requested mid-evaluation. Mode
    /// switches are only accepted at quiescent points.
    ModeSwitchMidEvaluation,
    /// The operation requires manual mode.
    ManualModeRequired,
    /// The operation requires automatic mode.
    AutomaticModeRequired,
    /// A generation is already in flight.
    EvaluationInFlight,
    /// A verdict was submitted with no generation in flight.
    NoGenerationInFlight,
    /// The requested structural edit is illegal.
    Edit(EditError),
    /// A loaded population document violates the cross-genome
    /// consistency invariants.
    Consistency(PopulationConsistencyError),
    /// Durable storage failed.
    Persistence(PersistenceError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotIdle => write!(f, "the controller has already been started"),
            Self::NotRunning => write!(f, "the controller is not running"),
            Self::NotPaused => write!(f, "the controller is not paused"),
            Self::ModeSwitchMidEvaluation => {
                write!(f, "mode switches are not accepted while a generation is in flight")
            }
            Self::ManualModeRequired => write!(f, "the controller is not in manual mode"),
            Self::AutomaticModeRequired => write!(f, "the controller is not in automatic mode"),
            Self::EvaluationInFlight => write!(f, "a generation is already in flight"),
            Self::NoGenerationInFlight => write!(f, "no generation is in flight"),
            Self::Edit(e) => write!(f, "illegal structural edit: {}", e),
            Self::Consistency(e) => write!(f, "loaded population is inconsistent: {}", e),
            Self::Persistence(e) => write!(f, "{}", e),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Edit(e) => Some(e),
            Self::Consistency(e) => Some(e),
            Self::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EditError> for ControllerError {
    fn from(e: EditError) -> Self {
        Self::Edit(e)
    }
}

impl From<PopulationConsistencyError> for ControllerError {
    fn from(e: PopulationConsistencyError) -> Self {
        Self::Consistency(e)
    }
}

impl From<PersistenceError> for ControllerError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

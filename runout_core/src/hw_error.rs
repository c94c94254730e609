//! Maps `Box<dyn Error>` from trait boundaries to typed `RunoutError`.
//!
//! The traits in `runout_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `runout_hardware::HwError` downcasting.
//!
//! Mapping allocates, so it is only used off the polling path.

use crate::error::RunoutError;

/// Map an input-side error to a typed `RunoutError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> RunoutError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<runout_hardware::error::HwError>() {
            return match hw {
                runout_hardware::error::HwError::UnknownSensor(i) => {
                    RunoutError::Config(format!("no input wired for sensor {i}"))
                }
                other => RunoutError::SensorUnavailable(other.to_string()),
            };
        }
    }

    RunoutError::SensorUnavailable(e.to_string())
}

/// Map a collaborator failure, tagging which collaborator refused.
pub fn map_collaborator_error(
    what: &'static str,
    e: &(dyn std::error::Error + 'static),
) -> RunoutError {
    RunoutError::Collaborator(format!("{what}: {e}"))
}

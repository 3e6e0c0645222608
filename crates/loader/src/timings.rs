use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoaderConfigError {
    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },
    #[error("{field} must be a positive finite step, got {value}")]
    InvalidStep { field: &'static str, value: f64 },
    #[error("ramp ceiling must lie strictly between 0 and 1, got {0}")]
    InvalidCeiling(f64),
}

/// Timer constants of one load cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderTimings {
    /// Period of the ramp ticker while the request is outstanding.
    pub ramp_tick: Duration,
    pub ramp_step: f64,
    /// Progress never passes this value before the request settles.
    pub ramp_ceiling: f64,
    pub catch_up_tick: Duration,
    pub catch_up_step: f64,
    /// Hard limit after which catch-up forces progress to 1.0.
    pub catch_up_deadline: Duration,
    /// Pause at 1.0 when the ramp had already reached its ceiling.
    pub complete_hold: Duration,
    /// Pause at 1.0 before `is_loading` drops.
    pub settle_delay: Duration,
    /// Pause after `is_loading` drops before progress resets to 0.
    pub reset_delay: Duration,
    /// Optional limit on the request itself; `None` relies on the transport.
    pub request_timeout: Option<Duration>,
}

impl Default for LoaderTimings {
    fn default() -> Self {
        Self {
            ramp_tick: Duration::from_millis(50),
            ramp_step: 0.02,
            ramp_ceiling: 0.9,
            catch_up_tick: Duration::from_millis(30),
            catch_up_step: 0.15,
            catch_up_deadline: Duration::from_millis(500),
            complete_hold: Duration::from_millis(200),
            settle_delay: Duration::from_millis(100),
            reset_delay: Duration::from_millis(500),
            request_timeout: None,
        }
    }
}

impl LoaderTimings {
    pub fn validate(&self) -> Result<(), LoaderConfigError> {
        if self.ramp_tick.is_zero() {
            return Err(LoaderConfigError::ZeroInterval { field: "ramp_tick" });
        }
        if self.catch_up_tick.is_zero() {
            return Err(LoaderConfigError::ZeroInterval {
                field: "catch_up_tick",
            });
        }
        if matches!(self.request_timeout, Some(limit) if limit.is_zero()) {
            return Err(LoaderConfigError::ZeroInterval {
                field: "request_timeout",
            });
        }
        check_step("ramp_step", self.ramp_step)?;
        check_step("catch_up_step", self.catch_up_step)?;
        if !(self.ramp_ceiling > 0.0 && self.ramp_ceiling < 1.0) {
            return Err(LoaderConfigError::InvalidCeiling(self.ramp_ceiling));
        }
        Ok(())
    }
}

fn check_step(field: &'static str, value: f64) -> Result<(), LoaderConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LoaderConfigError::InvalidStep { field, value })
    }
}

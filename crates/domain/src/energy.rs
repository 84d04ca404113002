//! Energy readings — watt-hours a controller reports for one light.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{LightId, OwnerId};
use crate::time::Timestamp;

/// How many of the latest readings are kept per light in history views.
pub const READINGS_PER_LIGHT: u32 = 50;

/// One consumption sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyReading {
    pub owner_id: OwnerId,
    pub light_id: LightId,
    pub energy_wh: f64,
    pub recorded_at: Timestamp,
}

impl EnergyReading {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEnergy`] when `energy_wh` is
    /// negative, NaN or infinite.
    pub fn new(
        owner_id: OwnerId,
        light_id: LightId,
        energy_wh: f64,
        recorded_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        if !energy_wh.is_finite() || energy_wh < 0.0 {
            return Err(ValidationError::InvalidEnergy(energy_wh.to_string()));
        }
        Ok(Self {
            owner_id,
            light_id,
            energy_wh,
            recorded_at,
        })
    }
}

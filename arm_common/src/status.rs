//! Periodic status snapshot.
//!
//! Serialized once per [`crate::consts::STATUS_INTERVAL`] and handed to the
//! outbound transport:
//!
//! ```json
//! {"mode":"AUTO","distance":12.5,"servos":[90,90,90,90,90],"motor_speed":0}
//! ```
//!
//! A `distance` of `-1` denotes "no valid reading this cycle".

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_JOINTS, NO_READING};
use crate::context::Mode;

/// One outbound status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Current arbitration mode.
    pub mode: Mode,
    /// Latest averaged distance [cm], or [`NO_READING`].
    pub distance: f32,
    /// Stored angle of every joint [deg], index = joint id.
    pub servos: Vec<u8, MAX_JOINTS>,
    /// Last commanded motor speed.
    pub motor_speed: i8,
}

impl StatusReport {
    /// Build a snapshot, mapping an absent reading to the wire sentinel.
    pub fn new(
        mode: Mode,
        distance: Option<f32>,
        servos: Vec<u8, MAX_JOINTS>,
        motor_speed: i8,
    ) -> Self {
        Self {
            mode,
            distance: distance.unwrap_or(NO_READING),
            servos,
            motor_speed,
        }
    }

    /// Serialize to the single-line JSON wire form.
    ///
    /// # Errors
    ///
    /// Propagates the underlying serializer error; the caller logs and drops
    /// the snapshot (status emission is best-effort).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

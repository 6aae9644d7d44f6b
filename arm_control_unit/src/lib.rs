//! # Smart-Arm Control Unit Library
//!
//! The real-time side of the smart arm: distance sensing, joint and motor
//! actuation, command intake and the mode-arbitrating control loop.
//!
//! # Module Structure
//!
//! - [`sensor`] - Ultrasonic distance sensor (pulse timing + averaging)
//! - [`servo`] - Joint controller (validated + interpolated motion)
//! - [`motor`] - Drive-motor controller
//! - [`intake`] - Command application with mode arbitration
//! - [`cycle`] - Control loop: detection, grab sequence, status cadence
//! - [`transport`] - Stdio line transport (reference external collaborator)
//!
//! # Architecture
//!
//! ```text
//!   stdin lines ──► intake thread ──► Joint/Motor controllers ◄── control loop
//!                        │                                           │
//!                        └─────────► ControlContext (atomics) ◄──────┤
//!                                                                    ▼
//!   stdout JSON ◄──────────────────────────────────────────── status snapshots
//! ```

pub mod cycle;
pub mod intake;
pub mod motor;
pub mod sensor;
pub mod servo;
pub mod transport;

pub use crate::cycle::ControlLoop;
pub use crate::intake::CommandIntake;
pub use crate::motor::MotorController;
pub use crate::sensor::{SensorError, UltrasonicSensor};
pub use crate::servo::{JointController, ServoError};

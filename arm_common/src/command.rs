//! Remote command grammar and parsing.
//!
//! One command per message, whitespace-delimited tokens:
//!
//! ```text
//! MODE AUTO|MANUAL
//! SERVO <id:int 0-4> <angle:int 0-180>
//! MOTOR <speed:int -100..100>
//! STOP
//! HOME
//! ```
//!
//! Validation happens here, at the boundary: a malformed or out-of-range
//! command never reaches the controllers. Extra trailing tokens are ignored,
//! matching the lenient token-stream parsing of the wire protocol.

use thiserror::Error;

use crate::consts::{MAX_ANGLE_DEG, MAX_JOINTS, MAX_MOTOR_SPEED};
use crate::context::Mode;

/// A parsed remote command. Transient — created by command intake,
/// applied immediately, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch arbitration mode.
    SetMode(Mode),
    /// Move one joint to an absolute angle (honored in MANUAL only).
    SetServo {
        /// Joint id, `0..MAX_JOINTS`.
        id: u8,
        /// Target angle [deg], `0..=180`.
        angle: u8,
    },
    /// Set drive-motor speed (honored in MANUAL only).
    SetMotor {
        /// Signed speed, `-100..=100`; sign selects direction.
        speed: i8,
    },
    /// Emergency stop — always honored, preempts a grab sequence.
    Stop,
    /// Move every joint to the neutral position — always honored.
    Home,
}

/// Errors produced while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    /// The message contained no tokens.
    #[error("empty command")]
    Empty,

    /// The leading token is not part of the grammar.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A required argument is missing.
    #[error("missing {0} argument")]
    MissingArgument(&'static str),

    /// An argument is not a valid integer.
    #[error("invalid integer '{0}'")]
    InvalidInteger(String),

    /// The MODE argument is neither AUTO nor MANUAL.
    #[error("invalid mode '{0}' (expected AUTO or MANUAL)")]
    InvalidMode(String),

    /// Servo id outside the joint range.
    #[error("servo id {0} out of range")]
    ServoIdOutOfRange(i64),

    /// Servo angle outside [0, 180].
    #[error("angle {0} out of range")]
    AngleOutOfRange(i64),

    /// Motor speed outside [-100, 100].
    #[error("speed {0} out of range")]
    SpeedOutOfRange(i64),
}

impl Command {
    /// Parse one command line.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandParseError`] describing the first problem found;
    /// no partial command is ever produced.
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().ok_or(CommandParseError::Empty)?;

        match keyword {
            "MODE" => {
                let mode = tokens
                    .next()
                    .ok_or(CommandParseError::MissingArgument("mode"))?;
                match mode {
                    "AUTO" => Ok(Self::SetMode(Mode::Auto)),
                    "MANUAL" => Ok(Self::SetMode(Mode::Manual)),
                    other => Err(CommandParseError::InvalidMode(other.to_string())),
                }
            }
            "SERVO" => {
                let id = parse_int(tokens.next(), "servo id")?;
                let angle = parse_int(tokens.next(), "angle")?;
                if id < 0 || id >= MAX_JOINTS as i64 {
                    return Err(CommandParseError::ServoIdOutOfRange(id));
                }
                if angle < 0 || angle > MAX_ANGLE_DEG as i64 {
                    return Err(CommandParseError::AngleOutOfRange(angle));
                }
                Ok(Self::SetServo {
                    id: id as u8,
                    angle: angle as u8,
                })
            }
            "MOTOR" => {
                let speed = parse_int(tokens.next(), "speed")?;
                if speed < -(MAX_MOTOR_SPEED as i64) || speed > MAX_MOTOR_SPEED as i64 {
                    return Err(CommandParseError::SpeedOutOfRange(speed));
                }
                Ok(Self::SetMotor {
                    speed: speed as i8,
                })
            }
            "STOP" => Ok(Self::Stop),
            "HOME" => Ok(Self::Home),
            other => Err(CommandParseError::UnknownCommand(other.to_string())),
        }
    }
}

/// Parse an integer token, mapping absence and malformation to grammar errors.
fn parse_int(token: Option<&str>, what: &'static str) -> Result<i64, CommandParseError> {
    let token = token.ok_or(CommandParseError::MissingArgument(what))?;
    token
        .parse::<i64>()
        .map_err(|_| CommandParseError::InvalidInteger(token.to_string()))
}

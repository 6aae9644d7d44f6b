//! # Smart-Arm Control Unit
//!
//! Actuates a 5-joint robotic arm and a drive motor, arbitrating between an
//! autonomous proximity-triggered grab behavior and manual remote commands.
//!
//! # Usage
//!
//! ```bash
//! # Run against real GPIO (requires the `raspi` feature)
//! arm_control_unit --config config/arm.toml
//!
//! # Run with the simulation backend
//! arm_control_unit --simulate
//!
//! # Verbose logging
//! arm_control_unit -s -v
//! ```
//!
//! Commands are read line-by-line from stdin (`MODE`, `SERVO`, `MOTOR`,
//! `STOP`, `HOME`); status snapshots are written as JSON lines to stdout
//! once per second. Logs go to stderr.

#![deny(warnings)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use parking_lot::Mutex;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use arm_common::config::ArmConfig;
use arm_common::context::ControlContext;
use arm_control_unit::cycle::ControlLoop;
use arm_control_unit::intake::CommandIntake;
use arm_control_unit::motor::MotorController;
use arm_control_unit::sensor::UltrasonicSensor;
use arm_control_unit::servo::JointController;
use arm_control_unit::transport::{spawn_stdin_reader, StdoutStatusSink};
use arm_hal::gpio::GpioBackend;
use arm_hal::SimBackend;

/// Smart-Arm Control Unit — proximity-triggered robotic arm
#[derive(Parser, Debug)]
#[command(name = "arm_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Control unit for a proximity-triggered smart robotic arm")]
struct Args {
    /// Path to the configuration TOML. Built-in defaults are used when the
    /// file is absent.
    #[arg(short, long, default_value = "config/arm.toml")]
    config: PathBuf,

    /// Use the simulation backend instead of real GPIO
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging (DEBUG level)
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!(
        "Smart-Arm Control Unit v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Smart-Arm Control Unit shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = ArmConfig::load_or_default(&args.config)?;
    info!(
        "Config OK: instance '{}', {} joints, grab below {} cm",
        config.arm.name,
        config.pins.servos.len(),
        config.sensor.grab_threshold_cm
    );

    let mut backend = make_backend(args)?;
    info!("GPIO backend: {}", backend.name());

    // Any acquisition failure here aborts before the loop starts.
    let joints = JointController::new(backend.as_mut(), &config.pins.servos)?;
    let motor = MotorController::new(
        backend.as_mut(),
        config.pins.motor_pwm,
        config.pins.motor_dir1,
        config.pins.motor_dir2,
    )?;
    let sensor = UltrasonicSensor::new(
        backend.as_mut(),
        config.pins.trigger,
        config.pins.echo,
        config.sensor.max_distance_cm,
    )?;
    info!("hardware initialized, arm homed");

    let ctx = Arc::new(ControlContext::new());
    let r = Arc::clone(&ctx);
    ctrlc::set_handler(move || {
        info!("received shutdown signal");
        r.request_shutdown();
    })?;

    let joints = Arc::new(Mutex::new(joints));
    let motor = Arc::new(Mutex::new(motor));

    let (tx, rx) = crossbeam_channel::unbounded();
    // Detached on purpose: the reader blocks in stdin and dies with the
    // process; joining it would hang shutdown.
    let _transport = spawn_stdin_reader(tx)?;

    let intake = CommandIntake::new(Arc::clone(&ctx), Arc::clone(&joints), Arc::clone(&motor));
    let intake_handle = thread::Builder::new()
        .name("command-intake".to_string())
        .spawn(move || intake.run(rx))?;

    let mut control = ControlLoop::new(
        ctx,
        joints,
        motor,
        sensor,
        Box::new(StdoutStatusSink),
        &config.sensor,
    );
    control.run();

    if intake_handle.join().is_err() {
        warn!("command intake panicked");
    }
    Ok(())
}

/// Select the GPIO backend from CLI flags and build features.
fn make_backend(args: &Args) -> Result<Box<dyn GpioBackend>, Box<dyn std::error::Error>> {
    if args.simulate {
        return Ok(Box::new(SimBackend::new()));
    }

    #[cfg(all(feature = "raspi", target_os = "linux"))]
    return Ok(Box::new(arm_hal::raspi::RaspiBackend::new()?));

    #[cfg(not(all(feature = "raspi", target_os = "linux")))]
    Err("built without the raspi feature — run with --simulate".into())
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr; stdout carries the status stream.
    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

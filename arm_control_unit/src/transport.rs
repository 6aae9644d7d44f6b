//! Stdio line transport — the reference external collaborator.
//!
//! The transport carrying commands and status is outside the control
//! contract; this module wires the simplest faithful one: commands arrive
//! as lines on stdin, status snapshots leave as JSON lines on stdout (logs
//! go to stderr, keeping stdout machine-readable). Anything that speaks
//! newline-delimited text — an MQTT bridge, a socket relay, a shell pipe —
//! can sit on either side.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use tracing::{info, warn};

use arm_common::status::StatusReport;

/// Outbound seam for status snapshots.
pub trait StatusSink: Send {
    /// Hand one snapshot to the transport. Best-effort — failures are the
    /// sink's to report.
    fn publish(&mut self, report: &StatusReport);
}

/// Status sink writing one JSON line per snapshot to stdout.
pub struct StdoutStatusSink;

impl StatusSink for StdoutStatusSink {
    fn publish(&mut self, report: &StatusReport) {
        let line = match report.to_json() {
            Ok(line) => line,
            Err(e) => {
                warn!("status serialization failed: {e}");
                return;
            }
        };
        let mut out = io::stdout().lock();
        if writeln!(out, "{line}").and_then(|_| out.flush()).is_err() {
            warn!("status write failed");
        }
    }
}

/// Spawn the reader thread feeding stdin lines into the command channel.
///
/// The thread ends on EOF or a read error; the system keeps running
/// autonomously either way — a closed command stream is not a shutdown.
pub fn spawn_stdin_reader(commands: Sender<String>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("cmd-transport".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if commands.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("command stream error: {e}");
                        break;
                    }
                }
            }
            info!("command stream closed");
        })
}

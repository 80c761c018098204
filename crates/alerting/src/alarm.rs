//! Alarm implementations

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Alarm error types
#[derive(Error, Debug)]
pub enum AlarmError {
    #[error("Alarm output failed: {0}")]
    Output(#[from] std::io::Error),

    #[error("Alarm command exited with status {0}")]
    CommandFailed(i32),

    #[error("Alarm command terminated by signal")]
    Terminated,

    #[error("Alarm command is empty")]
    EmptyCommand,
}

/// An audible signal fired once per qualifying frame.
///
/// Callers treat failures as non-fatal.
pub trait Alarm: Send + Sync {
    fn sound(&self) -> Result<(), AlarmError>;
}

/// Which alarm to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmKind {
    /// Write the ASCII bell to the controlling terminal
    #[default]
    Bell,
    /// Run an external program
    Command,
    /// Do nothing
    Silent,
}

/// Alarm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub kind: AlarmKind,
    /// Tone frequency in Hz (default: 800)
    pub frequency_hz: u32,
    /// Tone length in milliseconds (default: 200)
    pub duration_ms: u32,
    /// Program and arguments for `AlarmKind::Command`.
    /// `{frequency}` and `{duration_ms}` are substituted.
    pub command: Vec<String>,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            kind: AlarmKind::Bell,
            frequency_hz: 800,
            duration_ms: 200,
            command: vec![
                "beep".to_string(),
                "-f".to_string(),
                "{frequency}".to_string(),
                "-l".to_string(),
                "{duration_ms}".to_string(),
            ],
        }
    }
}

/// Build the alarm selected by `config`
pub fn build_alarm(config: &AlarmConfig) -> Arc<dyn Alarm> {
    info!("Using {:?} alarm", config.kind);
    match config.kind {
        AlarmKind::Bell => Arc::new(TerminalBell),
        AlarmKind::Command => Arc::new(CommandAlarm::from_config(config)),
        AlarmKind::Silent => Arc::new(SilentAlarm),
    }
}

/// Rings the terminal bell on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl Alarm for TerminalBell {
    fn sound(&self) -> Result<(), AlarmError> {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

/// Runs an external program and waits for it to finish
#[derive(Debug, Clone)]
pub struct CommandAlarm {
    program: String,
    args: Vec<String>,
}

impl CommandAlarm {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from configuration, substituting tone placeholders
    pub fn from_config(config: &AlarmConfig) -> Self {
        let mut parts = config.command.iter().map(|part| {
            part.replace("{frequency}", &config.frequency_hz.to_string())
                .replace("{duration_ms}", &config.duration_ms.to_string())
        });
        let program = parts.next().unwrap_or_default();
        Self::new(program, parts.collect())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Alarm for CommandAlarm {
    fn sound(&self) -> Result<(), AlarmError> {
        if self.program.is_empty() {
            return Err(AlarmError::EmptyCommand);
        }

        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            match status.code() {
                Some(code) => Err(AlarmError::CommandFailed(code)),
                None => Err(AlarmError::Terminated),
            }
        }
    }
}

/// No-op alarm
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlarm;

impl Alarm for SilentAlarm {
    fn sound(&self) -> Result<(), AlarmError> {
        debug!("Silent alarm fired");
        Ok(())
    }
}

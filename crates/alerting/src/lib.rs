//! Alerting System
//!
//! Provides the audible alarm fired while the driver is classified as sleeping.

mod alarm;

pub use alarm::{
    build_alarm, Alarm, AlarmConfig, AlarmError, AlarmKind, CommandAlarm, SilentAlarm, TerminalBell,
};

//! Session lifecycle state
//!
//! The state doubles as the callback gate: sensor callbacks read it on the
//! simulator's threads and only `Recording` lets a packet through.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{RecorderError, Result};

/// Session lifecycle, strictly linear
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SessionState {
    Disconnected = 0,
    Connected = 1,
    OutputReady = 2,
    VehicleSpawned = 3,
    SensorsArmed = 4,
    Recording = 5,
    Finalized = 6,
}

impl SessionState {
    /// The only forward step out of this state. `Finalized` is reachable
    /// from anywhere through finalize, not through this.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Disconnected => Some(Self::Connected),
            Self::Connected => Some(Self::OutputReady),
            Self::OutputReady => Some(Self::VehicleSpawned),
            Self::VehicleSpawned => Some(Self::SensorsArmed),
            Self::SensorsArmed => Some(Self::Recording),
            Self::Recording => Some(Self::Finalized),
            Self::Finalized => None,
        }
    }

    pub fn accepts_callbacks(self) -> bool {
        self == Self::Recording
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::OutputReady => "output_ready",
            Self::VehicleSpawned => "vehicle_spawned",
            Self::SensorsArmed => "sensors_armed",
            Self::Recording => "recording",
            Self::Finalized => "finalized",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connected,
            2 => Self::OutputReady,
            3 => Self::VehicleSpawned,
            4 => Self::SensorsArmed,
            5 => Self::Recording,
            _ => Self::Finalized,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic cell holding the current [`SessionState`]
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Fails unless `to` is the direct successor of the current state
    pub fn check(&self, to: SessionState) -> Result<()> {
        let from = self.get();
        if from.next() == Some(to) {
            Ok(())
        } else {
            Err(RecorderError::InvalidTransition { from, to })
        }
    }

    /// Step forward to `to`
    pub fn advance(&self, to: SessionState) -> Result<()> {
        let from = self.get();
        if from.next() != Some(to) {
            return Err(RecorderError::InvalidTransition { from, to });
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| RecorderError::InvalidTransition {
                from: SessionState::from_u8(actual),
                to,
            })
    }

    /// Jump to `Finalized` from any state, returning the state left behind
    pub fn finalize(&self) -> SessionState {
        SessionState::from_u8(self.0.swap(SessionState::Finalized as u8, Ordering::AcqRel))
    }
}

pub mod fields;
pub mod frame;
pub mod limiter;
pub mod memory;
pub mod reconciler;
pub mod thermostat_mode;

pub use fields::{
    CommandError, FanSpeed, Field, FieldCodec, Mode, Power, Precision, Setpoint, Spare,
    SystemMode, ThermostatMode,
};
pub use frame::{Frame, FrameCodec, FrameUpdate, Inbound, Token};
pub use limiter::RateLimiter;
pub use memory::ModeMemory;
pub use reconciler::{Command, InboundOutcome, Outbound, Reconciler};
pub use thermostat_mode::{IdentifierError, ThermostatModeChannel};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// The hub-side view of one device's climate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateState {
    // Gates climate commands and PMTSD exchange
    pub thermostat_enabled: bool,

    pub system_mode: SystemMode,

    pub setpoint: Setpoint,

    pub fan: FanSpeed,

    pub spare: Spare,

    // Last non-off mode, restored when powering on without a mode
    pub memory: ModeMemory,

    // Only advanced after a successful write
    pub last_transmit: Option<DateTime<Local>>,

    // Last reading of the built-in temperature sensor, in Celsius
    pub local_temperature: Option<f64>,
}

impl ClimateState {
    pub const DEFAULT_SETPOINT: Setpoint = Setpoint::from_degrees(15);

    pub fn record_transmit(&mut self, now: DateTime<Local>) {
        self.last_transmit = Some(now);
    }
}

impl Default for ClimateState {
    fn default() -> Self {
        Self {
            thermostat_enabled: false,
            system_mode: SystemMode::Off,
            setpoint: Self::DEFAULT_SETPOINT,
            fan: FanSpeed::Auto,
            spare: Spare::Zero,
            memory: ModeMemory::default(),
            last_transmit: None,
            local_temperature: None,
        }
    }
}

/// Values to publish to the presentation layer. Only the fields that are set
/// are serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thermostat_mode: Option<ThermostatMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_mode: Option<SystemMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setpoint: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spare_flag: Option<Spare>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_temperature: Option<f64>,
    /// Summary of the last device report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl StateUpdate {
    pub fn is_empty(&self) -> bool {
        *self == StateUpdate::default()
    }
}

use chrono::{DateTime, Local};

use super::{
    fields::{CommandError, FieldCodec, Power},
    frame::{Frame, FrameUpdate},
    limiter::RateLimiter,
    ClimateState,
};

/// A request coming from the presentation layer, or the internal bulk apply
/// used to answer a device sync request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SystemMode(String),
    Setpoint(f64),
    FanMode(String),
    Spare(String),
    ThermostatMode(String),
    Sync(FrameUpdate),
}

impl Command {
    pub fn key(&self) -> &'static str {
        match self {
            Command::SystemMode(_) => "system_mode",
            Command::Setpoint(_) => "setpoint",
            Command::FanMode(_) => "fan_mode",
            Command::Spare(_) => "spare_flag",
            Command::ThermostatMode(_) => "thermostat_enabled",
            Command::Sync(_) => "sync",
        }
    }

    /// Commands that are ignored while thermostat mode is off
    pub fn is_climate(&self) -> bool {
        matches!(
            self,
            Command::SystemMode(_) | Command::Setpoint(_) | Command::FanMode(_)
        )
    }

    /// Maps a named field from the command surface onto a command. Numbers
    /// and strings are both accepted wherever the original value is textual.
    pub fn from_key_value(key: &str, value: &serde_json::Value) -> Result<Self, CommandError> {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        Ok(match key {
            "system_mode" => Command::SystemMode(text),
            "setpoint" | "occupied_heating_setpoint" => {
                let value = match value {
                    serde_json::Value::Number(n) => n.as_f64(),
                    serde_json::Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                };
                Command::Setpoint(value.ok_or(CommandError::NotNumeric(text))?)
            }
            "fan_mode" => Command::FanMode(text),
            "spare_flag" | "unused" => Command::Spare(text),
            "thermostat_enabled" | "thermostat_mode" => Command::ThermostatMode(text),
            _ => return Err(CommandError::UnknownCommand(key.to_string())),
        })
    }
}

/// Result of applying a command to the logical state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outbound {
    pub frame: Frame,
    pub changed: bool,
    /// Whether the rate limiter lets this frame go out
    pub transmit: bool,
}

/// Result of merging a device report into the logical state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundOutcome {
    pub frame: Frame,
    /// `YYYY-MM-DD HH:MM:SS_PW0_MW1_...` over the tokens present on the wire
    pub diagnostic: String,
}

/// Keeps the logical climate state and the PMTSD frames in agreement.
#[derive(Debug, Clone)]
pub struct Reconciler {
    fields: FieldCodec,
    limiter: RateLimiter,
}

impl Reconciler {
    pub fn new(fields: FieldCodec, limiter: RateLimiter) -> Self {
        Self { fields, limiter }
    }

    pub fn fields(&self) -> &FieldCodec {
        &self.fields
    }

    pub fn apply_inbound(
        &self,
        state: &mut ClimateState,
        update: &FrameUpdate,
        now: DateTime<Local>,
    ) -> InboundOutcome {
        let mut frame = Frame::from(&*state);
        frame.overlay(update);
        store(state, &frame);

        InboundOutcome {
            frame,
            diagnostic: diagnostic(update, now),
        }
    }

    /// Validates and applies `command`. Nothing is mutated when validation
    /// fails.
    pub fn apply_outbound(
        &self,
        state: &mut ClimateState,
        command: &Command,
        now: DateTime<Local>,
    ) -> Result<Outbound, CommandError> {
        if command.is_climate() && !state.thermostat_enabled {
            return Err(CommandError::ThermostatDisabled(command.key()));
        }

        let previous = Frame::from(&*state);
        let mut frame = previous;

        let changed = match command {
            Command::SystemMode(value) => {
                match self.fields.system_mode(value)?.mode() {
                    Some(mode) => {
                        frame.power = Power::On;
                        frame.mode = mode;
                    }
                    None => {
                        if let Some(current) = state.system_mode.mode() {
                            state.memory.record_active(current);
                        }
                        frame.power = Power::Off;
                    }
                }
                frame != previous
            }
            Command::Setpoint(value) => {
                frame.temperature = self.fields.validate_setpoint(*value)?;
                frame != previous
            }
            Command::FanMode(value) => {
                frame.speed = self.fields.fan(value)?;
                frame != previous
            }
            Command::Spare(value) => {
                frame.spare = self.fields.spare(value)?;
                frame != previous
            }
            Command::Sync(update) => {
                frame.overlay(update);
                true
            }
            Command::ThermostatMode(_) => {
                // Not a PMTSD field, handled by the thermostat mode channel
                return Err(CommandError::UnknownCommand(command.key().to_string()));
            }
        };

        store(state, &frame);
        let transmit = self
            .limiter
            .should_transmit(changed, now, state.last_transmit);

        Ok(Outbound {
            frame,
            changed,
            transmit,
        })
    }
}

fn store(state: &mut ClimateState, frame: &Frame) {
    state.system_mode = frame.system_mode();
    if let Some(mode) = state.system_mode.mode() {
        state.memory.record_active(mode);
    }
    state.setpoint = frame.temperature;
    state.fan = frame.speed;
    state.spare = frame.spare;
}

pub fn diagnostic(update: &FrameUpdate, now: DateTime<Local>) -> String {
    let mut parts = vec![now.format("%Y-%m-%d %H:%M:%S").to_string()];
    parts.extend(
        update
            .tokens
            .iter()
            .map(|t| format!("{}W{}", t.key, t.value)),
    );
    parts.join("_")
}

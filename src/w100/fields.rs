use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};
use thiserror::Error;

use crate::{link::TransportError, w100::thermostat_mode::IdentifierError};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("invalid value for {field}: {value:?}")]
    InvalidEnumValue { field: &'static str, value: String },

    #[error("setpoint {value} out of range. Must be between {min} and {max}")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("setpoint is not a number: {0:?}")]
    NotNumeric(String),

    #[error("ignoring {0} command, thermostat mode is not ON")]
    ThermostatDisabled(&'static str),

    #[error("unrecognized command key: {0}")]
    UnknownCommand(String),

    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] IdentifierError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// The enumerable wire fields of a PMTSD frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Power,
    Mode,
    FanMode,
    SpareFlag,
}

// Field `P`. Note that the device uses 0 for "on".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u8)]
pub enum Power {
    On = 0,
    Off = 1,
}

// Field `M`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, Display, Serialize, Deserialize,
)]
#[repr(u8)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Cool = 0,
    Heat = 1,
    Auto = 2,
}

// Field `S`. Labels are configurable, see `FieldCodec::fan_label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, Serialize, Deserialize)]
#[repr(u8)]
pub enum FanSpeed {
    Auto = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

// Field `D`, unused by the device but it must round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Serialize, Deserialize)]
#[repr(u8)]
pub enum Spare {
    #[serde(rename = "0")]
    Zero = 0,
    #[serde(rename = "1")]
    One = 1,
}

/// Power and mode folded into the value the climate entity exposes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SystemMode {
    Off,
    Cool,
    Heat,
    Auto,
}

impl SystemMode {
    pub fn from_wire(power: Power, mode: Mode) -> Self {
        match (power, mode) {
            (Power::Off, _) => SystemMode::Off,
            (Power::On, Mode::Cool) => SystemMode::Cool,
            (Power::On, Mode::Heat) => SystemMode::Heat,
            (Power::On, Mode::Auto) => SystemMode::Auto,
        }
    }

    /// The active operating mode, or None when off.
    pub fn mode(&self) -> Option<Mode> {
        match self {
            SystemMode::Off => None,
            SystemMode::Cool => Some(Mode::Cool),
            SystemMode::Heat => Some(Mode::Heat),
            SystemMode::Auto => Some(Mode::Auto),
        }
    }
}

impl From<Mode> for SystemMode {
    fn from(mode: Mode) -> Self {
        SystemMode::from_wire(Power::On, mode)
    }
}

/// Whether the device accepts and broadcasts PMTSD frames at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThermostatMode {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Nearest whole degree, sent as `T22`
    #[default]
    Whole,
    /// Nearest tenth of a degree, sent as `T22.5`
    Tenths,
}

/// A target temperature, held in tenths of a degree so comparisons are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Setpoint(i32);

impl Setpoint {
    pub const fn from_tenths(tenths: i32) -> Self {
        Setpoint(tenths)
    }

    pub const fn from_degrees(degrees: i32) -> Self {
        Setpoint(degrees * 10)
    }

    /// Rounds `celsius` to the given precision, halves towards +∞. The
    /// caller checks finiteness; out-of-range values saturate.
    pub fn round(celsius: f64, precision: Precision) -> Self {
        let tenths = match precision {
            Precision::Whole => (celsius + 0.5).floor() * 10.0,
            Precision::Tenths => (celsius * 10.0 + 0.5).floor(),
        };
        Setpoint(tenths as i32)
    }

    fn step(precision: Precision) -> i32 {
        match precision {
            Precision::Whole => 10,
            Precision::Tenths => 1,
        }
    }

    pub fn celsius(&self) -> f64 {
        self.0 as f64 / 10.0
    }

    pub fn format(&self, precision: Precision) -> String {
        match precision {
            Precision::Whole => format!("{}", self.celsius().round() as i32),
            Precision::Tenths => format!("{:.1}", self.celsius()),
        }
    }
}

const POWER_LABELS: [&str; 2] = ["on", "off"];
const MODE_LABELS: [&str; 3] = ["cool", "heat", "auto"];
const SPARE_LABELS: [&str; 2] = ["0", "1"];

/// Converts between the symbolic values used by the command surface and the
/// numeric values carried on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCodec {
    precision: Precision,
    min: f64,
    max: f64,
    fan_labels: [String; 4],
}

impl FieldCodec {
    pub fn new(precision: Precision, bounds: (f64, f64), fan_labels: [String; 4]) -> Self {
        Self {
            precision,
            min: bounds.0,
            max: bounds.1,
            fan_labels,
        }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    fn table(&self, field: Field) -> Vec<&str> {
        match field {
            Field::Power => POWER_LABELS.to_vec(),
            Field::Mode => MODE_LABELS.to_vec(),
            Field::FanMode => self.fan_labels.iter().map(String::as_str).collect(),
            Field::SpareFlag => SPARE_LABELS.to_vec(),
        }
    }

    /// Case-insensitive lookup of `text`; the returned index is the wire value.
    pub fn decode_symbol(&self, field: Field, text: &str) -> Result<u8, CommandError> {
        let text = text.trim();
        self.table(field)
            .iter()
            .position(|label| label.eq_ignore_ascii_case(text))
            .map(|index| index as u8)
            .ok_or_else(|| CommandError::InvalidEnumValue {
                field: field.into(),
                value: text.to_string(),
            })
    }

    pub fn encode_symbol(&self, field: Field, value: u8) -> Result<&str, CommandError> {
        self.table(field)
            .get(value as usize)
            .copied()
            .ok_or_else(|| CommandError::InvalidEnumValue {
                field: field.into(),
                value: value.to_string(),
            })
    }

    pub fn validate_setpoint(&self, value: f64) -> Result<Setpoint, CommandError> {
        if !value.is_finite() {
            return Err(CommandError::NotNumeric(value.to_string()));
        }
        let out_of_range = || CommandError::OutOfRange {
            value,
            min: self.min,
            max: self.max,
        };
        if value < self.min || value > self.max {
            return Err(out_of_range());
        }

        // Bounds need not sit on the precision grid; pull back inside
        let mut setpoint = Setpoint::round(value, self.precision);
        let step = Setpoint::step(self.precision);
        if setpoint.celsius() > self.max {
            setpoint.0 -= step;
        } else if setpoint.celsius() < self.min {
            setpoint.0 += step;
        }

        if !self.contains(setpoint) {
            return Err(out_of_range());
        }
        Ok(setpoint)
    }

    fn contains(&self, setpoint: Setpoint) -> bool {
        (self.min..=self.max).contains(&setpoint.celsius())
    }

    pub fn parse_setpoint(&self, text: &str) -> Result<Setpoint, CommandError> {
        let value = text
            .trim()
            .parse::<f64>()
            .map_err(|_| CommandError::NotNumeric(text.to_string()))?;
        self.validate_setpoint(value)
    }

    pub fn system_mode(&self, text: &str) -> Result<SystemMode, CommandError> {
        text.trim()
            .parse()
            .map_err(|_| CommandError::InvalidEnumValue {
                field: "system_mode",
                value: text.to_string(),
            })
    }

    pub fn thermostat_mode(&self, text: &str) -> Result<ThermostatMode, CommandError> {
        text.trim()
            .parse()
            .map_err(|_| CommandError::InvalidEnumValue {
                field: "thermostat_enabled",
                value: text.to_string(),
            })
    }

    pub fn fan(&self, text: &str) -> Result<FanSpeed, CommandError> {
        let index = self.decode_symbol(Field::FanMode, text)?;
        FanSpeed::from_repr(index).ok_or_else(|| CommandError::InvalidEnumValue {
            field: Field::FanMode.into(),
            value: text.to_string(),
        })
    }

    pub fn spare(&self, text: &str) -> Result<Spare, CommandError> {
        let index = self.decode_symbol(Field::SpareFlag, text)?;
        Spare::from_repr(index).ok_or_else(|| CommandError::InvalidEnumValue {
            field: Field::SpareFlag.into(),
            value: text.to_string(),
        })
    }

    pub fn fan_label(&self, speed: FanSpeed) -> &str {
        &self.fan_labels[speed as usize]
    }
}

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::w100::{
    limiter::RateLimiter,
    thermostat_mode::{parse_identifier, IdentifierError},
    FieldCodec, FrameCodec, Precision,
};

fn default_min_target_temp() -> f64 {
    5.0
}

fn default_max_target_temp() -> f64 {
    30.0
}

fn default_fan_labels() -> [String; 4] {
    ["auto", "low", "medium", "high"].map(String::from)
}

fn default_frame_type() -> u8 {
    FrameCodec::DEFAULT_FRAME_TYPE
}

fn default_hub_id() -> String {
    "54ef4480711a".to_string()
}

fn default_min_send_interval_ms() -> u64 {
    RateLimiter::DEFAULT_INTERVAL_MS as u64
}

/// Per-device settings. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_min_target_temp")]
    pub min_target_temp: f64,

    #[serde(default = "default_max_target_temp")]
    pub max_target_temp: f64,

    #[serde(default)]
    pub precision: Precision,

    /// Labels for fan speeds 0 to 3
    #[serde(default = "default_fan_labels")]
    pub fan_labels: [String; 4],

    /// Third header byte of outbound PMTSD frames
    #[serde(default = "default_frame_type")]
    pub frame_type: u8,

    #[serde(default = "default_hub_id")]
    pub hub_id: String,

    #[serde(default = "default_min_send_interval_ms")]
    pub min_send_interval_ms: u64,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid target temperature bounds: min {min}, max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("fan labels must be distinct, {0:?} appears twice")]
    DuplicateFanLabel(String),

    #[error("frame type 0x08 would be mistaken for the payload marker")]
    InvalidFrameType,

    #[error("hub identifier contains the payload marker 08 44")]
    MarkerInHubId,

    #[error("invalid hub identifier: {0}")]
    HubIdentifier(#[from] IdentifierError),
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            min_target_temp: default_min_target_temp(),
            max_target_temp: default_max_target_temp(),
            precision: Precision::Whole,
            fan_labels: default_fan_labels(),
            frame_type: default_frame_type(),
            hub_id: default_hub_id(),
            min_send_interval_ms: default_min_send_interval_ms(),
        }
    }
}

impl DeviceConfig {
    /// Widest target temperature range the device accepts
    pub const TARGET_TEMP_LIMITS: (f64, f64) = (-20.0, 60.0);

    /// Earlier firmware profile: tenths of a degree, 15 to 30 °C, "middle" fan speed
    pub fn legacy() -> Self {
        Self {
            min_target_temp: 15.0,
            max_target_temp: 30.0,
            precision: Precision::Tenths,
            fan_labels: ["auto", "low", "middle", "high"].map(String::from),
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: DeviceConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_target_temp, self.max_target_temp);
        let (lowest, highest) = Self::TARGET_TEMP_LIMITS;
        if !(lowest..=highest).contains(&min) || !(lowest..=highest).contains(&max) || min > max {
            return Err(ConfigError::InvalidBounds { min, max });
        }

        let mut seen = HashSet::new();
        for label in &self.fan_labels {
            if !seen.insert(label.to_ascii_lowercase()) {
                return Err(ConfigError::DuplicateFanLabel(label.clone()));
            }
        }

        if self.frame_type == 0x08 {
            return Err(ConfigError::InvalidFrameType);
        }

        let hub = self.hub_address()?;
        if hub.windows(2).any(|w| w == [0x08, 0x44]) {
            return Err(ConfigError::MarkerInHubId);
        }
        Ok(())
    }

    pub fn hub_address(&self) -> Result<[u8; 6], IdentifierError> {
        parse_identifier(&self.hub_id)
    }

    pub fn min_send_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.min_send_interval_ms as i64)
    }

    pub fn field_codec(&self) -> FieldCodec {
        FieldCodec::new(
            self.precision,
            (self.min_target_temp, self.max_target_temp),
            self.fan_labels.clone(),
        )
    }
}

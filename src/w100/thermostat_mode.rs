use bytes::{BufMut, Bytes, BytesMut};
use hex_literal::hex;
use rand::Rng;
use thiserror::Error;

use super::fields::ThermostatMode;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentifierError {
    #[error("identifier must contain {expected} hexadecimal digits, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("invalid hex in identifier: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Parses a hardware identifier such as `0x54ef441000abcdef` or
/// `54:ef:44:80:71:1a` into exactly `N` bytes.
pub fn parse_identifier<const N: usize>(id: &str) -> Result<[u8; N], IdentifierError> {
    let id = id.trim();
    let id = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .unwrap_or(id);
    let cleaned: String = id.chars().filter(|c| !matches!(c, ':' | '-')).collect();

    if cleaned.len() != N * 2 {
        return Err(IdentifierError::WrongLength {
            expected: N * 2,
            found: cleaned.len(),
        });
    }

    let mut out = [0u8; N];
    hex::decode_to_slice(&cleaned, &mut out)?;
    Ok(out)
}

/// Builds the frames that switch the device's thermostat mode on or off.
/// These are independent of PMTSD: no checksum and no rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermostatModeChannel {
    device: [u8; 8],
    hub: [u8; 6],
}

impl ThermostatModeChannel {
    const ON_PREFIX: [u8; 4] = hex!("aa713244");
    const ON_HEADER: [u8; 5] = hex!("02412f6891");
    const ON_SEPARATOR: [u8; 2] = [0x00, 0x00];
    // Vendor enablement payload, opaque
    const ON_TAIL: [u8; 26] = hex!("08000844150a0109e7a9bae8b083e58a9f000000000001012a40");

    const OFF_PREFIX: [u8; 11] = hex!("aa711c44691c0441196891");
    const CONTROL: u8 = 0x18;

    pub const ON_LEN: usize = 56;
    pub const OFF_LEN: usize = 34;

    pub fn new(device_id: &str, hub_id: &str) -> Result<Self, IdentifierError> {
        Ok(Self {
            device: parse_identifier(device_id)?,
            hub: parse_identifier(hub_id)?,
        })
    }

    pub fn frame<R: Rng>(&self, mode: ThermostatMode, rng: &mut R) -> Bytes {
        match mode {
            ThermostatMode::On => self.on_frame(rng),
            ThermostatMode::Off => self.off_frame(rng),
        }
    }

    fn on_frame<R: Rng>(&self, rng: &mut R) -> Bytes {
        let mut b = BytesMut::with_capacity(Self::ON_LEN);
        b.put_slice(&Self::ON_PREFIX);
        b.put_slice(&rng.gen::<[u8; 2]>());
        b.put_slice(&Self::ON_HEADER);
        b.put_slice(&rng.gen::<[u8; 2]>());
        b.put_u8(Self::CONTROL);
        b.put_slice(&self.device);
        b.put_slice(&Self::ON_SEPARATOR);
        b.put_slice(&self.hub);
        b.put_slice(&Self::ON_TAIL);
        b.freeze()
    }

    fn off_frame<R: Rng>(&self, rng: &mut R) -> Bytes {
        let mut b = BytesMut::with_capacity(Self::OFF_LEN);
        b.put_slice(&Self::OFF_PREFIX);
        b.put_slice(&rng.gen::<[u8; 2]>());
        b.put_u8(Self::CONTROL);
        b.put_slice(&self.device);
        b.resize(Self::OFF_LEN, 0x00);
        b.freeze()
    }
}

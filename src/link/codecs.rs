use bytes::Bytes;
use thiserror::Error;

/// Text encodings for attribute buffers exchanged as lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CodecType {
    Base64,
    Hex,
}

pub trait Codec {
    type Error;

    fn decode(&self, input: &str) -> Result<Bytes, Self::Error>;
    fn encode(&self, buffer: &[u8]) -> String;
}

pub fn create_codec(ty: CodecType) -> Box<dyn Codec<Error = CodecError> + Send> {
    match ty {
        CodecType::Base64 => Box::new(Base64),
        CodecType::Hex => Box::new(Hex),
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode hex string: {0}")]
    HexDecodeError(#[from] hex::FromHexError),
    #[error("failed to decode base64 string: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),
    #[error("empty input")]
    EmptyInput,
}

pub struct Hex;
impl Codec for Hex {
    type Error = CodecError;

    // Accepts `0x` prefixes and byte separators as printed by sniffers
    fn decode(&self, input: &str) -> Result<Bytes, Self::Error> {
        let input = input.trim();
        let input = input.strip_prefix("0x").unwrap_or(input);
        let cleaned: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, ':' | '-'))
            .collect();

        let decoded = hex::decode(cleaned)?;
        if decoded.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        Ok(Bytes::from(decoded))
    }

    fn encode(&self, buffer: &[u8]) -> String {
        hex::encode(buffer)
    }
}

pub struct Base64;
impl Codec for Base64 {
    type Error = CodecError;

    fn decode(&self, input: &str) -> Result<Bytes, Self::Error> {
        let decoded = base64::decode(input.trim())?;
        if decoded.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        Ok(Bytes::from(decoded))
    }

    fn encode(&self, buffer: &[u8]) -> String {
        base64::encode(buffer)
    }
}

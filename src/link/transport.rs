use std::io::Write;

use bytes::Bytes;
use thiserror::Error;

use super::codecs::{create_codec, Codec, CodecError, CodecType};

/// Vendor cluster carrying the PMTSD attribute
pub const CLUSTER: u16 = 0xFCC0;
pub const ATTRIBUTE: u16 = 0xFFF2;
/// Octet string
pub const DATA_TYPE: u8 = 0x41;
pub const MANUFACTURER_CODE: u16 = 4447;

/// One write of the opaque vendor attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeWrite {
    pub cluster: u16,
    pub attribute: u16,
    pub data_type: u8,
    pub manufacturer_code: u16,
    pub disable_default_response: bool,
    pub value: Bytes,
}

impl AttributeWrite {
    pub fn new(value: Bytes) -> Self {
        Self {
            cluster: CLUSTER,
            attribute: ATTRIBUTE,
            data_type: DATA_TYPE,
            manufacturer_code: MANUFACTURER_CODE,
            disable_default_response: true,
            value,
        }
    }
}

/// The endpoint frames are written to. The core only cares whether a write
/// succeeded.
pub trait Transport {
    fn write(&mut self, write: &AttributeWrite) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, write: &AttributeWrite) -> Result<(), TransportError> {
        (**self).write(write)
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no writable endpoint")]
    Unavailable,

    #[error("codec error: {0}")]
    CodecError(#[from] CodecError),

    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),
}

/// Writes each attribute value as one encoded line
pub struct Lines {
    codec: Box<dyn Codec<Error = CodecError> + Send>,
    writer: Box<dyn Write + Send>,
}

impl Lines {
    pub fn new(codec_type: CodecType, writer: Box<dyn Write + Send>) -> Self {
        Self {
            codec: create_codec(codec_type),
            writer,
        }
    }
}

impl Transport for Lines {
    fn write(&mut self, write: &AttributeWrite) -> Result<(), TransportError> {
        let encoded = self.codec.encode(&write.value);
        writeln!(self.writer, "{}", encoded)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every write in memory, optionally refusing them
#[derive(Debug, Default)]
pub struct Recorder {
    pub writes: Vec<AttributeWrite>,
    pub unavailable: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_value(&self) -> Option<&Bytes> {
        self.writes.last().map(|w| &w.value)
    }
}

impl Transport for Recorder {
    fn write(&mut self, write: &AttributeWrite) -> Result<(), TransportError> {
        if self.unavailable {
            return Err(TransportError::Unavailable);
        }
        self.writes.push(write.clone());
        Ok(())
    }
}

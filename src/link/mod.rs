/*

Attribute link
--------------

Device <> Transport <> AttributeWrite(value: Bytes)

Lines: one hex/base64 encoded buffer per line, used by the CLI to sit
between a sniffer or a bridge and the PMTSD engine.

Recorder: keeps writes in memory, for dry runs and tests.

*/

pub mod codecs;
pub use codecs::{create_codec, Codec, CodecError, CodecType};

pub mod transport;
pub use transport::{AttributeWrite, Lines, Recorder, Transport, TransportError};

use bytes::{BufMut, Bytes, BytesMut};

use super::{
    fields::{FanSpeed, FieldCodec, Mode, Power, Precision, Setpoint, Spare, SystemMode},
    ClimateState,
};

/// The complete PMTSD state sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub power: Power,
    pub mode: Mode,
    pub temperature: Setpoint,
    pub speed: FanSpeed,
    pub spare: Spare,
}

impl Frame {
    pub fn system_mode(&self) -> SystemMode {
        SystemMode::from_wire(self.power, self.mode)
    }

    /// The ASCII payload, e.g. `P0_M1_T22_S0_D0`
    pub fn payload(&self, precision: Precision) -> String {
        format!(
            "P{}_M{}_T{}_S{}_D{}",
            self.power as u8,
            self.mode as u8,
            self.temperature.format(precision),
            self.speed as u8,
            self.spare as u8,
        )
    }

    /// Replaces every field present in `update`, leaving the others alone.
    pub fn overlay(&mut self, update: &FrameUpdate) {
        if let Some(power) = update.power {
            self.power = power;
        }
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
        if let Some(temperature) = update.temperature {
            self.temperature = temperature;
        }
        if let Some(speed) = update.speed {
            self.speed = speed;
        }
        if let Some(spare) = update.spare {
            self.spare = spare;
        }
    }
}

impl From<&ClimateState> for Frame {
    fn from(state: &ClimateState) -> Self {
        // When off, M still has to carry something: the mode to come back to.
        let (power, mode) = match state.system_mode.mode() {
            Some(mode) => (Power::On, mode),
            None => (Power::Off, state.memory.resolve()),
        };

        Frame {
            power,
            mode,
            temperature: state.setpoint,
            speed: state.fan,
            spare: state.spare,
        }
    }
}

/// One `<letter><value>` token accepted from a device payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    // Uppercased
    pub key: char,
    pub value: String,
    pub known: bool,
}

/// The sparse result of decoding a device report. Absent fields keep their
/// previous logical value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameUpdate {
    pub power: Option<Power>,
    pub mode: Option<Mode>,
    pub temperature: Option<Setpoint>,
    pub speed: Option<FanSpeed>,
    pub spare: Option<Spare>,
    /// Accepted tokens in wire order, including unknown letters
    pub tokens: Vec<Token>,
}

impl FrameUpdate {
    pub fn is_empty(&self) -> bool {
        self.power.is_none()
            && self.mode.is_none()
            && self.temperature.is_none()
            && self.speed.is_none()
            && self.spare.is_none()
    }

    /// Tokens with letters outside of PMTSD, kept for diagnostics only.
    pub fn extras(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| !t.known)
    }
}

impl From<Frame> for FrameUpdate {
    fn from(frame: Frame) -> Self {
        FrameUpdate {
            power: Some(frame.power),
            mode: Some(frame.mode),
            temperature: Some(frame.temperature),
            speed: Some(frame.speed),
            spare: Some(frame.spare),
            tokens: Vec::new(),
        }
    }
}

/// What an inbound attribute buffer turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The device asks the hub to send the current PMTSD state
    SyncRequest,
    Report(FrameUpdate),
    /// No PMTSD payload in the buffer
    Unrelated,
}

/*
Offset  Contents
0x00    0xAA 0x71 magic
0x02    frame type marker (0x1F), 0x44
0x04    transaction counter, random
0x05    checksum: sum of every other byte, mod 256
0x06    0x05 0x41 0x1C
0x09    0x00 0x00
0x0B    hub identifier, 6 bytes
0x11    0x08 0x00 0x08 0x44 command marker
0x15    payload length
0x16    ASCII payload
 */
#[derive(Debug, Clone)]
pub struct FrameCodec {
    fields: FieldCodec,
    frame_type: u8,
    hub: [u8; 6],
}

impl FrameCodec {
    const MAGIC: [u8; 2] = [0xAA, 0x71];
    const TYPE_SUFFIX: u8 = 0x44;
    const SUB_HEADER: [u8; 3] = [0x05, 0x41, 0x1C];
    const RESERVED: [u8; 2] = [0x00, 0x00];
    const COMMAND_MARKER: [u8; 4] = [0x08, 0x00, 0x08, 0x44];
    // Device reports only carry the tail of the command marker
    const REPORT_MARKER: [u8; 2] = [0x08, 0x44];

    pub const HEADER_LEN: usize = 22;
    pub const COUNTER_OFFSET: usize = 4;
    pub const CHECKSUM_OFFSET: usize = 5;
    pub const DEFAULT_FRAME_TYPE: u8 = 0x1F;

    pub fn new(fields: FieldCodec, frame_type: u8, hub: [u8; 6]) -> Self {
        Self {
            fields,
            frame_type,
            hub,
        }
    }

    /// Builds the full frame. `counter` is written as given unless it would
    /// form a false payload marker with the checksum, in which case the next
    /// value is used.
    pub fn encode(&self, frame: &Frame, counter: u8) -> Bytes {
        let payload = frame.payload(self.fields.precision());

        let mut b = BytesMut::with_capacity(Self::HEADER_LEN + payload.len());
        b.put_slice(&Self::MAGIC);
        b.put_u8(self.frame_type);
        b.put_u8(Self::TYPE_SUFFIX);
        b.put_u8(counter);
        b.put_u8(0);
        b.put_slice(&Self::SUB_HEADER);
        b.put_slice(&Self::RESERVED);
        b.put_slice(&self.hub);
        b.put_slice(&Self::COMMAND_MARKER);
        b.put_u8(payload.len() as u8);
        b.put_slice(payload.as_bytes());

        b[Self::CHECKSUM_OFFSET] = checksum(&b);

        // Counter 0x08 followed by checksum 0x44 reads as a payload marker
        if b[Self::COUNTER_OFFSET..=Self::CHECKSUM_OFFSET] == Self::REPORT_MARKER {
            b[Self::COUNTER_OFFSET] += 1;
            b[Self::CHECKSUM_OFFSET] = b[Self::CHECKSUM_OFFSET].wrapping_add(1);
        }
        b.freeze()
    }

    pub fn classify(&self, data: &[u8]) -> Inbound {
        if data.ends_with(&Self::COMMAND_MARKER) {
            return Inbound::SyncRequest;
        }

        match self.decode(data) {
            Some(update) => Inbound::Report(update),
            None => Inbound::Unrelated,
        }
    }

    /// Extracts the PMTSD payload from a device report. The marker may sit at
    /// any offset; None means there is no usable payload.
    pub fn decode(&self, data: &[u8]) -> Option<FrameUpdate> {
        let idx = data
            .windows(Self::REPORT_MARKER.len())
            .position(|w| w == Self::REPORT_MARKER)?;
        if idx + 2 >= data.len() {
            return None;
        }

        let len = data[idx + 2] as usize;
        let start = idx + 3;
        let payload = data.get(start..start + len)?;
        if !payload.is_ascii() {
            return None;
        }

        let text = std::str::from_utf8(payload).ok()?;
        Some(self.parse_payload(text))
    }

    pub fn parse_payload(&self, text: &str) -> FrameUpdate {
        let mut update = FrameUpdate::default();

        for part in text.split('_') {
            let mut chars = part.chars();
            let letter = match chars.next() {
                Some(letter) => letter,
                None => continue,
            };
            let value = chars.as_str();
            if value.is_empty() {
                continue;
            }

            let key = letter.to_ascii_lowercase();
            let known = "pmtsd".contains(key);
            if known && !self.apply_token(&mut update, key, value) {
                tracing::warn!(token = part, "dropping invalid PMTSD token");
                continue;
            }

            update.tokens.push(Token {
                key: letter.to_ascii_uppercase(),
                value: value.to_string(),
                known,
            });
        }

        update
    }

    fn apply_token(&self, update: &mut FrameUpdate, key: char, value: &str) -> bool {
        let index = value.parse::<u8>().ok();
        match key {
            'p' => match index.and_then(Power::from_repr) {
                Some(power) => update.power = Some(power),
                None => return false,
            },
            'm' => match index.and_then(Mode::from_repr) {
                Some(mode) => update.mode = Some(mode),
                None => return false,
            },
            's' => match index.and_then(FanSpeed::from_repr) {
                Some(speed) => update.speed = Some(speed),
                None => return false,
            },
            'd' => match index.and_then(Spare::from_repr) {
                Some(spare) => update.spare = Some(spare),
                None => return false,
            },
            't' => match self.fields.parse_setpoint(value) {
                Ok(temperature) => update.temperature = Some(temperature),
                Err(_) => return false,
            },
            _ => return false,
        }
        true
    }
}

pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

use serde::{Deserialize, Serialize};

use super::fields::Mode;

/// Remembers the last operating mode the device was in before it was
/// switched off, so powering on without a mode restores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeMemory {
    last: Option<Mode>,
}

impl ModeMemory {
    // Used when no mode was ever observed
    pub const FALLBACK: Mode = Mode::Cool;

    pub fn record_active(&mut self, mode: Mode) {
        self.last = Some(mode);
    }

    pub fn resolve(&self) -> Mode {
        self.last.unwrap_or(Self::FALLBACK)
    }

    pub fn last(&self) -> Option<Mode> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_cool() {
        let memory = ModeMemory::default();
        assert_eq!(memory.last(), None);
        assert_eq!(memory.resolve(), Mode::Cool);
    }

    #[test]
    fn test_keeps_latest_mode() {
        let mut memory = ModeMemory::default();
        memory.record_active(Mode::Heat);
        memory.record_active(Mode::Auto);
        assert_eq!(memory.resolve(), Mode::Auto);
    }
}

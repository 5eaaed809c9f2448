use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use chrono::{DateTime, Local};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::{
    config::{ConfigError, DeviceConfig},
    link::{AttributeWrite, Transport, TransportError},
    w100::{
        ClimateState, Command, CommandError, Frame, FrameCodec, FrameUpdate, Inbound, Outbound,
        RateLimiter, Reconciler, StateUpdate, ThermostatMode, ThermostatModeChannel,
    },
};

/// Published when the device asks for the current PMTSD state
pub const SYNC_REQUEST_ACTION: &str = "W100_PMTSD_request";

pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// What happened to the frame produced by a command
#[derive(Debug)]
pub enum Transmission {
    Sent(Bytes),
    /// Nothing changed and the last frame is recent
    Throttled,
    /// The command was ignored before reaching the wire
    Skipped,
    /// State was updated but the write failed; it is retried with the next change
    Failed(TransportError),
}

#[derive(Debug)]
pub struct CommandReport {
    pub update: StateUpdate,
    pub transmission: Transmission,
}

/// Owns everything known about one physical device. Inbound reports and
/// outbound commands both take `&mut self`, so they never interleave.
pub struct Device<T: Transport> {
    id: String,
    config: DeviceConfig,
    state: ClimateState,
    frames: FrameCodec,
    reconciler: Reconciler,
    transport: T,
    clock: Box<dyn Clock + Send>,
    rng: StdRng,
    span: tracing::Span,
}

impl<T: Transport> Device<T> {
    pub fn new(id: impl Into<String>, config: DeviceConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;

        let id = id.into();
        let fields = config.field_codec();
        let frames = FrameCodec::new(fields.clone(), config.frame_type, config.hub_address()?);
        let reconciler = Reconciler::new(fields, RateLimiter::new(config.min_send_interval()));
        let span = tracing::info_span!("w100", device = %id);

        Ok(Self {
            id,
            config,
            state: ClimateState::default(),
            frames,
            reconciler,
            transport,
            clock: Box::new(SystemClock),
            rng: StdRng::from_entropy(),
            span,
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Restores a previously persisted state
    pub fn with_state(mut self, state: ClimateState) -> Self {
        self.state = state;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &ClimateState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// First contact: the state is already seeded with defaults, make sure the
    /// device itself is out of thermostat mode. A failed write is logged and
    /// the seeded defaults are still published.
    pub fn configure(&mut self) -> StateUpdate {
        let span = self.span.clone();
        let _enter = span.enter();

        match self.set_thermostat_mode(ThermostatMode::Off) {
            Ok(_) => info!("configured, thermostat mode OFF"),
            Err(err) => warn!(%err, "failed to send initial thermostat mode OFF"),
        }

        StateUpdate {
            thermostat_mode: Some(self.thermostat_mode()),
            ..self.snapshot()
        }
    }

    /// Processes one buffer read from the vendor attribute.
    pub fn handle_report(&mut self, data: &[u8]) -> StateUpdate {
        let span = self.span.clone();
        let _enter = span.enter();
        let now = self.clock.now();

        match self.frames.classify(data) {
            Inbound::SyncRequest => {
                info!("PMTSD request received");
                let sync = Command::Sync(FrameUpdate::from(Frame::from(&self.state)));
                match self.reconciler.apply_outbound(&mut self.state, &sync, now) {
                    Ok(outbound) => {
                        self.dispatch(&outbound, now);
                    }
                    Err(err) => error!(%err, "failed to answer PMTSD request"),
                }

                StateUpdate {
                    action: Some(SYNC_REQUEST_ACTION.to_string()),
                    ..StateUpdate::default()
                }
            }
            Inbound::Report(update) => {
                if update.is_empty() {
                    debug!("report carries no usable PMTSD field");
                }
                let outcome = self.reconciler.apply_inbound(&mut self.state, &update, now);
                for extra in update.extras() {
                    debug!(key = %extra.key, value = %extra.value, "ignoring unknown PMTSD field");
                }
                info!(
                    diagnostic = %outcome.diagnostic,
                    system_mode = %self.state.system_mode,
                    "PMTSD decoded"
                );

                let fields = self.reconciler.fields();
                StateUpdate {
                    system_mode: Some(self.state.system_mode),
                    setpoint: update.temperature.map(|t| t.celsius()),
                    fan_mode: update.speed.map(|s| fields.fan_label(s).to_string()),
                    spare_flag: update.spare,
                    diagnostic: Some(outcome.diagnostic),
                    ..StateUpdate::default()
                }
            }
            Inbound::Unrelated => StateUpdate::default(),
        }
    }

    /// Built-in sensor reading in hundredths of a degree
    pub fn handle_temperature(&mut self, measured: i16) -> StateUpdate {
        let span = self.span.clone();
        let _enter = span.enter();
        let temperature = measured as f64 / 100.0;
        self.state.local_temperature = Some(temperature);
        debug!(temperature, "local temperature");

        StateUpdate {
            temperature: Some(temperature),
            local_temperature: Some(temperature),
            ..StateUpdate::default()
        }
    }

    pub fn handle_command(&mut self, command: Command) -> Result<CommandReport, CommandError> {
        let span = self.span.clone();
        let _enter = span.enter();

        if let Command::ThermostatMode(value) = &command {
            let mode = self.reconciler.fields().thermostat_mode(value)?;
            let frame = self.write_thermostat_mode(mode)?;
            return Ok(CommandReport {
                update: StateUpdate {
                    thermostat_mode: Some(mode),
                    ..StateUpdate::default()
                },
                transmission: Transmission::Sent(frame),
            });
        }

        let now = self.clock.now();
        match self.reconciler.apply_outbound(&mut self.state, &command, now) {
            Ok(outbound) => {
                info!(
                    command = command.key(),
                    pmtsd = %outbound.frame.payload(self.config.precision),
                    changed = outbound.changed,
                    "processed command"
                );
                let transmission = self.dispatch(&outbound, now);
                Ok(CommandReport {
                    update: self.snapshot(),
                    transmission,
                })
            }
            Err(CommandError::ThermostatDisabled(key)) => {
                warn!(command = key, "ignoring command, thermostat mode is not ON");
                Ok(CommandReport {
                    update: StateUpdate::default(),
                    transmission: Transmission::Skipped,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Writes the thermostat mode frame right away. The flag only changes once
    /// the device has accepted the write.
    pub fn set_thermostat_mode(&mut self, mode: ThermostatMode) -> Result<StateUpdate, CommandError> {
        self.write_thermostat_mode(mode)?;
        Ok(StateUpdate {
            thermostat_mode: Some(mode),
            ..StateUpdate::default()
        })
    }

    fn write_thermostat_mode(&mut self, mode: ThermostatMode) -> Result<Bytes, CommandError> {
        let channel = ThermostatModeChannel::new(&self.id, &self.config.hub_id)?;
        let frame = channel.frame(mode, &mut self.rng);
        debug!(frame = %hex::encode(&frame), "thermostat mode frame");

        if let Err(err) = self.transport.write(&AttributeWrite::new(frame.clone())) {
            error!(%err, %mode, "failed to write thermostat mode");
            return Err(err.into());
        }

        self.state.thermostat_enabled = mode == ThermostatMode::On;
        info!(%mode, "thermostat mode set");
        Ok(frame)
    }

    /// Current value of one logical field, by its command name
    pub fn read_field(&self, key: &str) -> Result<StateUpdate, CommandError> {
        let snapshot = self.snapshot();
        let mut update = StateUpdate::default();
        match key {
            "system_mode" => update.system_mode = snapshot.system_mode,
            "setpoint" | "occupied_heating_setpoint" => update.setpoint = snapshot.setpoint,
            "fan_mode" => update.fan_mode = snapshot.fan_mode,
            "spare_flag" | "unused" => update.spare_flag = snapshot.spare_flag,
            "thermostat_enabled" | "thermostat_mode" => {
                update.thermostat_mode = Some(self.thermostat_mode())
            }
            "local_temperature" => update.local_temperature = self.state.local_temperature,
            _ => return Err(CommandError::UnknownCommand(key.to_string())),
        }
        Ok(update)
    }

    fn thermostat_mode(&self) -> ThermostatMode {
        if self.state.thermostat_enabled {
            ThermostatMode::On
        } else {
            ThermostatMode::Off
        }
    }

    fn snapshot(&self) -> StateUpdate {
        StateUpdate {
            system_mode: Some(self.state.system_mode),
            setpoint: Some(self.state.setpoint.celsius()),
            fan_mode: Some(self.reconciler.fields().fan_label(self.state.fan).to_string()),
            spare_flag: Some(self.state.spare),
            ..StateUpdate::default()
        }
    }

    fn dispatch(&mut self, outbound: &Outbound, now: DateTime<Local>) -> Transmission {
        let payload = outbound.frame.payload(self.config.precision);
        if !outbound.transmit {
            debug!(%payload, "PMTSD frame not sent: no change and sent recently");
            return Transmission::Throttled;
        }

        let frame = self.frames.encode(&outbound.frame, self.rng.gen());
        match self.transport.write(&AttributeWrite::new(frame.clone())) {
            Ok(()) => {
                self.state.record_transmit(now);
                info!(%payload, "PMTSD frame sent");
                Transmission::Sent(frame)
            }
            Err(err) => {
                error!(%err, %payload, "failed to send PMTSD frame");
                Transmission::Failed(err)
            }
        }
    }
}

/// A device behind a mutex, for callers that deliver reports and commands
/// from different threads.
pub struct SharedDevice<T: Transport>(Arc<Mutex<Device<T>>>);

impl<T: Transport> Clone for SharedDevice<T> {
    fn clone(&self) -> Self {
        SharedDevice(self.0.clone())
    }
}

impl<T: Transport> SharedDevice<T> {
    pub fn new(device: Device<T>) -> Self {
        SharedDevice(Arc::new(Mutex::new(device)))
    }

    // A panic mid-update leaves the state as it was last written, which is
    // still a valid state.
    pub fn lock(&self) -> MutexGuard<'_, Device<T>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn handle_report(&self, data: &[u8]) -> StateUpdate {
        self.lock().handle_report(data)
    }

    pub fn handle_command(&self, command: Command) -> Result<CommandReport, CommandError> {
        self.lock().handle_command(command)
    }

    pub fn state(&self) -> ClimateState {
        self.lock().state().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::{Duration, TimeZone};
    use hex_literal::hex;

    use super::*;
    use crate::{
        link::Recorder,
        w100::{frame::checksum, Mode, Setpoint, SystemMode},
    };

    const DEVICE_ID: &str = "0x54ef441000a1b2c3";

    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<DateTime<Local>>>);

    impl ManualClock {
        fn new() -> Self {
            ManualClock(Arc::new(Mutex::new(
                Local.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
            )))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Local> {
            *self.0.lock().unwrap()
        }
    }

    fn device(clock: &ManualClock) -> Device<Recorder> {
        Device::new(DEVICE_ID, DeviceConfig::default(), Recorder::new())
            .unwrap()
            .with_clock(clock.clone())
            .with_rng(StdRng::seed_from_u64(7))
    }

    fn enabled(clock: &ManualClock) -> Device<Recorder> {
        let mut device = device(clock);
        device
            .handle_command(Command::ThermostatMode("ON".into()))
            .unwrap();
        device.transport_mut().writes.clear();
        device
    }

    fn payload(frame: &[u8]) -> &[u8] {
        &frame[FrameCodec::HEADER_LEN..]
    }

    #[test]
    fn test_heat_from_off() {
        let clock = ManualClock::new();
        let mut device = enabled(&clock);

        let report = device
            .handle_command(Command::SystemMode("heat".into()))
            .unwrap();

        let frame = match report.transmission {
            Transmission::Sent(frame) => frame,
            other => panic!("expected a frame, got {:?}", other),
        };
        assert_eq!(payload(&frame), b"P0_M1_T15_S0_D0");
        assert_eq!(device.transport().writes.len(), 1);
        assert_eq!(device.transport().last_value(), Some(&frame));

        assert_eq!(report.update.system_mode, Some(SystemMode::Heat));
        assert_eq!(report.update.setpoint, Some(15.0));
        assert_eq!(report.update.fan_mode.as_deref(), Some("auto"));
        assert_eq!(device.state().memory.last(), Some(Mode::Heat));
        assert_eq!(device.state().last_transmit, Some(clock.now()));
    }

    #[test]
    fn test_frames_are_checksummed() {
        let clock = ManualClock::new();
        let mut device = enabled(&clock);
        device.handle_command(Command::Setpoint(21.0)).unwrap();

        let mut frame = device.transport().last_value().unwrap().to_vec();
        let sum = frame[FrameCodec::CHECKSUM_OFFSET];
        frame[FrameCodec::CHECKSUM_OFFSET] = 0;
        assert_eq!(sum, checksum(&frame));
    }

    #[test]
    fn test_rate_limit() {
        let clock = ManualClock::new();
        let mut device = enabled(&clock);

        device.handle_command(Command::FanMode("low".into())).unwrap();
        clock.advance(Duration::milliseconds(100));
        let repeat = device.handle_command(Command::FanMode("low".into())).unwrap();
        assert!(matches!(repeat.transmission, Transmission::Throttled));
        assert_eq!(device.transport().writes.len(), 1);

        clock.advance(Duration::milliseconds(100));
        device.handle_command(Command::FanMode("high".into())).unwrap();
        assert_eq!(device.transport().writes.len(), 2);

        clock.advance(Duration::seconds(5));
        device.handle_command(Command::FanMode("high".into())).unwrap();
        assert_eq!(device.transport().writes.len(), 3);
    }

    #[test]
    fn test_disabled_gate() {
        let clock = ManualClock::new();
        let mut device = device(&clock);

        let report = device
            .handle_command(Command::FanMode("high".into()))
            .unwrap();
        assert!(report.update.is_empty());
        assert!(matches!(report.transmission, Transmission::Skipped));
        assert!(device.transport().writes.is_empty());
    }

    #[test]
    fn test_validation_errors_propagate() {
        let clock = ManualClock::new();
        let mut device = enabled(&clock);

        assert!(matches!(
            device.handle_command(Command::Setpoint(30.1)),
            Err(CommandError::OutOfRange { .. })
        ));
        assert!(matches!(
            device.handle_command(Command::SystemMode("dry".into())),
            Err(CommandError::InvalidEnumValue { .. })
        ));
        assert!(matches!(
            device.handle_command(Command::ThermostatMode("maybe".into())),
            Err(CommandError::InvalidEnumValue { .. })
        ));
        assert!(device.transport().writes.is_empty());
    }

    #[test]
    fn test_transport_failure_keeps_state() {
        let clock = ManualClock::new();
        let mut device = enabled(&clock);
        device.transport_mut().unavailable = true;

        let report = device.handle_command(Command::Setpoint(24.0)).unwrap();
        assert!(matches!(
            report.transmission,
            Transmission::Failed(TransportError::Unavailable)
        ));
        assert_eq!(device.state().setpoint, Setpoint::from_degrees(24));
        assert_eq!(device.state().last_transmit, None);

        // Nothing changed, but the failed frame is retried right away
        device.transport_mut().unavailable = false;
        clock.advance(Duration::milliseconds(100));
        let report = device.handle_command(Command::Setpoint(24.0)).unwrap();
        assert!(matches!(report.transmission, Transmission::Sent(_)));
        assert_eq!(device.state().last_transmit, Some(clock.now()));
    }

    #[test]
    fn test_sync_request() {
        let clock = ManualClock::new();
        let mut device = device(&clock);

        let update = device.handle_report(&hex!("aa71 0c44 1234 0541 08000844"));
        assert_eq!(update.action.as_deref(), Some(SYNC_REQUEST_ACTION));

        // Answered even with thermostat mode off, from the seeded defaults
        let frame = device.transport().last_value().unwrap();
        assert_eq!(payload(frame), b"P1_M0_T15_S0_D0");
    }

    #[test]
    fn test_partial_report() {
        let clock = ManualClock::new();
        let mut device = enabled(&clock);
        device.handle_command(Command::SystemMode("auto".into())).unwrap();
        device.handle_command(Command::FanMode("medium".into())).unwrap();
        let writes = device.transport().writes.len();

        let mut report = hex!("aa71 1a44 0102 0341 08 44 03").to_vec();
        report.extend_from_slice(b"T22");
        let update = device.handle_report(&report);

        assert_eq!(update.setpoint, Some(22.0));
        assert_eq!(update.system_mode, Some(SystemMode::Auto));
        assert_eq!(update.fan_mode, None);
        assert_eq!(update.diagnostic.as_deref(), Some("2024-06-01 08:30:00_TW22"));
        assert_eq!(device.state().system_mode, SystemMode::Auto);
        assert_eq!(device.state().setpoint, Setpoint::from_degrees(22));
        // Reports are never echoed back
        assert_eq!(device.transport().writes.len(), writes);
    }

    #[test]
    fn test_report_with_unknown_fields() {
        let clock = ManualClock::new();
        let mut device = device(&clock);

        let text = b"P0_M1_T19_S2_D0_B1";
        let mut report = hex!("0844").to_vec();
        report.push(text.len() as u8);
        report.extend_from_slice(text);
        let update = device.handle_report(&report);

        assert_eq!(update.system_mode, Some(SystemMode::Heat));
        assert_eq!(update.fan_mode.as_deref(), Some("medium"));
        assert_eq!(
            update.diagnostic.as_deref(),
            Some("2024-06-01 08:30:00_PW0_MW1_TW19_SW2_DW0_BW1")
        );
        assert_eq!(device.state().memory.last(), Some(Mode::Heat));
    }

    #[test]
    fn test_unrelated_report() {
        let clock = ManualClock::new();
        let mut device = device(&clock);
        assert!(device.handle_report(&hex!("0102030405")).is_empty());
        assert_eq!(device.state(), &ClimateState::default());
    }

    #[test]
    fn test_mode_memory_across_power_cycle() {
        let clock = ManualClock::new();
        let mut device = enabled(&clock);

        device.handle_command(Command::SystemMode("heat".into())).unwrap();
        device.handle_command(Command::SystemMode("off".into())).unwrap();
        assert_eq!(device.state().system_mode, SystemMode::Off);

        // Device reports power on without a mode
        let mut report = hex!("0844 02").to_vec();
        report.extend_from_slice(b"P0");
        device.handle_report(&report);
        assert_eq!(device.state().system_mode, SystemMode::Heat);
    }

    #[test]
    fn test_thermostat_mode() {
        let clock = ManualClock::new();
        let mut device = device(&clock);

        let report = device
            .handle_command(Command::ThermostatMode("ON".into()))
            .unwrap();
        assert_eq!(report.update.thermostat_mode, Some(ThermostatMode::On));
        assert!(device.state().thermostat_enabled);
        assert_eq!(
            device.transport().last_value().unwrap().len(),
            ThermostatModeChannel::ON_LEN
        );

        // Not rate limited
        device.set_thermostat_mode(ThermostatMode::On).unwrap();
        assert_eq!(device.transport().writes.len(), 2);
    }

    #[test]
    fn test_thermostat_mode_failures() {
        let clock = ManualClock::new();
        let mut device = Device::new("0x1234", DeviceConfig::default(), Recorder::new())
            .unwrap()
            .with_clock(clock.clone());
        assert!(matches!(
            device.set_thermostat_mode(ThermostatMode::On),
            Err(CommandError::MalformedIdentifier(_))
        ));
        assert!(!device.state().thermostat_enabled);

        let mut device = self::device(&clock);
        device.transport_mut().unavailable = true;
        assert!(matches!(
            device.set_thermostat_mode(ThermostatMode::On),
            Err(CommandError::Transport(TransportError::Unavailable))
        ));
        assert!(!device.state().thermostat_enabled);
    }

    #[test]
    fn test_configure() {
        let clock = ManualClock::new();
        let mut device = device(&clock);

        let update = device.configure();
        assert_eq!(update.thermostat_mode, Some(ThermostatMode::Off));
        assert_eq!(update.system_mode, Some(SystemMode::Off));
        assert_eq!(update.setpoint, Some(15.0));
        assert_eq!(
            device.transport().last_value().unwrap().len(),
            ThermostatModeChannel::OFF_LEN
        );
    }

    #[test]
    fn test_configure_survives_write_failure() {
        let clock = ManualClock::new();
        let mut device = device(&clock);
        device.transport_mut().unavailable = true;

        let update = device.configure();
        assert_eq!(update.thermostat_mode, Some(ThermostatMode::Off));
        assert_eq!(update.system_mode, Some(SystemMode::Off));
        assert_eq!(update.setpoint, Some(15.0));
        assert_eq!(update.fan_mode.as_deref(), Some("auto"));
        assert!(device.transport().writes.is_empty());
        assert_eq!(device.state(), &ClimateState::default());
    }

    #[test]
    fn test_temperature_and_reads() {
        let clock = ManualClock::new();
        let mut device = device(&clock);

        let update = device.handle_temperature(2150);
        assert_eq!(update.temperature, Some(21.5));
        assert_eq!(update.local_temperature, Some(21.5));

        let read = device.read_field("local_temperature").unwrap();
        assert_eq!(read.local_temperature, Some(21.5));
        let read = device.read_field("fan_mode").unwrap();
        assert_eq!(read.fan_mode.as_deref(), Some("auto"));
        assert_eq!(read.system_mode, None);
        let read = device.read_field("thermostat_enabled").unwrap();
        assert_eq!(read.thermostat_mode, Some(ThermostatMode::Off));
        assert!(device.read_field("humidity").is_err());
    }

    #[test]
    fn test_state_update_json() {
        let clock = ManualClock::new();
        let mut device = enabled(&clock);
        let report = device.handle_command(Command::Spare("1".into())).unwrap();

        let json = serde_json::to_value(&report.update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "system_mode": "off",
                "setpoint": 15.0,
                "fan_mode": "auto",
                "spare_flag": "1",
            })
        );
    }

    #[test]
    fn test_restored_state() {
        let clock = ManualClock::new();
        let mut state = ClimateState {
            thermostat_enabled: true,
            system_mode: SystemMode::Auto,
            ..ClimateState::default()
        };
        state.memory.record_active(Mode::Auto);

        let json = serde_json::to_string(&state).unwrap();
        let restored: ClimateState = serde_json::from_str(&json).unwrap();
        let mut device = device(&clock).with_state(restored);

        device.handle_command(Command::SystemMode("off".into())).unwrap();
        let frame = device.transport().last_value().unwrap();
        assert_eq!(payload(frame), b"P1_M2_T15_S0_D0");
    }

    #[test]
    fn test_shared_device_serializes_access() {
        let clock = ManualClock::new();
        let shared = SharedDevice::new(enabled(&clock));

        let handles: Vec<_> = ["cool", "heat", "auto", "off"]
            .into_iter()
            .map(|mode| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        shared
                            .handle_command(Command::SystemMode(mode.to_string()))
                            .unwrap();
                        let mut report = hex!("0844 05").to_vec();
                        report.extend_from_slice(format!("P0_M{}", i % 3).as_bytes());
                        shared.handle_report(&report);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let state = shared.state();
        if let Some(mode) = state.system_mode.mode() {
            assert_eq!(state.memory.last(), Some(mode));
        }

        let device = shared.lock();
        assert_eq!(device.id(), DEVICE_ID);
        let frames = FrameCodec::new(
            DeviceConfig::default().field_codec(),
            FrameCodec::DEFAULT_FRAME_TYPE,
            DeviceConfig::default().hub_address().unwrap(),
        );
        for write in &device.transport().writes {
            let update = frames.decode(&write.value).unwrap();
            assert!(update.power.is_some() && update.mode.is_some());
        }
    }
}

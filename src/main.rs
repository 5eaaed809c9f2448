use std::{
    fs::File,
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use hexplay::HexViewBuilder;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use pmtsd::{
    config::DeviceConfig,
    device::Device,
    link::{create_codec, CodecType, Lines, Recorder, Transport},
    w100::{
        ClimateState, Command, Frame, FrameCodec, RateLimiter, Reconciler, ThermostatMode,
        ThermostatModeChannel,
    },
};

#[derive(Parser, Debug)]
#[command(about = "PMTSD bridge for W100 climate sensors")]
struct Args {
    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drives one device from stdin.
    ///
    /// Lines starting with `{` are commands (`{"system_mode": "heat"}`), other
    /// lines are encoded attribute reports. State updates are printed as JSON,
    /// outbound frames as encoded lines.
    Decode {
        #[arg(long)]
        device_id: String,

        #[arg(long, value_enum, default_value_t = CodecType::Hex)]
        codec: CodecType,

        /// Device config (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use the earlier firmware profile when no config is given
        #[arg(long)]
        legacy: bool,

        /// Climate state to restore on start and save on exit
        #[arg(long)]
        state: Option<PathBuf>,

        /// Send thermostat mode OFF before reading input
        #[arg(long)]
        configure: bool,

        /// Keep outbound frames in memory instead of printing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Builds one PMTSD frame
    Encode {
        #[arg(long, default_value = "off")]
        system_mode: String,

        #[arg(long)]
        setpoint: Option<f64>,

        #[arg(long)]
        fan: Option<String>,

        #[arg(long)]
        spare: Option<String>,

        #[arg(long, default_value_t = 0)]
        counter: u8,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Print a hex dump instead of a single line
        #[arg(long)]
        dump: bool,
    },

    /// Builds a thermostat mode frame
    ThermostatMode {
        #[arg(long)]
        device_id: String,

        #[arg(long, default_value = "54ef4480711a")]
        hub_id: String,

        mode: String,

        #[arg(long)]
        seed: Option<u64>,
    },
}

fn load_config(path: Option<&PathBuf>, legacy: bool) -> anyhow::Result<DeviceConfig> {
    match path {
        Some(path) => DeviceConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None if legacy => Ok(DeviceConfig::legacy()),
        None => Ok(DeviceConfig::default()),
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

fn run<T: Transport>(
    mut device: Device<T>,
    codec: CodecType,
    configure: bool,
) -> anyhow::Result<ClimateState> {
    tracing::info!(device = device.id(), "reading commands and reports from stdin");
    if configure {
        print_json(&device.configure())?;
    }

    let codec = create_codec(codec);
    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('{') {
            let commands: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(line).context("parsing command")?;
            for (key, value) in &commands {
                let result = Command::from_key_value(key, value)
                    .and_then(|command| device.handle_command(command));
                match result {
                    Ok(report) if !report.update.is_empty() => print_json(&report.update)?,
                    Ok(_) => {}
                    Err(err) => tracing::error!(%err, key = %key, "command rejected"),
                }
            }
            continue;
        }

        match codec.decode(line) {
            Ok(data) => {
                let update = device.handle_report(&data);
                if !update.is_empty() {
                    print_json(&update)?;
                }
            }
            Err(err) => tracing::warn!(%err, "skipping undecodable line"),
        }
    }

    Ok(device.state().clone())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    match args.command {
        Commands::Decode {
            device_id,
            codec,
            config,
            legacy,
            state,
            configure,
            dry_run,
        } => {
            let config = load_config(config.as_ref(), legacy)?;
            let restored = match &state {
                Some(path) if path.exists() => {
                    let file = File::open(path)
                        .with_context(|| format!("opening state {}", path.display()))?;
                    Some(serde_json::from_reader::<_, ClimateState>(file)?)
                }
                _ => None,
            };

            let final_state = if dry_run {
                let mut device = Device::new(device_id, config, Recorder::new())?;
                if let Some(restored) = restored {
                    device = device.with_state(restored);
                }
                run(device, codec, configure)?
            } else {
                let transport = Lines::new(codec, Box::new(io::stdout()));
                let mut device = Device::new(device_id, config, transport)?;
                if let Some(restored) = restored {
                    device = device.with_state(restored);
                }
                run(device, codec, configure)?
            };

            if let Some(path) = state {
                let file = File::create(&path)
                    .with_context(|| format!("saving state to {}", path.display()))?;
                serde_json::to_writer_pretty(file, &final_state)?;
            }
        }

        Commands::Encode {
            system_mode,
            setpoint,
            fan,
            spare,
            counter,
            config,
            dump,
        } => {
            let config = load_config(config.as_ref(), false)?;
            let fields = config.field_codec();
            let codec = FrameCodec::new(fields.clone(), config.frame_type, config.hub_address()?);
            let reconciler = Reconciler::new(fields, RateLimiter::default());

            let mut state = ClimateState {
                thermostat_enabled: true,
                ..ClimateState::default()
            };
            let mut commands = vec![Command::SystemMode(system_mode)];
            commands.extend(setpoint.map(Command::Setpoint));
            commands.extend(fan.map(Command::FanMode));
            commands.extend(spare.map(Command::Spare));

            let now = chrono::Local::now();
            for command in &commands {
                reconciler.apply_outbound(&mut state, command, now)?;
            }

            let frame = codec.encode(&Frame::from(&state), counter);
            if dump {
                println!("{}", HexViewBuilder::new(&frame).row_width(16).finish());
            } else {
                println!("{}", hex::encode(&frame));
            }
        }

        Commands::ThermostatMode {
            device_id,
            hub_id,
            mode,
            seed,
        } => {
            let mode: ThermostatMode = mode
                .parse()
                .with_context(|| format!("invalid thermostat mode {mode:?}, expected ON or OFF"))?;
            let channel = ThermostatModeChannel::new(&device_id, &hub_id)?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            println!("{}", hex::encode(channel.frame(mode, &mut rng)));
        }
    }

    Ok(())
}

// dyplayer test application -- CLI tool for exercising a DY-series MP3
// module against real hardware or a mock transport.
//
// Usage:
//   dyplayer-test-app --port /dev/ttyUSB0 status
//   dyplayer-test-app --port /dev/ttyUSB0 volume set 15
//   dyplayer-test-app --port /dev/ttyUSB0 path sd /ADS/00001.MP3
//   dyplayer-test-app --port COM3 combination 01 02 03
//   dyplayer-test-app --mock --verbose demo
//   dyplayer-test-app --port /dev/ttyUSB0 stress --count 200

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dyplayer::frame::encode_frame;
use dyplayer::{
    CombinationName, Command, DeviceState, DyPlayer, DyPlayerBuilder, Response, TrackPath,
    Tracked,
};
use dyplayer_core::{Device, Equalizer, FolderEntry, PlayMode, PlayState, Volume};
use dyplayer_test_harness::MockTransport;
use dyplayer_transport::DEFAULT_BAUD_RATE;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// dyplayer test application -- drives a DY-series module from the command line.
#[derive(Parser)]
#[command(name = "dyplayer-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3). Required unless --mock.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// How long to wait for a query reply, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Use a mock transport with scripted replies instead of a serial port.
    #[arg(long)]
    mock: bool,

    /// Log every frame sent and received (overridden by RUST_LOG).
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Clone)]
enum Action {
    /// Start or resume playback.
    Play,
    Pause,
    Stop,
    Next,
    Previous,

    /// Jump to the previous folder.
    PreviousFolder {
        /// Start at the folder's last track instead of its first.
        #[arg(long)]
        last: bool,
    },

    /// Play a track by number (1 plays 00001.mp3).
    Track { number: u16 },

    /// Play a file by device and path, e.g. `path sd /00001.mp3`.
    Path { device: Device, path: String },

    /// Cue a track by number without playing it.
    Select { number: u16 },

    /// Interrupt playback with a track, then resume.
    Interlude { device: Device, track: u16 },

    /// Interrupt playback with a file by path, then resume.
    InterludePath { device: Device, path: String },

    StopInterlude,

    /// Play two-character sound names from the ZH folder in sequence.
    Combination {
        #[arg(required = true)]
        names: Vec<String>,
    },

    EndCombination,

    /// Volume operations.
    Volume {
        #[command(subcommand)]
        action: VolumeAction,
    },

    /// Equalizer operations.
    Eq {
        #[command(subcommand)]
        action: EqAction,
    },

    /// Set the play mode (repeat-all, repeat-one, one-off, random,
    /// repeat-folder, random-folder, sequence-folder, sequence).
    Mode { mode: PlayMode },

    /// Number of repeats for the repeat modes.
    Cycles { count: u16 },

    /// Storage device operations.
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },

    /// Query play state and current track.
    Status,

    /// Query track counts.
    Tracks,

    /// Set volume 15, repeat all tracks, and start playback.
    Demo,

    /// Stress test: rapid-fire set-volume / query cycles.
    Stress {
        #[arg(long, default_value_t = 100)]
        count: u32,
    },
}

#[derive(Subcommand, Clone)]
enum VolumeAction {
    /// Set the volume, 0 to 30.
    Set {
        #[arg(allow_hyphen_values = true)]
        level: i32,
    },
    Up,
    Down,
    /// Query the volume (newer firmware only).
    Get,
}

#[derive(Subcommand, Clone)]
enum EqAction {
    /// Set the equalizer (normal, pop, rock, jazz, classic, bass).
    Set { eq: Equalizer },
    /// Query the equalizer (newer firmware only).
    Get,
}

#[derive(Subcommand, Clone)]
enum DeviceAction {
    /// Switch playback to a device (usb, sd, flash).
    Set { device: Device },
    /// Query the device playback comes from.
    Get,
    /// Query which devices are present.
    Online,
}

// ---------------------------------------------------------------------------
// Command plans
// ---------------------------------------------------------------------------

/// Translate a CLI action into the commands it sends, validating parameters
/// before any connection is made.
fn plan(action: &Action) -> Result<Vec<Command>> {
    let commands = match action {
        Action::Play => vec![Command::Play],
        Action::Pause => vec![Command::Pause],
        Action::Stop => vec![Command::Stop],
        Action::Next => vec![Command::Next],
        Action::Previous => vec![Command::Previous],
        Action::PreviousFolder { last } => {
            let entry = if *last {
                FolderEntry::LastTrack
            } else {
                FolderEntry::FirstTrack
            };
            vec![Command::PreviousFolder(entry)]
        }
        Action::Track { number } => vec![Command::PlayTrack(*number)],
        Action::Path { device, path } => vec![Command::PlayPath {
            device: *device,
            path: TrackPath::new(path)?,
        }],
        Action::Select { number } => vec![Command::SelectTrack(*number)],
        Action::Interlude { device, track } => vec![Command::PlayInterlude {
            device: *device,
            track: *track,
        }],
        Action::InterludePath { device, path } => vec![Command::PlayInterludePath {
            device: *device,
            path: TrackPath::new(path)?,
        }],
        Action::StopInterlude => vec![Command::StopInterlude],
        Action::Combination { names } => {
            let names = names
                .iter()
                .map(|n| CombinationName::new(n))
                .collect::<dyplayer_core::Result<Vec<_>>>()?;
            vec![Command::CombinationPlay(names)]
        }
        Action::EndCombination => vec![Command::EndCombinationPlay],
        Action::Volume { action } => match action {
            VolumeAction::Set { level } => vec![Command::SetVolume(Volume::new(*level)?)],
            VolumeAction::Up => vec![Command::VolumeUp],
            VolumeAction::Down => vec![Command::VolumeDown],
            VolumeAction::Get => vec![Command::QueryVolume],
        },
        Action::Eq { action } => match action {
            EqAction::Set { eq } => vec![Command::SetEqualizer(*eq)],
            EqAction::Get => vec![Command::QueryEqualizer],
        },
        Action::Mode { mode } => vec![Command::SetPlayMode(*mode)],
        Action::Cycles { count } => vec![Command::SetCycleTimes(*count)],
        Action::Device { action } => match action {
            DeviceAction::Set { device } => vec![Command::SetPlayingDevice(*device)],
            DeviceAction::Get => vec![Command::QueryPlayingDevice],
            DeviceAction::Online => vec![Command::QueryOnlineDevices],
        },
        Action::Status => vec![Command::QueryPlayState, Command::QueryCurrentTrack],
        Action::Tracks => vec![
            Command::QueryTrackCount,
            Command::QueryFolderFirstTrack,
            Command::QueryFolderTrackCount,
        ],
        Action::Demo => vec![
            Command::SetVolume(Volume::new(15)?),
            Command::SetPlayMode(PlayMode::RepeatAll),
            Command::Play,
        ],
        Action::Stress { count } => {
            let mut commands = Vec::with_capacity(*count as usize * 2);
            for i in 0..*count {
                let level = (i % u32::from(Volume::MAX.level() + 1)) as i32;
                commands.push(Command::SetVolume(Volume::new(level)?));
                commands.push(Command::QueryPlayState);
            }
            commands
        }
    };
    Ok(commands)
}

/// Reply a freshly powered-up module with one track on an SD card would give.
fn mock_reply(command: &Command) -> Result<Vec<u8>> {
    let payload: Vec<u8> = match command {
        Command::QueryPlayState => vec![PlayState::Stopped.to_byte()],
        Command::QueryVolume => vec![Volume::default().level()],
        Command::QueryEqualizer => vec![Equalizer::Normal.to_byte()],
        Command::QueryPlayingDevice => vec![Device::Sd.to_byte()],
        Command::QueryOnlineDevices => vec![1 << Device::Sd.to_byte()],
        Command::QueryTrackCount
        | Command::QueryCurrentTrack
        | Command::QueryFolderFirstTrack
        | Command::QueryFolderTrackCount => 1u16.to_be_bytes().to_vec(),
        _ => return Ok(Vec::new()),
    };
    Ok(encode_frame(command.code(), &payload)?)
}

fn scripted_mock(commands: &[Command]) -> Result<MockTransport> {
    let mut mock = MockTransport::new();
    for command in commands {
        mock.expect(&command.encode()?, &mock_reply(command)?);
    }
    Ok(mock)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn describe(response: &Response) -> String {
    match response {
        Response::PlayState(s) => format!("Play state: {s}"),
        Response::Volume(v) => format!("Volume: {v}"),
        Response::Equalizer(eq) => format!("Equalizer: {eq}"),
        Response::PlayingDevice(Some(d)) => format!("Playing device: {d}"),
        Response::PlayingDevice(None) => "Playing device: none".to_string(),
        Response::OnlineDevices(online) => {
            let names: Vec<String> = online.devices().iter().map(|d| d.to_string()).collect();
            if names.is_empty() {
                "Online devices: none".to_string()
            } else {
                format!("Online devices: {}", names.join(", "))
            }
        }
        Response::TrackCount(n) => format!("Track count: {n}"),
        Response::CurrentTrack(n) => format!("Current track: {n}"),
        Response::FolderFirstTrack(n) => format!("Folder first track: {n}"),
        Response::FolderTrackCount(n) => format!("Folder track count: {n}"),
    }
}

fn tracked<T: std::fmt::Display>(value: &Tracked<T>) -> String {
    match value {
        Tracked::Unknown => "unknown".to_string(),
        Tracked::Optimistic(v) => format!("{v} (assumed)"),
        Tracked::Confirmed(v) => format!("{v}"),
    }
}

fn print_state(state: &DeviceState) {
    println!();
    println!("Module State");
    println!("  Connection:     {:?}", state.connection());
    println!("  Play state:     {}", tracked(state.play_state()));
    println!("  Volume:         {}", tracked(state.volume()));
    println!("  Equalizer:      {}", tracked(state.equalizer()));
    println!("  Play mode:      {}", tracked(state.play_mode()));
    println!("  Track:          {}", tracked(state.track()));
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

async fn run(player: &DyPlayer, commands: Vec<Command>) -> Result<()> {
    tracing::debug!(count = commands.len(), "executing command plan");
    for command in commands {
        let name = command.name();
        match player
            .send_command(command)
            .await
            .with_context(|| format!("{name} failed"))?
        {
            Some(response) => println!("{}", describe(&response)),
            None => println!("{name}: sent"),
        }
    }
    print_state(&player.state().await);
    Ok(())
}

async fn cmd_stress(player: &DyPlayer, commands: Vec<Command>) -> Result<()> {
    let total = commands.len();
    println!("Stress test: {total} commands");

    let mut failures = 0usize;
    let start = Instant::now();
    for (i, command) in commands.into_iter().enumerate() {
        let name = command.name();
        if let Err(e) = player.send_command(command).await {
            eprintln!("[{}/{total}] {name} failed: {e}", i + 1);
            failures += 1;
            if e.is_link_failure() {
                bail!("link lost after {} commands", i + 1);
            }
        }
    }

    let elapsed = start.elapsed();
    let rate = if elapsed.as_secs_f64() > 0.0 {
        total as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    println!();
    println!("Results:");
    println!("  Commands:  {total}");
    println!("  Failures:  {failures}");
    println!("  Elapsed:   {:.2}s", elapsed.as_secs_f64());
    println!("  Rate:      {rate:.1} commands/s");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn connect(cli: &Cli, commands: &[Command]) -> Result<DyPlayer> {
    let builder = DyPlayerBuilder::new()
        .baud_rate(cli.baud)
        .command_timeout(Duration::from_millis(cli.timeout_ms));

    if cli.mock {
        let mock = scripted_mock(commands)?;
        let player = builder
            .build_with_transport(Box::new(mock))
            .await
            .context("failed to build DyPlayer with mock transport")?;
        println!("Connected (mock transport)");
        Ok(player)
    } else {
        let port = cli
            .port
            .as_deref()
            .context("--port is required when not using --mock")?;
        let player = builder
            .serial_port(port)
            .build()
            .await
            .with_context(|| format!("failed to open serial port {port} at {} baud", cli.baud))?;
        println!("Connected to {port} at {} baud", cli.baud);
        Ok(player)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let commands = plan(&cli.command).context("invalid arguments")?;
    let player = connect(&cli, &commands).await?;

    let result = match &cli.command {
        Action::Stress { .. } => cmd_stress(&player, commands).await,
        _ => run(&player, commands).await,
    };
    player.close().await.ok();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from(["dyplayer-test-app", "--mock", "volume", "set", "15"]).unwrap();
        assert!(cli.mock);
        assert!(matches!(
            cli.command,
            Action::Volume {
                action: VolumeAction::Set { level: 15 }
            }
        ));

        let cli = Cli::try_parse_from(["dyplayer-test-app", "--port", "COM3", "path", "sd", "/1.mp3"])
            .unwrap();
        assert!(matches!(cli.command, Action::Path { device: Device::Sd, .. }));

        let cli = Cli::try_parse_from(["dyplayer-test-app", "--mock", "mode", "repeat"]).unwrap();
        assert!(matches!(cli.command, Action::Mode { mode: PlayMode::RepeatAll }));
    }

    #[test]
    fn demo_plan() {
        let commands = plan(&Action::Demo).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::SetVolume(Volume::new(15).unwrap()),
                Command::SetPlayMode(PlayMode::RepeatAll),
                Command::Play,
            ]
        );
    }

    #[test]
    fn plan_rejects_bad_parameters() {
        assert!(plan(&Action::Volume {
            action: VolumeAction::Set { level: 31 }
        })
        .is_err());
        assert!(plan(&Action::Path {
            device: Device::Sd,
            path: "nested/too/deep/x.mp3".into()
        })
        .is_err());
        assert!(plan(&Action::Combination {
            names: vec!["abc".into()]
        })
        .is_err());
    }

    #[test]
    fn mock_replies_only_for_queries() {
        assert!(mock_reply(&Command::Play).unwrap().is_empty());
        assert_eq!(
            mock_reply(&Command::QueryPlayState).unwrap(),
            vec![0xAA, 0x01, 0x01, 0x00, 0xAC]
        );
    }

    #[tokio::test]
    async fn scripted_mock_runs_status() {
        let commands = plan(&Action::Status).unwrap();
        let mock = scripted_mock(&commands).unwrap();
        let player = DyPlayerBuilder::new()
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        let state = player.refresh().await.unwrap();
        assert_eq!(state.play_state(), &Tracked::Confirmed(PlayState::Stopped));
    }
}

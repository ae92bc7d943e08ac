use std::{
    future::Future,
    io,
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use driver::BoxedDriver;
use trainpixels_app::{
    core::{Definitions, PixelDriver},
    Scheduler, TrainpixelsError,
};
use trainpixels_storage::{load_definitions, CommandInbox, SearchPaths};

mod driver;

/// Model railway LED animation engine
///
/// Animates a train running along a track LED strip and switches the indicator
/// lights of the utility strip.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = false)]
struct Cli {
    /// Configuration directory with the settings, tracks and utilities
    #[arg(short, long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,
    /// Command inbox directory
    #[arg(long, global = true, value_name = "DIR")]
    inbox_dir: Option<PathBuf>,
    /// Use the dummy pixel driver instead of the hardware
    #[arg(long, global = true)]
    dummy: bool,
    /// Seed of the random utility trigger
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Actual command
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the animation
    Run {
        /// Track id or 1-based track number, the first track by default
        track: Option<String>,
        /// Render the strips to the terminal instead of the hardware
        #[arg(long)]
        dry_run: bool,
    },
    /// List the tracks and utilities
    List,
    /// Check the configuration and exit
    VerifyConfig,
    /// Send a keypad command to the running engine
    Send {
        /// Track number, track id, `0` to deselect or `*` to stop
        input: String,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate the completions for
        #[arg(value_enum)]
        shell: clap_complete_command::Shell,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            exit_code(&err)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<TrainpixelsError>() {
        Some(err) if err.is_hardware() => ExitCode::from(3),
        Some(err) if err.is_config() => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Run { track, dry_run } => {
            let definitions = load(&cli)?;
            let driver = driver::open(definitions.settings(), cli.dummy, *dry_run)?;
            let inbox = inbox(&cli)?;
            run(&cli, definitions, driver, &inbox, track.as_deref())?;
        }
        Command::List => {
            let definitions = load(&cli)?;
            print_definitions(&definitions);
        }
        Command::VerifyConfig => {
            let definitions = load(&cli)?;
            log::info!(
                "Configuration verified: {} tracks, {} utilities",
                definitions.tracks().len(),
                definitions.utilities().len()
            );
        }
        Command::Send { input } => {
            let inbox = inbox(&cli)?;
            inbox
                .send(input)
                .with_context(|| format!("Unable to send {input:?}"))?;
            log::info!("Sent {input:?} to {}", inbox.dir().display());
        }
        Command::Completions { shell } => {
            shell.generate(&mut Cli::command(), &mut io::stdout());
        }
    }

    Ok(())
}

fn load(cli: &Cli) -> anyhow::Result<Arc<Definitions>> {
    let dir = SearchPaths::new(cli.config_dir.clone()).resolve()?;
    let definitions = load_definitions(&dir)
        .with_context(|| format!("Invalid configuration in {}", dir.display()))?;
    Ok(Arc::new(definitions))
}

fn inbox(cli: &Cli) -> anyhow::Result<CommandInbox> {
    let dir = cli
        .inbox_dir
        .clone()
        .or_else(CommandInbox::default_dir)
        .context("Unable to determine the inbox directory, use --inbox-dir")?;
    Ok(CommandInbox::new(dir))
}

fn print_definitions(definitions: &Definitions) {
    println!("Tracks:");
    for (number, track) in definitions.tracks().iter().enumerate() {
        println!(
            "  {:>2}. {:<20} {:<24} {:>3} steps, {:>2} triggers, speed {}{}",
            number + 1,
            track.id,
            track.name,
            track.path.len(),
            track.trigger_count(),
            track.speed,
            if track.looping { "" } else { ", once" }
        );
    }

    println!("Utilities:");
    for utility in definitions.utilities() {
        let leds = utility
            .leds
            .iter()
            .map(|led| format!("{}:{}", led.led, led.color))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "  {:<20} {:<24} init={:<5} random={:<5} {leds}",
            utility.id, utility.name, utility.enabled_on_init, utility.is_random
        );
    }
}

fn run(
    cli: &Cli,
    definitions: Arc<Definitions>,
    driver: BoxedDriver,
    inbox: &CommandInbox,
    track: Option<&str>,
) -> anyhow::Result<()> {
    let frame_interval = definitions.settings().frame_interval();

    let mut scheduler = match cli.seed {
        Some(seed) => Scheduler::with_seed(definitions, driver, seed),
        None => Scheduler::new(definitions, driver),
    }
    .context("Unable to initialize the LED strips")?;

    let now = Instant::now();
    let selected = match track.map(|track| (track, track.parse::<usize>())) {
        Some((_, Ok(number))) => scheduler.select_number(number, now),
        Some((id, Err(_))) => scheduler.select(id, now),
        None => scheduler.select_number(1, now),
    };
    if let Err(err) = selected {
        scheduler.fail(&err);
        return Err(err.into());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Unable to create the tokio runtime")?;
    runtime.block_on(run_loop(
        &mut scheduler,
        inbox,
        frame_interval,
        shutdown_signal(),
    ))
}

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
async fn shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "interrupt")
}

async fn run_loop<D: PixelDriver>(
    scheduler: &mut Scheduler<D>,
    inbox: &CommandInbox,
    frame_interval: Duration,
    shutdown: impl Future<Output = io::Result<&'static str>>,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(frame_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            result = &mut shutdown => {
                let signal = result.context("Unable to listen for the termination signals")?;
                log::info!("Received {signal}, switching the strips off");
                scheduler.stop()?;
                return Ok(());
            }
        }

        if let Err(err) = tick(scheduler, inbox, Instant::now()) {
            scheduler.fail(&err);
            return Err(err.into());
        }
        if scheduler.is_terminated() {
            log::info!("Engine stopped");
            return Ok(());
        }
    }
}

/// Applies a pending command and performs a single scheduler iteration.
fn tick<D: PixelDriver>(
    scheduler: &mut Scheduler<D>,
    inbox: &CommandInbox,
    now: Instant,
) -> Result<(), TrainpixelsError> {
    match inbox.poll() {
        Ok(Some(command)) => match scheduler.apply(command, now) {
            Err(err) if !err.is_hardware() => log::warn!("Command rejected: {err}"),
            result => result?,
        },
        Ok(None) => {}
        Err(err) => log::warn!("Unable to read the command inbox: {err}"),
    }

    if scheduler.is_running() {
        let report = scheduler.tick(now)?;
        if report.finished {
            log::info!("Track finished, waiting for the next command");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "trainpixels",
            "run",
            "main_line",
            "--dry-run",
            "--seed",
            "7",
            "--config-dir",
            "/tmp/layout",
        ])
        .unwrap();

        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/layout")));
        assert!(matches!(
            cli.command,
            Command::Run { track: Some(ref track), dry_run: true } if track == "main_line"
        ));
    }

    fn definitions() -> Arc<Definitions> {
        use trainpixels_app::core::{PathStep, Settings, Track, Utility, UtilityLed};

        let lamp = Utility {
            id: "lamp_3".into(),
            name: "Lamp".to_owned(),
            enabled_on_init: true,
            is_random: false,
            leds: vec![UtilityLed {
                led: 3,
                color: "yellow".to_owned(),
            }],
        };
        let track = Track::new(
            "main",
            "Main",
            vec![PathStep::Advance(0), PathStep::Advance(1)],
            1.0,
        );
        Arc::new(Definitions::new(Settings::default(), vec![track], vec![lamp]).unwrap())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_termination_signal_switches_the_strips_off() {
        use trainpixels_app::{
            core::{MemoryDriver, Strip},
            Phase,
        };

        let definitions = definitions();
        let status_led = definitions.settings().status_util_led;
        let mut scheduler = Scheduler::with_seed(definitions, MemoryDriver::new(), 7).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let inbox = CommandInbox::new(dir.path());

        let now = Instant::now();
        scheduler.select("main", now).unwrap();
        scheduler.tick(now).unwrap();
        assert_eq!(scheduler.pixels().driver().lit(Strip::Track), vec![0]);

        run_loop(
            &mut scheduler,
            &inbox,
            Duration::from_millis(5),
            async { Ok("SIGTERM") },
        )
        .await
        .unwrap();

        assert_eq!(scheduler.state().phase(), Phase::Terminated);
        assert!(scheduler.pixels().driver().lit(Strip::Track).is_empty());
        assert_eq!(
            scheduler.pixels().driver().lit(Strip::Utility),
            vec![status_led]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_signal_listener_failure_is_reported() {
        use trainpixels_app::core::MemoryDriver;

        let mut scheduler = Scheduler::with_seed(definitions(), MemoryDriver::new(), 7).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let inbox = CommandInbox::new(dir.path());
        scheduler.select("main", Instant::now()).unwrap();

        let err = run_loop(&mut scheduler, &inbox, Duration::from_millis(5), async {
            Err(io::Error::new(io::ErrorKind::Other, "no signal driver"))
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("termination signals"));
    }

    #[test]
    fn test_exit_codes() {
        let config = anyhow::Error::new(TrainpixelsError::NoTracks).context("Invalid configuration");
        assert_eq!(exit_code(&config), ExitCode::from(2));

        let hardware = anyhow::Error::new(TrainpixelsError::hardware("no spidev"));
        assert_eq!(exit_code(&hardware), ExitCode::from(3));

        assert_eq!(exit_code(&anyhow::anyhow!("other")), ExitCode::FAILURE);
    }
}

//! Poetry printer entry point.
//!
//! # Startup sequence (`run`)
//!
//! 1. Load [`AppConfig`] (defaults on first run) and initialise logging.
//! 2. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 3. Resolve the API key; a missing key stops startup.
//! 4. Build camera, generator (with retries), printer and status LED.
//! 5. Spawn the pipeline orchestrator on the runtime.
//! 6. Start the button listener thread (or the stdin trigger in dry runs).
//! 7. Wait for Ctrl-C, then stop the input, the pipeline and the LED.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use poetry_printer::{
    button::{ButtonEvent, ButtonListener, Debouncer, InputError, StdinTrigger},
    camera::{Camera, StillCamera},
    config::{AppConfig, AppPaths, PrinterConfig},
    gpio::SysfsPin,
    led::{LogIndicator, StatusIndicator, StatusLed},
    logging,
    pipeline::{new_shared_state, PipelineError, PipelineOrchestrator, RunLog, SharedState},
    poem::{GeminiGenerator, PoemGenerator, RetryPolicy, RetryingGenerator},
    printer::{ConsolePrinter, Printer, ReceiptFormatter, SerialPrinter},
};

/// How long blocking work (printer writes) may hold up exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "poetry-printer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Press a button, get a poem about what the camera sees", long_about = None)]
struct Cli {
    /// Settings file (default: the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read presses from stdin and print to the terminal instead of hardware
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run the appliance (default)
    Run,

    /// Take one picture and save it
    TestCamera,

    /// Print a diagnostics page
    TestPrinter,

    /// Write a settings file with the default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Hardware wiring
// ---------------------------------------------------------------------------

/// Whatever produces presses; dropping it stops the producer.
enum Input {
    Button(ButtonListener),
    Stdin(StdinTrigger),
}

fn start_input(
    config: &AppConfig,
    dry_run: bool,
    state: SharedState,
    tx: mpsc::Sender<ButtonEvent>,
) -> Result<Input, PipelineError> {
    if dry_run {
        println!("Dry run: press Enter to take a picture, Ctrl-D to quit.");
        return Ok(Input::Stdin(StdinTrigger::start(state, tx)?));
    }

    let button = &config.button;
    let pin = SysfsPin::input(&button.gpio_root, button.pin).map_err(InputError::from)?;
    let debouncer = Debouncer::new(
        Duration::from_millis(button.stable_ms),
        Duration::from_millis(button.refractory_ms),
    );
    let listener = ButtonListener::start(
        Box::new(pin),
        button.active_low,
        debouncer,
        Duration::from_millis(button.poll_interval_ms),
        state,
        tx,
    )?;
    Ok(Input::Button(listener))
}

fn start_led(config: &AppConfig) -> Option<Arc<StatusLed>> {
    match SysfsPin::output(&config.button.gpio_root, config.led.pin) {
        Ok(pin) => Some(Arc::new(StatusLed::start(
            Box::new(pin),
            Duration::from_millis(config.led.blink_interval_ms),
        ))),
        Err(e) => {
            log::warn!("LED unavailable ({e}); status goes to the log only");
            None
        }
    }
}

async fn serial_printer(config: &PrinterConfig) -> SerialPrinter {
    let printer = SerialPrinter::from_config(config);
    if let Some(baud) = config.baud() {
        if let Err(e) = printer.configure_baud(baud).await {
            log::warn!("{e}; using the port as it is");
        }
    }
    printer
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run(config: AppConfig, dry_run: bool) -> Result<()> {
    let api_key = config
        .generator
        .resolve_api_key()
        .context("cannot start without a generation API key")?;

    let state = new_shared_state();

    let camera: Arc<dyn Camera> = Arc::new(StillCamera::from_config(&config.camera));
    let generator: Arc<dyn PoemGenerator> = Arc::new(RetryingGenerator::new(
        GeminiGenerator::from_config(&config.generator, api_key),
        RetryPolicy::from_config(&config.generator),
    ));

    let printer: Arc<dyn Printer>;
    let led: Option<Arc<StatusLed>>;
    if dry_run {
        printer = Arc::new(ConsolePrinter::new());
        led = None;
    } else {
        printer = Arc::new(serial_printer(&config.printer).await);
        led = start_led(&config);
    }
    let indicator: Arc<dyn StatusIndicator> = match &led {
        Some(led) => Arc::clone(led) as Arc<dyn StatusIndicator>,
        None => Arc::new(LogIndicator),
    };

    let run_log = RunLog::new(config.log.resolved_run_log());
    log::info!("run log: {}", run_log.path().display());

    let orchestrator = PipelineOrchestrator::new(state.clone(), camera, generator, printer, indicator)
        .with_formatter(ReceiptFormatter::from_config(&config.printer))
        .with_run_log(run_log)
        .with_error_slip(config.printer.error_slip)
        .with_error_hold(Duration::from_millis(config.led.error_hold_ms));

    // Capacity 1: at most one press waits while a run is being set up.
    let (press_tx, press_rx) = mpsc::channel(1);
    let mut pipeline = tokio::spawn(orchestrator.run(press_rx));

    let input = start_input(&config, dry_run, state, press_tx)?;
    if matches!(input, Input::Button(_)) {
        log::info!(
            "Poetry printer ready. Press the button on GPIO {} to start.",
            config.button.pin
        );
    }

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                log::warn!("cannot listen for Ctrl-C: {e}");
            }
            log::info!("interrupted, shutting down");
            drop(input);
            pipeline.abort();
            let _ = pipeline.await;
        }
        finished = &mut pipeline => {
            drop(input);
            if let Err(e) = finished {
                log::error!("pipeline task ended abnormally: {e}");
            }
        }
    }

    if let Some(led) = led {
        match Arc::try_unwrap(led) {
            Ok(led) => led.shutdown().await,
            Err(_) => log::warn!("LED still in use at shutdown"),
        }
    }
    Ok(())
}

async fn test_camera(config: &AppConfig) -> Result<()> {
    let dir = config
        .camera
        .save_dir
        .clone()
        .unwrap_or_else(|| AppPaths::new().pictures_dir);
    let camera = StillCamera::from_config(&config.camera).save_to(Some(dir.clone()));

    println!("Taking a picture with `{}`...", config.camera.command);
    let image = camera.capture().await.context("capture failed")?;

    match image.saved_to {
        Some(path) => println!("Saved {} bytes to {}", image.bytes.len(), path.display()),
        None => bail!(
            "captured {} bytes but could not save them in {}",
            image.bytes.len(),
            dir.display()
        ),
    }
    Ok(())
}

async fn test_printer(config: &AppConfig, dry_run: bool) -> Result<()> {
    let job = ReceiptFormatter::from_config(&config.printer).test_page(&config.printer, Local::now());

    if dry_run {
        ConsolePrinter::new().print(&job).await?;
        return Ok(());
    }

    let printer = serial_printer(&config.printer).await;
    println!("Sending test page to {}...", printer.device().display());
    printer.print(&job).await.with_context(|| {
        format!(
            "is the printer powered on and connected to {}, and is your user in the `dialout` group?",
            config.printer.device.display()
        )
    })?;
    println!("Test page sent.");
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default().save_to(path)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Configuration + logging
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppPaths::new().settings_file);
    let loaded = AppConfig::load_from(&config_path);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => AppConfig::default(),
    };
    logging::init(&config.log)?;
    match loaded {
        Ok(_) => log::info!("settings: {}", config_path.display()),
        Err(e) => log::warn!("Failed to load config ({e:#}); using defaults"),
    }

    let command = cli.command.unwrap_or(Commands::Run);
    if let Commands::InitConfig { force } = command {
        return init_config(&config_path, force);
    }

    // 2. Tokio runtime (2 worker threads are plenty for one press at a time)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let result = match command {
        Commands::Run => rt.block_on(run(config, cli.dry_run)),
        Commands::TestCamera => rt.block_on(test_camera(&config)),
        Commands::TestPrinter => rt.block_on(test_printer(&config, cli.dry_run)),
        Commands::InitConfig { .. } => Ok(()),
    };

    // A printer write stuck on the device must not keep the process alive.
    rt.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

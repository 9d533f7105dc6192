use anyhow::{Context, Result, bail};
use clap::Parser;
use knockstream::cli::{Cli, Commands, ConfigAction, Source};
use knockstream::config::{Config, OutputFormat};
use knockstream::consumer::{
    FeatureClassifier, JsonSink, KnockDetector, LineServer, PredLineSink, PredictionSink,
    StreamConsumer,
};
use knockstream::pipeline::Producer;
use knockstream::sensor::{SensorBus, SyntheticSensorBus, WavSensorBus};
use knockstream::transport::TcpTransport;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    log::debug!("knockstream {}", knockstream::version_string());

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Stream {
            source,
            endpoint,
            duration,
            knock_every,
        } => {
            run_stream(config, source, endpoint, duration, knock_every).await?;
        }
        Commands::Serve { listen, json } => {
            run_serve(config, listen, json).await?;
        }
        Commands::Infer { json, window_size } => {
            run_infer(config, json, window_size)?;
        }
        Commands::Detect { label, threshold } => {
            run_detect(config, label, threshold)?;
        }
        Commands::Config { action } => {
            handle_config_command(action, &config)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so they never mix with the prediction stream on stdout.
/// `RUST_LOG` takes precedence over the `-q`/`-v` flags.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_timestamp_millis()
        .parse_default_env()
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/knockstream/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match (custom_path, Config::default_path()) {
        (Some(path), _) => Config::load(path)?,
        (None, Some(path)) => Config::load_or_default(&path)?,
        (None, None) => Config::default(),
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn output_format(config: &Config, json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        config.consumer.output
    }
}

fn stdout_sink(format: OutputFormat) -> Box<dyn PredictionSink> {
    match format {
        OutputFormat::Pred => Box::new(PredLineSink::stdout()),
        OutputFormat::Json => Box::new(JsonSink::stdout()),
    }
}

fn open_source(
    source: &Source,
    config: &Config,
    knock_every: Duration,
) -> Result<Box<dyn SensorBus>> {
    match source {
        Source::Synthetic => {
            let polls = (knock_every.as_secs_f64() * config.producer.inertial_rate_hz as f64)
                .round()
                .max(1.0) as u64;
            let bus = SyntheticSensorBus::new()
                .with_knocks(polls, 8, 6.0)
                .with_realtime(true);
            Ok(Box::new(bus))
        }
        Source::Wav(path) => {
            let bus = WavSensorBus::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(bus))
        }
    }
}

async fn wait_for(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

async fn run_stream(
    config: Config,
    source: Source,
    endpoint: Option<String>,
    duration: Option<Duration>,
    knock_every: Duration,
) -> Result<()> {
    let endpoint = endpoint.unwrap_or_else(|| config.transport.endpoint.clone());
    let bus = open_source(&source, &config, knock_every)?;
    let transport = TcpTransport::from_config(&config.transport);

    let mut producer = Producer::new(bus, transport, &config.producer)
        .context("Sensor initialization failed, not streaming")?;
    producer.connect(&endpoint)?;

    let running = Arc::new(AtomicBool::new(true));
    let handle = tokio::task::spawn_blocking({
        let running = Arc::clone(&running);
        move || producer.run(&running)
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received Ctrl-C, stopping");
        }
        _ = wait_for(duration) => {
            log::info!("Duration elapsed, stopping");
        }
    }
    running.store(false, Ordering::SeqCst);

    let stats = handle.await.context("Producer thread panicked")?;
    log::info!(
        "{} iterations, {} samples, {} skipped reads",
        stats.iterations,
        stats.samples,
        stats.skipped
    );
    Ok(())
}

async fn run_serve(config: Config, listen: Option<String>, json: bool) -> Result<()> {
    let listen = listen.unwrap_or_else(|| config.consumer.listen.clone());
    let classifier = FeatureClassifier::new(config.consumer.window_size, &config.classifier);
    let mut consumer = StreamConsumer::new(classifier);
    let mut sink = stdout_sink(output_format(&config, json));

    let server = LineServer::bind(&listen).await?;
    server
        .run(&mut consumer, sink.as_mut(), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            log::info!("Received Ctrl-C, shutting down");
        })
        .await?;
    Ok(())
}

fn run_infer(mut config: Config, json: bool, window_size: Option<usize>) -> Result<()> {
    if let Some(size) = window_size {
        if size == 0 {
            bail!("--window-size must be at least 1");
        }
        config.consumer.window_size = size;
    }
    let classifier = FeatureClassifier::new(config.consumer.window_size, &config.classifier);
    let mut consumer = StreamConsumer::new(classifier);
    let mut sink = stdout_sink(output_format(&config, json));

    let stdin = std::io::stdin();
    consumer.run(stdin.lock(), sink.as_mut())?;
    Ok(())
}

fn run_detect(config: Config, label: Option<String>, threshold: Option<f32>) -> Result<()> {
    let mut detector = KnockDetector::new(
        label.unwrap_or(config.detector.label),
        threshold.unwrap_or(config.detector.threshold),
    );
    let color = std::io::stdout().is_terminal();

    detector.run(std::io::stdin().lock(), |detection| {
        if color {
            println!(
                "{} {}={:.3}",
                "KNOCK".red().bold(),
                detection.label,
                detection.score
            );
        } else {
            println!("KNOCK {}={:.3}", detection.label, detection.score);
        }
    })?;

    log::info!("{} detections", detector.detections());
    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => match Config::default_path() {
            Some(path) => println!("{}", path.display()),
            None => bail!("No configuration directory on this platform"),
        },
    }
    Ok(())
}

use std::{
    error::Error,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};

mod app_metrics;
mod climate;
mod command_sink;
mod config;
mod device_manager;
mod discovery;
mod light;
mod mqtt;
mod sensor;
mod water_heater;
mod web;

use app_metrics::{AppMetrics, MetricsLogger};
use config::Config;
use device_manager::{DeviceManager, SharedManager, lock_manager};
use mqtt::MqttSink;

// Import from rvc crate
use rumqttc::{Event, Packet, RecvTimeoutError};
use rvc::{MessageHandler, RvcFrame};

// ========== Logging Setup ==========

fn init_logging(log_config: &config::LogConfig) -> Result<(), Box<dyn Error>> {
    use tracing_appender::rolling;
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&log_config.directory)?;

    // Create daily rolling file appender
    let file_appender = rolling::daily(&log_config.directory, &log_config.file_prefix);

    // Build subscriber with both console and file output
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_timer(fmt::time::OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
            fmt::time::OffsetTime::new(time::UtcOffset::UTC, time::format_description::well_known::Rfc3339)
        }));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_timer(fmt::time::OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
            fmt::time::OffsetTime::new(time::UtcOffset::UTC, time::format_description::well_known::Rfc3339)
        }));

    // Parse log level from config
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ========== Web Server ==========

/// Runs the HTTP API on its own thread and runtime; the MQTT loop stays
/// synchronous.
fn spawn_web_server(manager: SharedManager, port: u16) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("web".to_string())
        .spawn(move || {
            if let Err(e) = runtime.block_on(web::server::start_web_server(manager, port)) {
                error!("Web server stopped: {}", e);
            }
        })?;
    Ok(())
}

// ========== Main Application ==========

fn main() -> Result<(), Box<dyn Error>> {
    // Check for command-line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for help flag
    if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        println!("RV-C MQTT Router");
        println!();
        println!("USAGE:");
        println!("    rvc_router [OPTIONS]");
        println!();
        println!("OPTIONS:");
        println!("    --validate-config, --validate, -v    Validate configuration and exit");
        println!("    --help, -h                           Show this help message");
        println!();
        println!("Configuration file: config.json (in current directory)");
        std::process::exit(0);
    }

    let validate_only = args.contains(&"--validate-config".to_string())
        || args.contains(&"--validate".to_string())
        || args.contains(&"-v".to_string());

    // Load configuration
    let config = match Config::from_file("config.json") {
        Ok(cfg) => {
            if validate_only {
                println!("✓ Configuration validation successful");
                println!("  MQTT broker: {}:{}", cfg.mqtt.host, cfg.mqtt.port);
                println!(
                    "  Lights: {} named, {:?} commands, default brightness {}%",
                    cfg.lights.names.len(),
                    cfg.lights.command_format,
                    cfg.lights.default_brightness
                );
                println!(
                    "  Climate: {} named, {:.0}-{:.0}°F",
                    cfg.climate.names.len(),
                    cfg.climate.min_temp_f,
                    cfg.climate.max_temp_f
                );
                println!("  Water heaters: {} named", cfg.water_heater.names.len());
                println!("  Sensors: {}", cfg.sensors.len());
                if cfg.web.enabled {
                    println!("  Web API: port {}", cfg.web.port);
                }
                std::process::exit(0);
            }
            cfg
        }
        Err(e) => {
            if validate_only {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            eprintln!("Warning: Could not load config.json: {}", e);
            eprintln!("Using default configuration");
            Config::default()
        }
    };

    // Initialize logging
    init_logging(&config.logging)?;
    info!("RV-C Router starting...");
    info!("Loaded configuration");

    let (client, mut connection) = mqtt::connect(&config.mqtt);

    let manager: SharedManager = Arc::new(Mutex::new(DeviceManager::new(
        &config,
        Box::new(MqttSink::new(client.clone())),
    )));
    let topics = lock_manager(&manager).subscription_topics();

    if config.web.enabled {
        spawn_web_server(Arc::clone(&manager), config.web.port)?;
    }

    // Application metrics tracking
    let mut metrics = AppMetrics::new();
    let mut metrics_logger = MetricsLogger::new(Duration::from_secs(60));

    // Poll the connection with a timeout so sensor expiry and metrics run
    // even when the bus is quiet
    loop {
        match connection.recv_timeout(Duration::from_millis(500)) {
            Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => {
                info!("Connected to MQTT broker");
                // Subscriptions do not survive a clean-session reconnect
                let count = mqtt::subscribe_all(&client, &topics);
                info!("Subscribed to {} of {} topics", count, topics.len());
            }
            Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                metrics.mqtt_messages += 1;
                let frame = RvcFrame::new(publish.topic.as_str(), &publish.payload);
                debug!("{}: {}", frame.topic, frame.message);
                lock_manager(&manager).handle_message(&frame);
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                metrics.mqtt_errors += 1;
                warn!("MQTT connection error: {}", e);
                warn!("Retrying in 5 seconds...");
                std::thread::sleep(Duration::from_secs(5));
            }
            Err(RecvTimeoutError::Timeout) => {
                // Timeout is expected - just continue to allow metrics and expiry
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!("MQTT event loop closed");
                return Err("MQTT event loop closed".into());
            }
        }

        {
            let mut manager = lock_manager(&manager);
            manager.expire_sensors(Instant::now());
            metrics.absorb(manager.take_stats());
        }

        // Log metrics periodically
        metrics_logger.check_and_log(&mut metrics);
    }
}

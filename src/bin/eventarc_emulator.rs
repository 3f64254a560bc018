//! Eventarc emulator server
//!
//! Standalone binary serving the emulator routes over HTTP.

use eventarc_emulator::{CollisionPolicy, EmulatorConfig, EventarcEmulator};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    println!("eventarc-emulator - Eventarc emulator");
    println!();
    println!("USAGE:");
    println!("    eventarc-emulator [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -H, --host <HOST>             Host to listen on [default: 127.0.0.1]");
    println!("    -p, --port <PORT>             Port to listen on [default: 9299]");
    println!("    -f, --functions-url <URL>     Functions emulator to deliver events to");
    println!("        --strict                  Reject registrations that collide on a match key");
    println!("    -h, --help                    Print help information");
    println!();
    println!("Settings may also come from EVENTARC_* environment variables");
    println!("(e.g. EVENTARC_PORT, EVENTARC_DELIVERY__FUNCTIONS_URL); flags take precedence.");
}

fn flag_value(args: &[String], i: usize, flag: &str) -> String {
    if let Some(value) = args.get(i + 1) {
        value.clone()
    } else {
        eprintln!("error: {flag} requires a value");
        std::process::exit(1);
    }
}

fn parse_args(mut config: EmulatorConfig) -> EmulatorConfig {
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-H" => {
                config.host = flag_value(&args, i, "--host");
                i += 2;
            }
            "--port" | "-p" => {
                let raw = flag_value(&args, i, "--port");
                config.port = raw.parse().unwrap_or_else(|_| {
                    eprintln!("error: invalid port number: {raw}");
                    std::process::exit(1);
                });
                i += 2;
            }
            "--functions-url" | "-f" => {
                config.delivery.functions_url = Some(flag_value(&args, i, "--functions-url"));
                i += 2;
            }
            "--strict" => {
                config.registry.collision_policy = CollisionPolicy::Reject;
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = parse_args(EmulatorConfig::from_env()?);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        functions_url = config.delivery.functions_url.as_deref().unwrap_or("-"),
        "Starting Eventarc emulator"
    );

    let emulator = EventarcEmulator::new(config)?;
    tracing::info!(
        collision_policy = ?emulator.registry().collision_policy(),
        "Trigger registry ready"
    );
    emulator.start().await?;
    emulator.connect().await?;
    tracing::info!("Press Ctrl+C to stop");

    signal::ctrl_c().await?;
    emulator.stop().await?;

    tracing::info!("Shut down");
    Ok(())
}

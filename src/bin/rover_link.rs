//! Rover control server.
//!
//! Serves the WebSocket control protocol on `/ws` using the simulated
//! actuator backend.
//!
//! Usage:
//!   cargo run --bin rover-link -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>    JSON config file (default: built-in defaults)
//!   --bind <ADDR>      Listen address, overrides the config (e.g. 0.0.0.0:5000)
//!   --led-count <N>    Number of LEDs on the strip, overrides the config

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use rover_link::{log_error, log_info, Server, ServerConfig, SimActuators};

#[derive(Default)]
struct Args {
    config: Option<PathBuf>,
    bind: Option<SocketAddr>,
    led_count: Option<usize>,
}

fn parse_args() -> Args {
    let mut args = Args::default();

    let raw: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--config" => {
                i += 1;
                args.config = Some(PathBuf::from(arg_value(&raw, i, "config")));
            }
            "--bind" => {
                i += 1;
                args.bind = Some(parse_arg(&raw, i, "bind"));
            }
            "--led-count" => {
                i += 1;
                args.led_count = Some(parse_arg(&raw, i, "led-count"));
            }
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    args
}

fn arg_value<'a>(raw: &'a [String], i: usize, name: &str) -> &'a str {
    raw.get(i).map(String::as_str).unwrap_or_else(|| {
        eprintln!("Error: --{name} requires a value");
        process::exit(1);
    })
}

fn parse_arg<T: std::str::FromStr>(raw: &[String], i: usize, name: &str) -> T {
    arg_value(raw, i, name).parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for --{name}");
        process::exit(1);
    })
}

fn print_usage() {
    eprintln!(
        "Usage: rover-link [OPTIONS]\n\
         \n\
         Options:\n\
         \x20 --config <PATH>    JSON config file (default: built-in defaults)\n\
         \x20 --bind <ADDR>      Listen address (default: 0.0.0.0:5000)\n\
         \x20 --led-count <N>    Number of LEDs on the strip (default: 6)\n\
         \x20 -h, --help         Show this help"
    );
}

fn load_config(args: &Args) -> ServerConfig {
    let mut config = ServerConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(led_count) = args.led_count {
        config.led_count = led_count;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    config
}

#[tokio::main]
async fn main() {
    let args = parse_args();
    let config = load_config(&args);
    rover_link::logging::init();

    log_info!(
        "rover-link {}: {} LEDs, failsafe {:?}",
        env!("CARGO_PKG_VERSION"),
        config.led_count,
        config.failsafe.policy
    );

    let actuators = SimActuators::new(&config);
    let server = match Server::bind(config, actuators).await {
        Ok(server) => server,
        Err(e) => {
            log_error!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server.run(rover_link::server::ctrl_c()).await {
        log_error!("{}", e);
        process::exit(1);
    }
    log_info!("Bye");
}

//! NagaBridge demo driver
//!
//! Runs random-policy episodes against a running Netsnake server and
//! renders each step. Useful for smoke-testing the bridge and as the
//! minimal example of the environment loop a training harness drives.

use naga_bridge::{BridgeConfig, BridgeError, Result, SnakeEnv};
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

const EPISODES: usize = 10;
const MAX_STEPS: usize = 2000;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("naga_bridge=info".parse().unwrap()),
        )
        .init();

    let config = load_config()?;

    info!("NagaBridge v{}", env!("CARGO_PKG_VERSION"));

    // Ctrl-C finishes the current step, then closes the bridge cleanly
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| BridgeError::Config(format!("Error setting Ctrl-C handler: {}", e)))?;

    let mut env = SnakeEnv::connect(config)?;
    let mut rng = rand::rng();
    let mut stdout = std::io::stdout();

    'episodes: for episode in 0..EPISODES {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        env.reset()?;

        for step in 0..MAX_STEPS {
            if !running.load(Ordering::Relaxed) {
                break 'episodes;
            }

            let action = rng.random_range(0..env.action_space());
            let outcome = match env.step(action) {
                Ok(outcome) => outcome,
                // A garbled datagram is a missed tick, not a dead
                // session: step again
                Err(BridgeError::MalformedFrame(e)) => {
                    warn!("Skipping malformed frame: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            env.render(&mut stdout)?;

            if outcome.done {
                info!(
                    "Episode {} finished after {} steps (score {})",
                    episode,
                    step + 1,
                    outcome.score
                );
                continue 'episodes;
            }
        }
        info!("Episode {} hit the step limit", episode);
    }

    env.close();
    Ok(())
}

/// Resolve configuration: positional config path, else `naga.toml` in
/// the working directory, else defaults. `--server <host[:port]>`
/// overrides the target address.
fn load_config() -> Result<BridgeConfig> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && !args[1].starts_with("--") {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        return BridgeConfig::load(config_path);
    }

    let mut config = if Path::new("naga.toml").exists() {
        info!("Loading configuration from naga.toml");
        BridgeConfig::load(Path::new("naga.toml"))?
    } else {
        info!("Using default configuration");
        BridgeConfig::default()
    };

    let server = args
        .iter()
        .position(|a| a == "--server")
        .and_then(|i| args.get(i + 1))
        .cloned();

    if let Some(addr) = server {
        info!("Using server address: {}", addr);
        match addr.split_once(':') {
            Some((host, port)) => {
                config.connection.host = host.to_string();
                config.connection.port = port
                    .parse()
                    .map_err(|_| BridgeError::Config(format!("Invalid port in {:?}", addr)))?;
            }
            None => config.connection.host = addr,
        }
    }

    Ok(config)
}

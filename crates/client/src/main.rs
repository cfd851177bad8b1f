mod app;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use app::ClientApp;
use bastion::net::{DEFAULT_PORT, DEFAULT_TICK_RATE, DisconnectPolicy, ServerConnection};

#[derive(Parser)]
#[command(name = "bastion-client")]
#[command(about = "Headless Bastion arena client")]
struct Args {
    /// Server hostname or address to connect to
    #[arg(short, long, default_value = "127.0.0.1")]
    server: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,

    /// Deactivate remote mirrors when the connection drops instead of
    /// freezing them in place
    #[arg(long)]
    clear_on_disconnect: bool,

    /// Exit after this many seconds (runs until killed by default)
    #[arg(long)]
    run_for: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let policy = if args.clear_on_disconnect {
        DisconnectPolicy::ClearMirrors
    } else {
        DisconnectPolicy::RetainMirrors
    };
    let connection = ServerConnection::with_policy(args.server, args.port, policy);

    log::info!("Connecting on port {}", args.port);
    let mut app = ClientApp::new(connection, args.tick_rate, args.run_for.map(Duration::from_secs));
    app.run();

    Ok(())
}

mod config;
mod events;
mod server;

use anyhow::Result;
use clap::Parser;

use config::ServerConfig;
use server::GameServer;

#[derive(Parser)]
#[command(name = "bastion-server")]
#[command(about = "Bastion arena game server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = bastion::net::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = bastion::net::DEFAULT_TICK_RATE)]
    tick_rate: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig {
        tick_rate: args.tick_rate,
    };
    let bind_addr = format!("{}:{}", args.bind, args.port);

    let mut server = GameServer::new(&bind_addr, config)?;
    log::info!("Server started on {}", server.local_addr());
    server.run();
    log::info!("Server shutting down");

    Ok(())
}

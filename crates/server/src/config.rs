use bastion::net::DEFAULT_TICK_RATE;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

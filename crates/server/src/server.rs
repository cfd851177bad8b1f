use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bastion::net::{AuthorityRelay, ConnectionRegistry, Directive, NetEvent};

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};

/// The authoritative server: one registry, one relay, one
/// single-threaded tick loop. All socket work is non-blocking and
/// happens inside `tick_once`; a socket failure anywhere finalizes that
/// connection's teardown within the same tick.
pub struct GameServer {
    registry: ConnectionRegistry,
    relay: AuthorityRelay,
    config: ServerConfig,
    tick: u64,
    tick_duration: Duration,
    last_tick_time: Instant,
    accumulator: Duration,
    running: Arc<AtomicBool>,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer {
    pub fn new(bind_addr: &str, config: ServerConfig) -> io::Result<Self> {
        let registry = ConnectionRegistry::bind(bind_addr)?;
        let tick_duration = Duration::from_secs_f64(1.0 / config.tick_rate as f64);

        Ok(Self {
            registry,
            relay: AuthorityRelay::new(),
            config,
            tick: 0,
            tick_duration,
            last_tick_time: Instant::now(),
            accumulator: Duration::ZERO,
            running: Arc::new(AtomicBool::new(true)),
            pending_events: VecDeque::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.registry.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            tick: self.tick,
            client_count: self.registry.active_count(),
            max_clients: self.registry.capacity(),
            live_attacks: self.relay.live_attack_count(),
        }
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            for event in self.pending_events.drain(..) {
                match event {
                    ServerEvent::ClientConnected { slot, addr } => {
                        log::info!("client {slot} connected from {addr}");
                    }
                    ServerEvent::ClientDisconnected { slot, reason } => {
                        log::info!("client {slot} {}", reason.as_str());
                    }
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick_time;
        self.last_tick_time = now;
        self.accumulator += delta;

        self.process_network();

        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            let dt = 1.0 / self.config.tick_rate as f32;
            let directives = self.relay.tick(dt);
            self.execute(directives);
            self.tick += 1;
        }

        for slot in self.registry.flush() {
            self.note_disconnect(slot, DisconnectReason::WriteFailed);
        }
    }

    fn process_network(&mut self) {
        for (slot, addr) in self.registry.poll_accept() {
            self.relay.client_connected(slot);
            self.pending_events
                .push_back(ServerEvent::ClientConnected { slot, addr });
        }

        let mut directives = Vec::new();
        let mut dropped = Vec::new();
        for event in self.registry.receive() {
            match event {
                NetEvent::Message { slot, message } => {
                    directives.extend(self.relay.handle_message(slot, &message));
                }
                NetEvent::Disconnected { slot } => dropped.push(slot),
            }
        }
        self.execute(directives);
        for slot in dropped {
            self.note_disconnect(slot, DisconnectReason::StreamClosed);
        }
    }

    /// Executes relay directives against the registry. A recipient whose
    /// write fails is torn down on the spot, which can fan out further
    /// directives (its disconnect notice); those are executed before the
    /// rest of the batch would lose ordering.
    fn execute(&mut self, directives: Vec<Directive>) {
        for directive in directives {
            match directive {
                Directive::Send { slot, message } => {
                    let was_active = self.registry.is_active(slot);
                    if !self.registry.send(slot, &message) && was_active {
                        self.note_disconnect(slot, DisconnectReason::WriteFailed);
                    }
                }
                Directive::Broadcast { message, exclude } => {
                    for slot in self.registry.broadcast(&message, exclude) {
                        self.note_disconnect(slot, DisconnectReason::WriteFailed);
                    }
                }
            }
        }
    }

    fn note_disconnect(&mut self, slot: u8, reason: DisconnectReason) {
        self.pending_events
            .push_back(ServerEvent::ClientDisconnected { slot, reason });
        let directives = self.relay.client_disconnected(slot);
        self.execute(directives);
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub tick: u64,
    pub client_count: usize,
    pub max_clients: usize,
    pub live_attacks: usize,
}

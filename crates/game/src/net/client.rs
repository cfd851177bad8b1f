use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use glam::Vec2;
use log::{info, warn};

use super::protocol::{
    AttackType, DamageRequest, FrameReader, Hello, MatchResultReport, Message, PROTOCOL_STRIKE_LIMIT,
    PROTOCOL_VERSION, PlayerStateUpdate, SpawnAttackRequest, Welcome,
};
use super::replication::{DisconnectPolicy, ReplicationEvent, ReplicationState};
use crate::world::ObjectKind;

/// Bytes the client may leave queued toward the server before the
/// connection is considered broken.
const OUTBOX_LIMIT: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unresolved,
    Resolving,
    Connecting,
    Connected,
}

/// The client's single connection to the server.
///
/// Progress happens only through `pump`, called once per tick; no
/// callback or blocking read ever runs on the caller's thread. Hostname
/// resolution and the connect call are inherently blocking, so each runs
/// on a short-lived helper thread whose sole output is a value on an
/// mpsc channel the pump polls; connection state is mutated exclusively
/// by the tick thread.
pub struct ServerConnection {
    host: String,
    port: u16,
    state: ConnectionState,
    resolve_rx: Option<Receiver<io::Result<Vec<SocketAddr>>>>,
    connect_rx: Option<Receiver<io::Result<TcpStream>>>,
    stream: Option<TcpStream>,
    reader: FrameReader,
    outbox: Vec<u8>,
    strikes: u32,
    broken: bool,
    assigned: Option<Welcome>,
    policy: DisconnectPolicy,
}

impl ServerConnection {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_policy(host, port, DisconnectPolicy::default())
    }

    pub fn with_policy(host: impl Into<String>, port: u16, policy: DisconnectPolicy) -> Self {
        Self {
            host: host.into(),
            port,
            state: ConnectionState::Unresolved,
            resolve_rx: None,
            connect_rx: None,
            stream: None,
            reader: FrameReader::new(),
            outbox: Vec::new(),
            strikes: 0,
            broken: false,
            assigned: None,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// The id the server assigned in its welcome, once one arrived.
    pub fn assigned_id(&self) -> Option<u8> {
        self.assigned.map(|w| w.client_id)
    }

    pub fn assigned_team(&self) -> Option<bool> {
        self.assigned.map(|w| w.team)
    }

    /// Kicks off asynchronous hostname resolution. Ignored unless the
    /// connection is currently unresolved, so callers may invoke it
    /// again after a failure to retry.
    pub fn begin_connect(&mut self) {
        if self.state != ConnectionState::Unresolved {
            return;
        }
        let host = self.host.clone();
        let port = self.port;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = (host.as_str(), port)
                .to_socket_addrs()
                .map(|addrs| addrs.collect::<Vec<_>>());
            let _ = tx.send(result);
        });
        self.resolve_rx = Some(rx);
        self.state = ConnectionState::Resolving;
        info!("resolving {}:{}", self.host, port);
    }

    /// One non-blocking pump step; the only way this connection makes
    /// progress. Returns replication events produced by inbound
    /// messages.
    pub fn pump(&mut self, replication: &mut ReplicationState) -> Vec<ReplicationEvent> {
        match self.state {
            ConnectionState::Unresolved => Vec::new(),
            ConnectionState::Resolving => {
                self.poll_resolution();
                Vec::new()
            }
            ConnectionState::Connecting => {
                self.poll_connect();
                Vec::new()
            }
            ConnectionState::Connected => self.pump_connected(replication),
        }
    }

    pub fn send_state_update(&mut self, update: PlayerStateUpdate) {
        self.send_message(&Message::PlayerState(update));
    }

    pub fn send_spawn_attack(&mut self, attack_type: AttackType, target: Vec2) {
        self.send_message(&Message::SpawnAttack(SpawnAttackRequest {
            attack_type: attack_type as u8,
            target_x: target.x,
            target_y: target.y,
        }));
    }

    /// Reports locally detected damage. Only the amount travels; the
    /// server owns the resulting health.
    pub fn send_damage(&mut self, kind: ObjectKind, target: u8, amount: i32) {
        let request = DamageRequest { target, amount };
        let message = match kind {
            ObjectKind::Player => Message::DamagePlayer(request),
            ObjectKind::Minion => Message::DamageMinion(request),
            ObjectKind::Tower => Message::DamageTower(request),
            ObjectKind::Base => Message::DamageBase(request),
            ObjectKind::Attack => {
                warn!("attacks cannot take damage");
                return;
            }
        };
        self.send_message(&message);
    }

    pub fn send_match_result(&mut self, winning_team: bool) {
        self.send_message(&Message::MatchResult(MatchResultReport { winning_team }));
    }

    fn poll_resolution(&mut self) {
        let Some(rx) = &self.resolve_rx else {
            self.state = ConnectionState::Unresolved;
            return;
        };
        match rx.try_recv() {
            Ok(Ok(addrs)) if !addrs.is_empty() => {
                self.resolve_rx = None;
                let (tx, rx) = mpsc::channel();
                thread::spawn(move || {
                    let _ = tx.send(TcpStream::connect(&addrs[..]));
                });
                self.connect_rx = Some(rx);
                self.state = ConnectionState::Connecting;
            }
            Ok(Ok(_)) => {
                warn!("{} resolved to no addresses", self.host);
                self.resolve_rx = None;
                self.state = ConnectionState::Unresolved;
            }
            Ok(Err(e)) => {
                warn!("failed to resolve {}: {e}", self.host);
                self.resolve_rx = None;
                self.state = ConnectionState::Unresolved;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                warn!("resolver gave up on {}", self.host);
                self.resolve_rx = None;
                self.state = ConnectionState::Unresolved;
            }
        }
    }

    fn poll_connect(&mut self) {
        let Some(rx) = &self.connect_rx else {
            self.state = ConnectionState::Unresolved;
            return;
        };
        match rx.try_recv() {
            Ok(Ok(stream)) => {
                self.connect_rx = None;
                if let Err(e) = stream.set_nonblocking(true) {
                    warn!("failed to configure server socket: {e}");
                    self.state = ConnectionState::Unresolved;
                    return;
                }
                let _ = stream.set_nodelay(true);
                self.stream = Some(stream);
                self.state = ConnectionState::Connected;
                info!("connected to {}:{}", self.host, self.port);
                // Introduce ourselves right away; the welcome reply
                // carries our assigned id.
                self.send_message(&Message::Hello(Hello {
                    protocol_version: PROTOCOL_VERSION,
                }));
            }
            Ok(Err(e)) => {
                warn!("failed to connect to {}:{}: {e}", self.host, self.port);
                self.connect_rx = None;
                self.state = ConnectionState::Unresolved;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                warn!("connect attempt to {} vanished", self.host);
                self.connect_rx = None;
                self.state = ConnectionState::Unresolved;
            }
        }
    }

    fn pump_connected(&mut self, replication: &mut ReplicationState) -> Vec<ReplicationEvent> {
        let mut events = Vec::new();

        if self.broken {
            return self.teardown(replication);
        }
        self.flush_outbox();
        if self.broken {
            return self.teardown(replication);
        }

        let mut buf = [0u8; 512];
        loop {
            let read = match self.stream.as_mut() {
                Some(stream) => stream.read(&mut buf),
                None => return self.teardown(replication),
            };
            match read {
                Ok(0) => {
                    events.extend(self.teardown(replication));
                    return events;
                }
                Ok(n) => {
                    self.reader.push(&buf[..n]);
                    loop {
                        match self.reader.next_message() {
                            Ok(Some(message)) => {
                                self.handle_message(message, replication, &mut events)
                            }
                            Ok(None) => break,
                            Err(e) => {
                                self.strikes += 1;
                                warn!(
                                    "dropped malformed server message ({e}), strike {}/{}",
                                    self.strikes, PROTOCOL_STRIKE_LIMIT
                                );
                                if self.strikes >= PROTOCOL_STRIKE_LIMIT {
                                    events.extend(self.teardown(replication));
                                    return events;
                                }
                            }
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("read from server failed: {e}");
                    events.extend(self.teardown(replication));
                    return events;
                }
            }
        }

        events
    }

    fn handle_message(
        &mut self,
        message: Message,
        replication: &mut ReplicationState,
        events: &mut Vec<ReplicationEvent>,
    ) {
        match message {
            Message::Welcome(welcome) => {
                info!(
                    "welcomed as client {} on team {}",
                    welcome.client_id,
                    if welcome.team { "right" } else { "left" }
                );
                self.assigned = Some(welcome);
                events.push(ReplicationEvent::WelcomeReceived {
                    client_id: welcome.client_id,
                    team: welcome.team,
                });
            }
            other => events.extend(replication.apply(&other)),
        }
    }

    fn send_message(&mut self, message: &Message) {
        if self.state != ConnectionState::Connected {
            return;
        }
        match message.encode() {
            Ok(bytes) => self.outbox.extend_from_slice(&bytes),
            Err(e) => {
                warn!("failed to encode {:?}: {e}", message.tag());
                return;
            }
        }
        self.flush_outbox();
    }

    fn flush_outbox(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let mut written = 0;
        while written < self.outbox.len() {
            match stream.write(&self.outbox[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("write to server failed: {e}");
                    self.broken = true;
                    break;
                }
            }
        }
        self.outbox.drain(..written);
        if self.outbox.len() > OUTBOX_LIMIT {
            warn!("server is not draining our stream");
            self.broken = true;
        }
    }

    /// Clean teardown after any failure while connected: the socket is
    /// closed and the state machine returns to UNRESOLVED within the
    /// same tick. What happens to mirrored remote objects is governed by
    /// the configured policy.
    fn teardown(&mut self, replication: &mut ReplicationState) -> Vec<ReplicationEvent> {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.reader.clear();
        self.outbox.clear();
        self.strikes = 0;
        self.broken = false;
        self.assigned = None;
        self.state = ConnectionState::Unresolved;
        warn!("connection to server lost");
        replication.handle_connection_lost(self.policy)
    }
}

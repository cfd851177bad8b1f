use std::time::{Duration, Instant};

use glam::Vec2;
use log::info;

use bastion::dispatch::{Dispatcher, Subsystem, SubsystemKind};
use bastion::net::{
    AttackType, ConnectionState, MatchPhase, ReplicationEvent, ReplicationState, ServerConnection,
};
use bastion::world::{base_position, player_spawn};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const ATTACK_COOLDOWN: f32 = 2.5;

/// Walks the local player on a small deterministic patrol around its
/// spawn point. Stands in for the input-driven movement of the real
/// frontend.
struct PlayerDirector {
    origin: Option<Vec2>,
    t: f32,
}

impl Subsystem for PlayerDirector {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Player
    }

    fn on_tick(&mut self, dt: f32, state: &mut ReplicationState) {
        let Some(id) = state.local_player_id() else {
            self.origin = None;
            return;
        };
        let origin = *self.origin.get_or_insert_with(|| player_spawn(id));
        self.t += dt;

        let offset = Vec2::new((self.t * 0.8).cos() * 48.0, (self.t * 0.8).sin() * 32.0);
        let facing_left = (self.t * 0.8).sin() < 0.0;
        state.update_local_player(origin + offset, 1, facing_left);
    }
}

/// Keeps the local minion trailing its owner once the match is running.
struct MinionDirector;

impl Subsystem for MinionDirector {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Minion
    }

    fn on_tick(&mut self, _dt: f32, state: &mut ReplicationState) {
        let Some(id) = state.local_player_id() else {
            return;
        };
        if state.phase() != MatchPhase::Running {
            state.update_local_minion(false, Vec2::ZERO, 0, false);
            return;
        }
        let owner = state.players()[id as usize];
        let trail = Vec2::new(if owner.facing_left { 40.0 } else { -40.0 }, 24.0);
        state.update_local_minion(true, owner.position + trail, 1, owner.facing_left);
    }
}

/// Logs what the replication layer learns; the closest thing a headless
/// client has to a HUD.
struct StatusHud {
    ticks: u64,
}

impl Subsystem for StatusHud {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Hud
    }

    fn on_tick(&mut self, _dt: f32, state: &mut ReplicationState) {
        self.ticks += 1;
        if self.ticks % 600 == 0 {
            let players = state.players().iter().filter(|p| p.active).count();
            let attacks = state.attacks().iter().filter(|a| a.active).count();
            info!("{players} players and {attacks} attacks in view, phase {:?}", state.phase());
        }
    }

    fn on_event(&mut self, event: &ReplicationEvent) {
        match event {
            ReplicationEvent::WelcomeReceived { client_id, team } => {
                info!(
                    "joined as client {client_id} on the {} team",
                    if *team { "right" } else { "left" }
                );
            }
            ReplicationEvent::GameStarted => info!("match started"),
            ReplicationEvent::GameEnded { winning_team } => {
                info!(
                    "match over, the {} team wins",
                    if *winning_team { "right" } else { "left" }
                );
            }
            ReplicationEvent::ObjectDestroyed { kind, id } => {
                info!("{kind:?} {id} destroyed");
            }
            ReplicationEvent::RemoteDisconnected { client_id } => {
                info!("client {client_id} left");
            }
            ReplicationEvent::ConnectionLost => info!("lost the server"),
        }
    }

    fn on_shutdown(&mut self) {
        info!("client shutting down");
    }
}

pub struct ClientApp {
    connection: ServerConnection,
    replication: ReplicationState,
    dispatcher: Dispatcher,
    tick_duration: Duration,
    attack_cooldown: f32,
    runtime: Option<Duration>,
}

impl ClientApp {
    pub fn new(connection: ServerConnection, tick_rate: u32, runtime: Option<Duration>) -> Self {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(PlayerDirector {
            origin: None,
            t: 0.0,
        }));
        dispatcher.register(Box::new(MinionDirector));
        dispatcher.register(Box::new(StatusHud { ticks: 0 }));

        Self {
            connection,
            replication: ReplicationState::new(),
            dispatcher,
            tick_duration: Duration::from_secs_f64(1.0 / tick_rate as f64),
            attack_cooldown: 0.0,
            runtime,
        }
    }

    pub fn run(&mut self) {
        let started = Instant::now();
        let mut last_tick = Instant::now();
        let mut retry_at = Instant::now();

        self.connection.begin_connect();

        loop {
            if let Some(runtime) = self.runtime {
                if started.elapsed() >= runtime {
                    break;
                }
            }

            let now = Instant::now();
            let dt = (now - last_tick).as_secs_f32();
            last_tick = now;

            if self.connection.state() == ConnectionState::Unresolved && now >= retry_at {
                self.connection.begin_connect();
                retry_at = now + RECONNECT_DELAY;
            }

            let events = self.connection.pump(&mut self.replication);
            for event in &events {
                if let ReplicationEvent::WelcomeReceived { client_id, team } = event {
                    self.replication.claim_local_player(*client_id, *team);
                }
                self.dispatcher.dispatch(event);
            }

            self.dispatcher.tick_all(dt, &mut self.replication);

            if self.connection.is_connected() {
                if let Some(update) = self.replication.local_state_update() {
                    self.connection.send_state_update(update);
                }
                self.maybe_fire(dt);
            }

            self.dispatcher.render_all(&self.replication);
            std::thread::sleep(self.tick_duration);
        }

        self.dispatcher.shutdown_all();
    }

    /// Lobs a fireball at the enemy base every few seconds while the
    /// match runs; enough intent to exercise the spawn path end to end.
    fn maybe_fire(&mut self, dt: f32) {
        self.attack_cooldown -= dt;
        if self.attack_cooldown > 0.0 || self.replication.phase() != MatchPhase::Running {
            return;
        }
        let Some(team) = self.connection.assigned_team() else {
            return;
        };
        let enemy_base = base_position(if team { 0 } else { 1 });
        self.connection
            .send_spawn_attack(AttackType::Fireball, enemy_base);
        self.attack_cooldown = ATTACK_COOLDOWN;
    }
}

use glam::Vec2;
use log::warn;

use super::protocol::{
    DamageNotice, DestroyObject, Message, ObjectType, PlayerDisconnect, PlayerStateNotice,
    PlayerStateUpdate, SpawnAttackNotice,
};
use crate::world::{
    base_position, base_team, player_spawn, tower_position, tower_team, BASE_COUNT,
    BASE_MAX_HEALTH, MAX_ATTACKS, MAX_CLIENTS, MINION_MAX_HEALTH, ObjectKind, PLAYER_MAX_HEALTH,
    TOWER_COUNT, TOWER_MAX_HEALTH,
};

/// What to do with mirrored remote objects when the connection to the
/// server is lost. The source behavior is to freeze them in their
/// last-known state until a disconnect notice or a fresh welcome says
/// otherwise; `ClearMirrors` deactivates them instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectPolicy {
    #[default]
    RetainMirrors,
    ClearMirrors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPhase {
    #[default]
    Waiting,
    Running,
    Finished {
        winning_team: bool,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerMirror {
    pub active: bool,
    pub is_local: bool,
    pub team: bool,
    pub position: Vec2,
    pub anim_row: u8,
    pub facing_left: bool,
    pub health: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinionMirror {
    pub active: bool,
    pub is_local: bool,
    pub team: bool,
    pub position: Vec2,
    pub anim_row: u8,
    pub facing_left: bool,
    pub health: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct TowerMirror {
    pub active: bool,
    pub team: bool,
    pub position: Vec2,
    pub health: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct BaseMirror {
    pub active: bool,
    pub team: bool,
    pub position: Vec2,
    pub health: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttackMirror {
    pub active: bool,
    pub attack_id: u32,
    pub owner: u8,
    pub team: bool,
    pub attack_type: u8,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Something the reconciliation pass learned that a consumer may care
/// about; fed to the subsystem dispatcher by the owning loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplicationEvent {
    WelcomeReceived { client_id: u8, team: bool },
    GameStarted,
    GameEnded { winning_team: bool },
    ObjectDestroyed { kind: ObjectKind, id: u32 },
    RemoteDisconnected { client_id: u8 },
    ConnectionLost,
}

/// Client-side view of every replicated object, one fixed table per
/// kind. The single instance is owned by whoever runs the tick loop and
/// passed around explicitly; nothing here is process-global.
///
/// Two code paths touch these tables and must never collide: the local
/// path (input mutates the one `is_local` slot per kind, which is then
/// serialized out once per tick) and the remote path (inbound messages
/// mutate every other slot, keyed by the id embedded in the message).
pub struct ReplicationState {
    local_player: Option<u8>,
    players: [PlayerMirror; MAX_CLIENTS],
    minions: [MinionMirror; MAX_CLIENTS],
    towers: [TowerMirror; TOWER_COUNT],
    bases: [BaseMirror; BASE_COUNT],
    attacks: [AttackMirror; MAX_ATTACKS],
    phase: MatchPhase,
}

impl Default for ReplicationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicationState {
    pub fn new() -> Self {
        Self {
            local_player: None,
            players: [PlayerMirror::default(); MAX_CLIENTS],
            minions: [MinionMirror::default(); MAX_CLIENTS],
            towers: std::array::from_fn(|index| TowerMirror {
                active: true,
                team: tower_team(index),
                position: tower_position(index),
                health: TOWER_MAX_HEALTH,
            }),
            bases: std::array::from_fn(|index| BaseMirror {
                active: true,
                team: base_team(index),
                position: base_position(index),
                health: BASE_MAX_HEALTH,
            }),
            attacks: [AttackMirror::default(); MAX_ATTACKS],
            phase: MatchPhase::Waiting,
        }
    }

    pub fn local_player_id(&self) -> Option<u8> {
        self.local_player
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn players(&self) -> &[PlayerMirror] {
        &self.players
    }

    pub fn minions(&self) -> &[MinionMirror] {
        &self.minions
    }

    pub fn towers(&self) -> &[TowerMirror] {
        &self.towers
    }

    pub fn bases(&self) -> &[BaseMirror] {
        &self.bases
    }

    pub fn attacks(&self) -> &[AttackMirror] {
        &self.attacks
    }

    pub fn is_active(&self, kind: ObjectKind, index: usize) -> bool {
        match kind {
            ObjectKind::Player => self.players.get(index).is_some_and(|p| p.active),
            ObjectKind::Minion => self.minions.get(index).is_some_and(|m| m.active),
            ObjectKind::Tower => self.towers.get(index).is_some_and(|t| t.active),
            ObjectKind::Base => self.bases.get(index).is_some_and(|b| b.active),
            ObjectKind::Attack => self.attacks.get(index).is_some_and(|a| a.active),
        }
    }

    pub fn position(&self, kind: ObjectKind, index: usize) -> Option<Vec2> {
        match kind {
            ObjectKind::Player => self.players.get(index).map(|p| p.position),
            ObjectKind::Minion => self.minions.get(index).map(|m| m.position),
            ObjectKind::Tower => self.towers.get(index).map(|t| t.position),
            ObjectKind::Base => self.bases.get(index).map(|b| b.position),
            ObjectKind::Attack => self.attacks.get(index).map(|a| a.position),
        }
    }

    /// Attacks carry no health; asking for one returns `None`.
    pub fn health(&self, kind: ObjectKind, index: usize) -> Option<i32> {
        match kind {
            ObjectKind::Player => self.players.get(index).map(|p| p.health),
            ObjectKind::Minion => self.minions.get(index).map(|m| m.health),
            ObjectKind::Tower => self.towers.get(index).map(|t| t.health),
            ObjectKind::Base => self.bases.get(index).map(|b| b.health),
            ObjectKind::Attack => None,
        }
    }

    /// Designates the slot assigned by the welcome as ours. This is an
    /// explicit local call (inbound messages never set `is_local`) and
    /// it keeps the at-most-one-local invariant by clearing any earlier
    /// designation first.
    pub fn claim_local_player(&mut self, client_id: u8, team: bool) {
        let index = client_id as usize;
        if index >= MAX_CLIENTS {
            warn!("cannot claim out-of-range player slot {client_id}");
            return;
        }
        for player in &mut self.players {
            player.is_local = false;
        }
        for minion in &mut self.minions {
            minion.is_local = false;
        }

        self.local_player = Some(client_id);
        self.players[index] = PlayerMirror {
            active: true,
            is_local: true,
            team,
            position: player_spawn(client_id),
            health: PLAYER_MAX_HEALTH,
            ..Default::default()
        };
        self.minions[index] = MinionMirror {
            is_local: true,
            team,
            ..Default::default()
        };
    }

    pub fn update_local_player(&mut self, position: Vec2, anim_row: u8, facing_left: bool) {
        let Some(index) = self.local_player.map(usize::from) else {
            return;
        };
        let player = &mut self.players[index];
        player.position = position;
        player.anim_row = anim_row;
        player.facing_left = facing_left;
    }

    pub fn update_local_minion(
        &mut self,
        active: bool,
        position: Vec2,
        anim_row: u8,
        facing_left: bool,
    ) {
        let Some(index) = self.local_player.map(usize::from) else {
            return;
        };
        let minion = &mut self.minions[index];
        if active && !minion.active {
            minion.health = MINION_MAX_HEALTH;
        }
        minion.active = active;
        minion.position = position;
        minion.anim_row = anim_row;
        minion.facing_left = facing_left;
    }

    /// Serializes the local slots into the once-per-tick state request.
    /// Returns `None` until a slot has been claimed.
    pub fn local_state_update(&self) -> Option<PlayerStateUpdate> {
        let client_id = self.local_player?;
        let player = &self.players[client_id as usize];
        let minion = &self.minions[client_id as usize];
        Some(PlayerStateUpdate {
            client_id,
            x: player.position.x,
            y: player.position.y,
            anim_row: player.anim_row,
            facing_left: player.facing_left,
            minion_active: minion.active,
            minion_x: minion.position.x,
            minion_y: minion.position.y,
            minion_anim_row: minion.anim_row,
            minion_facing_left: minion.facing_left,
        })
    }

    /// Applies one inbound authoritative message to the mirror tables.
    pub fn apply(&mut self, message: &Message) -> Vec<ReplicationEvent> {
        let mut events = Vec::new();
        match message {
            Message::PlayerStateNotice(notice) => self.apply_player_state(notice),
            Message::SpawnAttackNotice(notice) => self.apply_spawn_attack(notice),
            Message::PlayerDamageNotice(notice) => self.apply_player_damage(notice),
            Message::TowerDamageNotice(notice) => self.apply_tower_damage(notice),
            Message::BaseDamageNotice(notice) => self.apply_base_damage(notice),
            Message::MinionDamageNotice(notice) => self.apply_minion_damage(notice, &mut events),
            Message::DestroyObject(notice) => self.apply_destroy(notice, &mut events),
            Message::PlayerDisconnect(notice) => self.apply_disconnect(notice, &mut events),
            Message::GameStart => {
                if self.phase != MatchPhase::Running {
                    self.phase = MatchPhase::Running;
                    events.push(ReplicationEvent::GameStarted);
                }
            }
            Message::GameResult(result) => {
                self.phase = MatchPhase::Finished {
                    winning_team: result.winning_team,
                };
                events.push(ReplicationEvent::GameEnded {
                    winning_team: result.winning_team,
                });
            }
            Message::Welcome(_) => {
                // Handled by the connection; nothing to mirror.
            }
            other if other.is_request() => {
                warn!("ignoring client request {:?} on a client stream", other.tag());
            }
            _ => {}
        }
        events
    }

    /// Tears down mirrored state per the configured policy after the
    /// connection to the server is lost. Towers and bases are static
    /// fixtures and keep their last-known health either way.
    pub fn handle_connection_lost(&mut self, policy: DisconnectPolicy) -> Vec<ReplicationEvent> {
        if policy == DisconnectPolicy::ClearMirrors {
            self.deactivate_remotes();
        }
        vec![ReplicationEvent::ConnectionLost]
    }

    pub fn deactivate_remotes(&mut self) {
        for player in &mut self.players {
            if !player.is_local {
                player.active = false;
            }
        }
        for minion in &mut self.minions {
            if !minion.is_local {
                minion.active = false;
            }
        }
        for attack in &mut self.attacks {
            attack.active = false;
        }
    }

    fn apply_player_state(&mut self, notice: &PlayerStateNotice) {
        let index = notice.client_id as usize;
        if index >= MAX_CLIENTS {
            warn!("state notice for out-of-range player {}", notice.client_id);
            return;
        }
        // Our own slot is driven by input, never by the echo of it.
        if self.local_player == Some(notice.client_id) {
            return;
        }

        let player = &mut self.players[index];
        if !player.active {
            *player = PlayerMirror {
                active: true,
                team: notice.team,
                health: PLAYER_MAX_HEALTH,
                ..Default::default()
            };
        }
        player.position = Vec2::new(notice.x, notice.y);
        player.anim_row = notice.anim_row;
        player.facing_left = notice.facing_left;

        let minion = &mut self.minions[index];
        if notice.minion_active {
            if !minion.active {
                *minion = MinionMirror {
                    active: true,
                    team: notice.team,
                    health: MINION_MAX_HEALTH,
                    ..Default::default()
                };
            }
            minion.position = Vec2::new(notice.minion_x, notice.minion_y);
            minion.anim_row = notice.minion_anim_row;
            minion.facing_left = notice.minion_facing_left;
        } else {
            minion.active = false;
        }
    }

    fn apply_spawn_attack(&mut self, notice: &SpawnAttackNotice) {
        let mirror = AttackMirror {
            active: true,
            attack_id: notice.attack_id,
            owner: notice.owner,
            team: notice.team,
            attack_type: notice.attack_type,
            position: Vec2::new(notice.x, notice.y),
            velocity: Vec2::new(notice.vel_x, notice.vel_y),
        };
        if let Some(existing) = self
            .attacks
            .iter_mut()
            .find(|a| a.active && a.attack_id == notice.attack_id)
        {
            *existing = mirror;
            return;
        }
        match self.attacks.iter_mut().find(|a| !a.active) {
            Some(free) => *free = mirror,
            None => warn!("attack table full, dropping attack {}", notice.attack_id),
        }
    }

    fn apply_player_damage(&mut self, notice: &DamageNotice) {
        let index = notice.target as usize;
        if index >= MAX_CLIENTS {
            warn!("damage notice for out-of-range player {}", notice.target);
            return;
        }
        // Health is server-owned even on the local slot.
        self.players[index].health = notice.health;
    }

    fn apply_tower_damage(&mut self, notice: &DamageNotice) {
        let index = notice.target as usize;
        if index >= TOWER_COUNT {
            warn!("damage notice for out-of-range tower {}", notice.target);
            return;
        }
        self.towers[index].health = notice.health;
    }

    fn apply_base_damage(&mut self, notice: &DamageNotice) {
        let index = notice.target as usize;
        if index >= BASE_COUNT {
            warn!("damage notice for out-of-range base {}", notice.target);
            return;
        }
        self.bases[index].health = notice.health;
    }

    fn apply_minion_damage(&mut self, notice: &DamageNotice, events: &mut Vec<ReplicationEvent>) {
        let index = notice.target as usize;
        if index >= MAX_CLIENTS {
            warn!("damage notice for out-of-range minion {}", notice.target);
            return;
        }
        let minion = &mut self.minions[index];
        minion.health = notice.health;
        // There is no destroy notice for minions; a non-positive
        // confirmed health is the destruction signal.
        if notice.health <= 0 && minion.active {
            minion.active = false;
            events.push(ReplicationEvent::ObjectDestroyed {
                kind: ObjectKind::Minion,
                id: notice.target as u32,
            });
        }
    }

    fn apply_destroy(&mut self, notice: &DestroyObject, events: &mut Vec<ReplicationEvent>) {
        let Some(object_type) = ObjectType::from_u8(notice.object_type) else {
            warn!("destroy notice with unknown object type {}", notice.object_type);
            return;
        };
        let id = notice.object_id;
        let kind = match object_type {
            ObjectType::Player => {
                let index = id as usize;
                if index >= MAX_CLIENTS {
                    warn!("destroy notice for out-of-range player {id}");
                    return;
                }
                self.players[index].active = false;
                ObjectKind::Player
            }
            ObjectType::Attack => {
                if let Some(attack) = self
                    .attacks
                    .iter_mut()
                    .find(|a| a.active && a.attack_id == id)
                {
                    attack.active = false;
                }
                ObjectKind::Attack
            }
            ObjectType::Tower => {
                let index = id as usize;
                if index >= TOWER_COUNT {
                    warn!("destroy notice for out-of-range tower {id}");
                    return;
                }
                self.towers[index].active = false;
                ObjectKind::Tower
            }
            ObjectType::Base => {
                let index = id as usize;
                if index >= BASE_COUNT {
                    warn!("destroy notice for out-of-range base {id}");
                    return;
                }
                self.bases[index].active = false;
                ObjectKind::Base
            }
        };
        events.push(ReplicationEvent::ObjectDestroyed { kind, id });
    }

    fn apply_disconnect(&mut self, notice: &PlayerDisconnect, events: &mut Vec<ReplicationEvent>) {
        let index = notice.client_id as usize;
        if index >= MAX_CLIENTS {
            warn!("disconnect notice for out-of-range player {}", notice.client_id);
            return;
        }
        if self.local_player == Some(notice.client_id) {
            // Should never happen; it means the server dropped us while
            // this stream still works.
            warn!("server reported the local player as disconnected");
            self.local_player = None;
        }
        self.players[index] = PlayerMirror::default();
        self.minions[index] = MinionMirror::default();
        events.push(ReplicationEvent::RemoteDisconnected {
            client_id: notice.client_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::GameResult;

    fn state_notice(client_id: u8, team: bool, x: f32, y: f32) -> Message {
        Message::PlayerStateNotice(PlayerStateNotice {
            client_id,
            team,
            x,
            y,
            anim_row: 2,
            facing_left: team,
            minion_active: false,
            minion_x: 0.0,
            minion_y: 0.0,
            minion_anim_row: 0,
            minion_facing_left: false,
        })
    }

    fn local_count(state: &ReplicationState) -> (usize, usize) {
        (
            state.players().iter().filter(|p| p.is_local).count(),
            state.minions().iter().filter(|m| m.is_local).count(),
        )
    }

    #[test]
    fn test_towers_and_bases_start_active() {
        let state = ReplicationState::new();
        assert!(state.towers().iter().all(|t| t.active));
        assert!(state.bases().iter().all(|b| b.active));
        assert_eq!(state.health(ObjectKind::Tower, 0), Some(TOWER_MAX_HEALTH));
        assert_eq!(state.health(ObjectKind::Base, 1), Some(BASE_MAX_HEALTH));
    }

    #[test]
    fn test_claim_local_player_is_exclusive() {
        let mut state = ReplicationState::new();
        state.claim_local_player(0, false);
        state.claim_local_player(1, true);

        assert_eq!(state.local_player_id(), Some(1));
        assert_eq!(local_count(&state), (1, 1));
        assert!(state.players()[1].is_local);
        assert!(!state.players()[0].is_local);
    }

    #[test]
    fn test_inbound_messages_never_set_is_local() {
        let mut state = ReplicationState::new();
        for id in 0..MAX_CLIENTS as u8 {
            state.apply(&state_notice(id, id % 2 == 1, 10.0, 20.0));
        }
        state.apply(&Message::Welcome(crate::net::protocol::Welcome {
            client_id: 2,
            team: false,
        }));
        assert_eq!(local_count(&state), (0, 0));
        assert_eq!(state.local_player_id(), None);
    }

    #[test]
    fn test_lazy_activation_of_remote_player() {
        let mut state = ReplicationState::new();
        assert!(!state.is_active(ObjectKind::Player, 2));

        state.apply(&state_notice(2, true, 300.0, 400.0));

        let player = &state.players()[2];
        assert!(player.active);
        assert!(player.team);
        assert!(!player.is_local);
        assert_eq!(player.health, PLAYER_MAX_HEALTH);
        assert_eq!(player.position, Vec2::new(300.0, 400.0));
    }

    #[test]
    fn test_state_notice_for_local_slot_is_ignored() {
        let mut state = ReplicationState::new();
        state.claim_local_player(0, false);
        state.update_local_player(Vec2::new(50.0, 60.0), 1, false);

        state.apply(&state_notice(0, false, 999.0, 999.0));

        assert_eq!(state.players()[0].position, Vec2::new(50.0, 60.0));
    }

    #[test]
    fn test_minion_piggyback_activates_and_deactivates() {
        let mut state = ReplicationState::new();
        let mut notice = PlayerStateNotice {
            client_id: 1,
            team: true,
            x: 0.0,
            y: 0.0,
            anim_row: 0,
            facing_left: false,
            minion_active: true,
            minion_x: 70.0,
            minion_y: 80.0,
            minion_anim_row: 4,
            minion_facing_left: true,
        };
        state.apply(&Message::PlayerStateNotice(notice));
        let minion = &state.minions()[1];
        assert!(minion.active);
        assert_eq!(minion.position, Vec2::new(70.0, 80.0));
        assert_eq!(minion.health, MINION_MAX_HEALTH);

        notice.minion_active = false;
        state.apply(&Message::PlayerStateNotice(notice));
        assert!(!state.minions()[1].active);
    }

    #[test]
    fn test_damage_notice_applies_verbatim_health() {
        let mut state = ReplicationState::new();
        state.apply(&state_notice(1, true, 0.0, 0.0));

        state.apply(&Message::PlayerDamageNotice(DamageNotice {
            target: 1,
            health: 175,
        }));
        assert_eq!(state.players()[1].health, 175);
        // No destroy notice yet, so the player stays active.
        assert!(state.players()[1].active);

        state.apply(&Message::DestroyObject(DestroyObject {
            object_type: ObjectType::Player as u8,
            object_id: 1,
        }));
        assert!(!state.players()[1].active);
    }

    #[test]
    fn test_damage_applies_to_local_slot_too() {
        let mut state = ReplicationState::new();
        state.claim_local_player(0, false);

        state.apply(&Message::PlayerDamageNotice(DamageNotice {
            target: 0,
            health: 42,
        }));
        assert_eq!(state.players()[0].health, 42);
        assert!(state.players()[0].is_local);
    }

    #[test]
    fn test_minion_destroyed_by_nonpositive_health() {
        let mut state = ReplicationState::new();
        let notice = PlayerStateNotice {
            client_id: 0,
            team: false,
            x: 0.0,
            y: 0.0,
            anim_row: 0,
            facing_left: false,
            minion_active: true,
            minion_x: 1.0,
            minion_y: 1.0,
            minion_anim_row: 0,
            minion_facing_left: false,
        };
        state.apply(&Message::PlayerStateNotice(notice));
        assert!(state.minions()[0].active);

        let events = state.apply(&Message::MinionDamageNotice(DamageNotice {
            target: 0,
            health: -10,
        }));
        assert!(!state.minions()[0].active);
        assert_eq!(
            events,
            vec![ReplicationEvent::ObjectDestroyed {
                kind: ObjectKind::Minion,
                id: 0,
            }]
        );
    }

    #[test]
    fn test_attack_spawn_and_destroy_by_id() {
        let mut state = ReplicationState::new();
        state.apply(&Message::SpawnAttackNotice(SpawnAttackNotice {
            attack_id: 9,
            owner: 0,
            team: false,
            attack_type: 0,
            x: 10.0,
            y: 10.0,
            vel_x: 480.0,
            vel_y: 0.0,
        }));
        assert!(state.attacks().iter().any(|a| a.active && a.attack_id == 9));

        state.apply(&Message::DestroyObject(DestroyObject {
            object_type: ObjectType::Attack as u8,
            object_id: 9,
        }));
        assert!(!state.attacks().iter().any(|a| a.active));
    }

    #[test]
    fn test_disconnect_notice_clears_exactly_one_remote() {
        let mut state = ReplicationState::new();
        state.apply(&state_notice(1, true, 1.0, 1.0));
        state.apply(&state_notice(2, false, 2.0, 2.0));

        let events = state.apply(&Message::PlayerDisconnect(PlayerDisconnect {
            client_id: 1,
        }));
        assert!(!state.players()[1].active);
        assert!(state.players()[2].active);
        assert_eq!(
            events,
            vec![ReplicationEvent::RemoteDisconnected { client_id: 1 }]
        );
    }

    #[test]
    fn test_disconnect_notice_naming_local_drops_designation() {
        let mut state = ReplicationState::new();
        state.claim_local_player(0, false);

        state.apply(&Message::PlayerDisconnect(PlayerDisconnect { client_id: 0 }));

        assert_eq!(state.local_player_id(), None);
        assert_eq!(local_count(&state), (0, 0));
        assert!(!state.players()[0].active);
    }

    #[test]
    fn test_disconnect_policies() {
        let mut retained = ReplicationState::new();
        retained.claim_local_player(0, false);
        retained.apply(&state_notice(1, true, 5.0, 5.0));
        let events = retained.handle_connection_lost(DisconnectPolicy::RetainMirrors);
        assert_eq!(events, vec![ReplicationEvent::ConnectionLost]);
        assert!(retained.players()[1].active, "mirrors freeze in place");

        let mut cleared = ReplicationState::new();
        cleared.claim_local_player(0, false);
        cleared.apply(&state_notice(1, true, 5.0, 5.0));
        cleared.handle_connection_lost(DisconnectPolicy::ClearMirrors);
        assert!(!cleared.players()[1].active);
        assert!(cleared.players()[0].active, "the local slot survives");
        assert!(cleared.towers().iter().all(|t| t.active));
    }

    #[test]
    fn test_phase_transitions_emit_events() {
        let mut state = ReplicationState::new();
        assert_eq!(state.phase(), MatchPhase::Waiting);

        let events = state.apply(&Message::GameStart);
        assert_eq!(events, vec![ReplicationEvent::GameStarted]);
        assert_eq!(state.phase(), MatchPhase::Running);

        // A duplicate start is absorbed.
        assert!(state.apply(&Message::GameStart).is_empty());

        let events = state.apply(&Message::GameResult(GameResult { winning_team: true }));
        assert_eq!(
            events,
            vec![ReplicationEvent::GameEnded { winning_team: true }]
        );
        assert_eq!(state.phase(), MatchPhase::Finished { winning_team: true });
    }

    #[test]
    fn test_local_state_update_round_trip() {
        let mut state = ReplicationState::new();
        assert!(state.local_state_update().is_none());

        state.claim_local_player(1, true);
        state.update_local_player(Vec2::new(100.0, 50.0), 3, true);
        state.update_local_minion(true, Vec2::new(90.0, 48.0), 1, false);

        let update = state.local_state_update().unwrap();
        assert_eq!(update.client_id, 1);
        assert_eq!(update.x, 100.0);
        assert_eq!(update.y, 50.0);
        assert!(update.facing_left);
        assert!(update.minion_active);
        assert_eq!(update.minion_x, 90.0);
    }

    #[test]
    fn test_out_of_range_indices_are_dropped() {
        let mut state = ReplicationState::new();
        state.apply(&state_notice(200, false, 0.0, 0.0));
        state.apply(&Message::PlayerDamageNotice(DamageNotice {
            target: 200,
            health: 1,
        }));
        state.apply(&Message::DestroyObject(DestroyObject {
            object_type: ObjectType::Tower as u8,
            object_id: 99,
        }));
        // Nothing activated, nothing panicked.
        assert!(state.players().iter().all(|p| !p.active));
        assert!(state.towers().iter().all(|t| t.active));
    }
}

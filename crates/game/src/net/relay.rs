use glam::Vec2;
use log::{info, warn};

use super::protocol::{
    AttackType, DamageRequest, DestroyObject, GameResult, Hello, Message, ObjectType,
    PROTOCOL_VERSION, PlayerStateNotice, PlayerStateUpdate, SpawnAttackNotice, SpawnAttackRequest,
};
use crate::world::{
    ATTACK_LIFETIME_SECS, BASE_COUNT, BASE_MAX_HEALTH, MAX_CLIENTS, MINION_MAX_HEALTH,
    PLAYER_MAX_HEALTH, TOWER_COUNT, TOWER_MAX_HEALTH, apply_damage, attack_velocity, in_arena,
    team_for_slot,
};

/// How far outside the arena an attack may fly, and how far outside a
/// requested target may lie, before being rejected or expired.
const ATTACK_MARGIN: f32 = 64.0;

/// A transmission the relay wants executed against the connection
/// registry. Keeping decisions separate from sockets makes the whole
/// authority step testable without a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Send { slot: u8, message: Message },
    Broadcast { message: Message, exclude: Option<u8> },
}

/// Server-side record of an attack in flight.
#[derive(Debug, Clone, Copy)]
pub struct LiveAttack {
    pub attack_id: u32,
    pub owner: u8,
    pub team: bool,
    pub attack_type: AttackType,
    pub position: Vec2,
    pub velocity: Vec2,
    pub age: f32,
}

/// The server's interpretation of every inbound request: validate,
/// mutate the authoritative record, and decide what to echo or
/// broadcast.
///
/// Damage requests are advisory: a client reports only an amount
/// against a target, and the resulting health is recomputed here from
/// the authoritative value, which is what every damage notice carries.
/// Destruction is a side effect of health reaching zero, detected
/// synchronously in the damage handlers.
pub struct AuthorityRelay {
    poses: [Option<PlayerStateUpdate>; MAX_CLIENTS],
    player_health: [i32; MAX_CLIENTS],
    player_active: [bool; MAX_CLIENTS],
    minion_health: [i32; MAX_CLIENTS],
    minion_active: [bool; MAX_CLIENTS],
    tower_health: [i32; TOWER_COUNT],
    tower_active: [bool; TOWER_COUNT],
    base_health: [i32; BASE_COUNT],
    base_active: [bool; BASE_COUNT],
    attacks: Vec<LiveAttack>,
    next_attack_id: u32,
    started: bool,
    winner: Option<bool>,
}

impl Default for AuthorityRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorityRelay {
    pub fn new() -> Self {
        Self {
            poses: [None; MAX_CLIENTS],
            player_health: [PLAYER_MAX_HEALTH; MAX_CLIENTS],
            player_active: [false; MAX_CLIENTS],
            minion_health: [MINION_MAX_HEALTH; MAX_CLIENTS],
            minion_active: [false; MAX_CLIENTS],
            tower_health: [TOWER_MAX_HEALTH; TOWER_COUNT],
            tower_active: [true; TOWER_COUNT],
            base_health: [BASE_MAX_HEALTH; BASE_COUNT],
            base_active: [true; BASE_COUNT],
            attacks: Vec::new(),
            next_attack_id: 1,
            started: false,
            winner: None,
        }
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn winner(&self) -> Option<bool> {
        self.winner
    }

    pub fn player_health(&self, slot: u8) -> Option<i32> {
        self.player_health.get(slot as usize).copied()
    }

    pub fn live_attack_count(&self) -> usize {
        self.attacks.len()
    }

    pub fn live_attacks(&self) -> &[LiveAttack] {
        &self.attacks
    }

    /// Resets the authoritative records tied to a just-claimed slot so
    /// nothing from a previous occupant leaks into the new connection.
    pub fn client_connected(&mut self, slot: u8) {
        let index = slot as usize;
        if index >= MAX_CLIENTS {
            return;
        }
        self.poses[index] = None;
        self.player_active[index] = false;
        self.player_health[index] = PLAYER_MAX_HEALTH;
        self.minion_active[index] = false;
        self.minion_health[index] = MINION_MAX_HEALTH;
    }

    /// Clears a departed slot and tells everyone else. Runs before the
    /// slot index can be handed to a new connection, so the old
    /// occupant's objects are inactive everywhere first.
    pub fn client_disconnected(&mut self, slot: u8) -> Vec<Directive> {
        let index = slot as usize;
        if index >= MAX_CLIENTS {
            return Vec::new();
        }
        let was_known = self.player_active[index] || self.poses[index].is_some();
        self.client_connected(slot);
        if !was_known {
            return Vec::new();
        }
        vec![Directive::Broadcast {
            message: Message::PlayerDisconnect(super::protocol::PlayerDisconnect {
                client_id: slot,
            }),
            exclude: Some(slot),
        }]
    }

    pub fn handle_message(&mut self, slot: u8, message: &Message) -> Vec<Directive> {
        if slot as usize >= MAX_CLIENTS {
            return Vec::new();
        }
        match message {
            Message::Hello(hello) => self.handle_hello(slot, hello),
            Message::PlayerState(update) => self.handle_player_state(slot, update),
            Message::SpawnAttack(request) => self.handle_spawn_attack(slot, request),
            Message::DamagePlayer(request) => self.handle_damage_player(request),
            Message::DamageTower(request) => self.handle_damage_tower(request),
            Message::DamageBase(request) => self.handle_damage_base(request),
            Message::DamageMinion(request) => self.handle_damage_minion(request),
            Message::MatchResult(report) => {
                self.winner = Some(report.winning_team);
                info!(
                    "match reported won by the {} team",
                    if report.winning_team { "right" } else { "left" }
                );
                vec![Directive::Broadcast {
                    message: Message::GameResult(GameResult {
                        winning_team: report.winning_team,
                    }),
                    exclude: None,
                }]
            }
            other => {
                warn!(
                    "client {slot} sent server-only message {:?}, dropping it",
                    other.tag()
                );
                Vec::new()
            }
        }
    }

    /// Advances live attacks one tick and destroys the ones that left
    /// the arena or outlived their fuse.
    pub fn tick(&mut self, dt: f32) -> Vec<Directive> {
        let mut directives = Vec::new();
        self.attacks.retain_mut(|attack| {
            attack.position += attack.velocity * dt;
            attack.age += dt;
            let expired =
                attack.age > ATTACK_LIFETIME_SECS || !in_arena(attack.position, ATTACK_MARGIN);
            if expired {
                directives.push(Directive::Broadcast {
                    message: Message::DestroyObject(DestroyObject {
                        object_type: ObjectType::Attack as u8,
                        object_id: attack.attack_id,
                    }),
                    exclude: None,
                });
            }
            !expired
        });
        directives
    }

    fn active_players(&self) -> usize {
        self.player_active.iter().filter(|active| **active).count()
    }

    fn handle_hello(&mut self, slot: u8, hello: &Hello) -> Vec<Directive> {
        if hello.protocol_version != PROTOCOL_VERSION {
            warn!(
                "client {slot} speaks protocol {} (ours is {})",
                hello.protocol_version, PROTOCOL_VERSION
            );
        }
        // A hello mutates nothing beyond marking the slot's player as
        // present; in particular, a repeated hello does not reset
        // health (that happens when the slot is claimed).
        let index = slot as usize;
        let team = team_for_slot(slot);
        self.player_active[index] = true;
        info!("client {slot} joined the {} team", if team { "right" } else { "left" });

        let mut directives = vec![Directive::Send {
            slot,
            message: Message::Welcome(super::protocol::Welcome {
                client_id: slot,
                team,
            }),
        }];
        if !self.started && self.active_players() >= 2 {
            self.started = true;
            info!("two players present, starting the match");
            directives.push(Directive::Broadcast {
                message: Message::GameStart,
                exclude: None,
            });
        }
        directives
    }

    fn handle_player_state(&mut self, slot: u8, update: &PlayerStateUpdate) -> Vec<Directive> {
        // The embedded id must be the sender's own slot; anything else
        // is a spoof or a confused client.
        if update.client_id != slot {
            warn!(
                "client {slot} sent state for client {}, dropping it",
                update.client_id
            );
            return Vec::new();
        }
        let index = slot as usize;
        if !self.player_active[index] {
            warn!("client {slot} sent state before hello, dropping it");
            return Vec::new();
        }

        self.poses[index] = Some(*update);
        self.minion_active[index] = update.minion_active;

        vec![Directive::Broadcast {
            message: Message::PlayerStateNotice(PlayerStateNotice {
                client_id: slot,
                team: team_for_slot(slot),
                x: update.x,
                y: update.y,
                anim_row: update.anim_row,
                facing_left: update.facing_left,
                minion_active: update.minion_active,
                minion_x: update.minion_x,
                minion_y: update.minion_y,
                minion_anim_row: update.minion_anim_row,
                minion_facing_left: update.minion_facing_left,
            }),
            exclude: Some(slot),
        }]
    }

    fn handle_spawn_attack(&mut self, slot: u8, request: &SpawnAttackRequest) -> Vec<Directive> {
        let Some(attack_type) = AttackType::from_u8(request.attack_type) else {
            warn!("client {slot} requested unknown attack type {}", request.attack_type);
            return Vec::new();
        };
        let target = Vec2::new(request.target_x, request.target_y);
        if !target.is_finite() || !in_arena(target, ATTACK_MARGIN) {
            warn!("client {slot} requested attack toward {target}, out of bounds");
            return Vec::new();
        }
        let Some(pose) = self.poses[slot as usize] else {
            warn!("client {slot} requested an attack before sending any state");
            return Vec::new();
        };

        let origin = Vec2::new(pose.x, pose.y);
        let velocity = attack_velocity(origin, target, attack_type.speed());

        // Ids are never reused: the counter only moves forward for the
        // lifetime of the match, whichever connection asks.
        let attack_id = self.next_attack_id;
        self.next_attack_id += 1;

        self.attacks.push(LiveAttack {
            attack_id,
            owner: slot,
            team: team_for_slot(slot),
            attack_type,
            position: origin,
            velocity,
            age: 0.0,
        });

        // Everyone hears about it, the requester included, so server
        // and requester stay in lockstep on the attack's existence.
        vec![Directive::Broadcast {
            message: Message::SpawnAttackNotice(SpawnAttackNotice {
                attack_id,
                owner: slot,
                team: team_for_slot(slot),
                attack_type: request.attack_type,
                x: origin.x,
                y: origin.y,
                vel_x: velocity.x,
                vel_y: velocity.y,
            }),
            exclude: None,
        }]
    }

    fn handle_damage_player(&mut self, request: &DamageRequest) -> Vec<Directive> {
        let index = request.target as usize;
        if index >= MAX_CLIENTS || !self.player_active[index] || request.amount < 0 {
            warn!("dropping damage request against player {}", request.target);
            return Vec::new();
        }
        let (health, destroyed) = apply_damage(self.player_health[index], request.amount);
        self.player_health[index] = health;

        let mut directives = vec![Directive::Broadcast {
            message: Message::PlayerDamageNotice(super::protocol::DamageNotice {
                target: request.target,
                health,
            }),
            exclude: None,
        }];
        if destroyed {
            self.player_active[index] = false;
            directives.push(Directive::Broadcast {
                message: Message::DestroyObject(DestroyObject {
                    object_type: ObjectType::Player as u8,
                    object_id: request.target as u32,
                }),
                exclude: None,
            });
        }
        directives
    }

    fn handle_damage_tower(&mut self, request: &DamageRequest) -> Vec<Directive> {
        let index = request.target as usize;
        if index >= TOWER_COUNT || !self.tower_active[index] || request.amount < 0 {
            warn!("dropping damage request against tower {}", request.target);
            return Vec::new();
        }
        let (health, destroyed) = apply_damage(self.tower_health[index], request.amount);
        self.tower_health[index] = health;

        let mut directives = vec![Directive::Broadcast {
            message: Message::TowerDamageNotice(super::protocol::DamageNotice {
                target: request.target,
                health,
            }),
            exclude: None,
        }];
        if destroyed {
            self.tower_active[index] = false;
            directives.push(Directive::Broadcast {
                message: Message::DestroyObject(DestroyObject {
                    object_type: ObjectType::Tower as u8,
                    object_id: request.target as u32,
                }),
                exclude: None,
            });
        }
        directives
    }

    fn handle_damage_base(&mut self, request: &DamageRequest) -> Vec<Directive> {
        let index = request.target as usize;
        if index >= BASE_COUNT || !self.base_active[index] || request.amount < 0 {
            warn!("dropping damage request against base {}", request.target);
            return Vec::new();
        }
        let (health, destroyed) = apply_damage(self.base_health[index], request.amount);
        self.base_health[index] = health;

        let mut directives = vec![Directive::Broadcast {
            message: Message::BaseDamageNotice(super::protocol::DamageNotice {
                target: request.target,
                health,
            }),
            exclude: None,
        }];
        if destroyed {
            self.base_active[index] = false;
            directives.push(Directive::Broadcast {
                message: Message::DestroyObject(DestroyObject {
                    object_type: ObjectType::Base as u8,
                    object_id: request.target as u32,
                }),
                exclude: None,
            });
        }
        directives
    }

    fn handle_damage_minion(&mut self, request: &DamageRequest) -> Vec<Directive> {
        let index = request.target as usize;
        if index >= MAX_CLIENTS || !self.minion_active[index] || request.amount < 0 {
            warn!("dropping damage request against minion {}", request.target);
            return Vec::new();
        }
        let (health, destroyed) = apply_damage(self.minion_health[index], request.amount);
        self.minion_health[index] = health;
        if destroyed {
            // No ObjectType exists for minions; the non-positive health
            // in the notice below is the destruction signal.
            self.minion_active[index] = false;
        }
        vec![Directive::Broadcast {
            message: Message::MinionDamageNotice(super::protocol::DamageNotice {
                target: request.target,
                health,
            }),
            exclude: None,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::MatchResultReport;

    fn hello() -> Message {
        Message::Hello(Hello {
            protocol_version: PROTOCOL_VERSION,
        })
    }

    fn state(slot: u8, x: f32, y: f32) -> Message {
        Message::PlayerState(PlayerStateUpdate {
            client_id: slot,
            x,
            y,
            ..Default::default()
        })
    }

    fn join(relay: &mut AuthorityRelay, slot: u8) {
        relay.client_connected(slot);
        relay.handle_message(slot, &hello());
    }

    fn broadcasts(directives: &[Directive]) -> Vec<&Message> {
        directives
            .iter()
            .filter_map(|d| match d {
                Directive::Broadcast { message, .. } => Some(message),
                Directive::Send { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_hello_answers_with_welcome_to_sender_only() {
        let mut relay = AuthorityRelay::new();
        relay.client_connected(0);
        let directives = relay.handle_message(0, &hello());

        assert_eq!(directives.len(), 1);
        match &directives[0] {
            Directive::Send { slot, message } => {
                assert_eq!(*slot, 0);
                match message {
                    Message::Welcome(w) => {
                        assert_eq!(w.client_id, 0);
                        assert!(!w.team);
                    }
                    other => panic!("expected Welcome, got {other:?}"),
                }
            }
            other => panic!("expected Send, got {other:?}"),
        }
    }

    #[test]
    fn test_match_starts_on_second_hello() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        assert!(!relay.started());

        relay.client_connected(1);
        let directives = relay.handle_message(1, &hello());
        assert!(relay.started());
        assert!(broadcasts(&directives)
            .iter()
            .any(|m| matches!(m, Message::GameStart)));

        // A third join does not restart the match.
        relay.client_connected(2);
        let directives = relay.handle_message(2, &hello());
        assert!(!broadcasts(&directives)
            .iter()
            .any(|m| matches!(m, Message::GameStart)));
    }

    #[test]
    fn test_state_is_stored_and_echoed_to_everyone_else() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);

        let directives = relay.handle_message(0, &state(0, 100.0, 50.0));
        assert_eq!(directives.len(), 1);
        match &directives[0] {
            Directive::Broadcast { message, exclude } => {
                assert_eq!(*exclude, Some(0));
                match message {
                    Message::PlayerStateNotice(n) => {
                        assert_eq!(n.client_id, 0);
                        assert_eq!((n.x, n.y), (100.0, 50.0));
                        assert!(!n.team);
                    }
                    other => panic!("expected state notice, got {other:?}"),
                }
            }
            other => panic!("expected Broadcast, got {other:?}"),
        }
    }

    #[test]
    fn test_spoofed_state_is_dropped() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        join(&mut relay, 1);

        assert!(relay.handle_message(1, &state(0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_state_before_hello_is_dropped() {
        let mut relay = AuthorityRelay::new();
        relay.client_connected(0);
        assert!(relay.handle_message(0, &state(0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_attack_ids_strictly_increase_across_connections() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        join(&mut relay, 1);
        relay.handle_message(0, &state(0, 100.0, 100.0));
        relay.handle_message(1, &state(1, 200.0, 200.0));

        let request = Message::SpawnAttack(SpawnAttackRequest {
            attack_type: AttackType::Fireball as u8,
            target_x: 500.0,
            target_y: 500.0,
        });

        let mut ids = Vec::new();
        for round in 0..10 {
            let slot = round % 2;
            for directive in relay.handle_message(slot, &request) {
                if let Directive::Broadcast {
                    message: Message::SpawnAttackNotice(n),
                    exclude,
                } = directive
                {
                    assert_eq!(exclude, None, "requester must hear its own spawn");
                    ids.push(n.attack_id);
                }
            }
        }

        assert_eq!(ids.len(), 10);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        // The relay keeps owner and team with each live attack.
        for attack in relay.live_attacks() {
            assert_eq!(attack.team, team_for_slot(attack.owner));
            assert_eq!(attack.attack_type, AttackType::Fireball);
        }

        // Reconnecting does not rewind the counter.
        relay.client_disconnected(0);
        relay.client_connected(0);
        relay.handle_message(0, &hello());
        relay.handle_message(0, &state(0, 100.0, 100.0));
        let directives = relay.handle_message(0, &request);
        match broadcasts(&directives)[0] {
            Message::SpawnAttackNotice(n) => assert!(n.attack_id > ids[ids.len() - 1]),
            other => panic!("expected spawn notice, got {other:?}"),
        }
    }

    #[test]
    fn test_spawn_attack_validation() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);

        // No pose known yet.
        let request = SpawnAttackRequest {
            attack_type: AttackType::Fireball as u8,
            target_x: 100.0,
            target_y: 100.0,
        };
        assert!(relay.handle_message(0, &Message::SpawnAttack(request)).is_empty());

        relay.handle_message(0, &state(0, 10.0, 10.0));

        let bad_type = SpawnAttackRequest {
            attack_type: 77,
            ..request
        };
        assert!(relay.handle_message(0, &Message::SpawnAttack(bad_type)).is_empty());

        let far_away = SpawnAttackRequest {
            target_x: 1e7,
            ..request
        };
        assert!(relay.handle_message(0, &Message::SpawnAttack(far_away)).is_empty());

        let not_a_number = SpawnAttackRequest {
            target_x: f32::NAN,
            ..request
        };
        assert!(relay
            .handle_message(0, &Message::SpawnAttack(not_a_number))
            .is_empty());

        assert!(!relay.handle_message(0, &Message::SpawnAttack(request)).is_empty());
    }

    #[test]
    fn test_damage_uses_authoritative_health() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        join(&mut relay, 1);

        // Client 1 claims 25 damage against player 0 with full health.
        let directives = relay.handle_message(
            1,
            &Message::DamagePlayer(DamageRequest {
                target: 0,
                amount: 25,
            }),
        );
        let messages = broadcasts(&directives);
        assert_eq!(messages.len(), 1, "no destroy notice expected");
        match messages[0] {
            Message::PlayerDamageNotice(n) => {
                assert_eq!(n.target, 0);
                assert_eq!(n.health, PLAYER_MAX_HEALTH - 25);
            }
            other => panic!("expected damage notice, got {other:?}"),
        }
        assert_eq!(relay.player_health(0), Some(175));
    }

    #[test]
    fn test_lethal_damage_also_broadcasts_destroy() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        join(&mut relay, 1);

        let directives = relay.handle_message(
            1,
            &Message::DamagePlayer(DamageRequest {
                target: 0,
                amount: PLAYER_MAX_HEALTH,
            }),
        );
        let messages = broadcasts(&directives);
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], Message::PlayerDamageNotice(n) if n.health <= 0));
        match messages[1] {
            Message::DestroyObject(d) => {
                assert_eq!(d.object_type, ObjectType::Player as u8);
                assert_eq!(d.object_id, 0);
            }
            other => panic!("expected destroy notice, got {other:?}"),
        }

        // The destroyed player no longer takes damage.
        assert!(relay
            .handle_message(1, &Message::DamagePlayer(DamageRequest { target: 0, amount: 1 }))
            .is_empty());
    }

    #[test]
    fn test_tower_and_base_destruction() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);

        let directives = relay.handle_message(
            0,
            &Message::DamageTower(DamageRequest {
                target: 2,
                amount: TOWER_MAX_HEALTH + 5,
            }),
        );
        let messages = broadcasts(&directives);
        assert!(matches!(messages[0], Message::TowerDamageNotice(n) if n.health < 0));
        assert!(
            matches!(messages[1], Message::DestroyObject(d) if d.object_type == ObjectType::Tower as u8 && d.object_id == 2)
        );

        let directives = relay.handle_message(
            0,
            &Message::DamageBase(DamageRequest {
                target: 1,
                amount: BASE_MAX_HEALTH,
            }),
        );
        let messages = broadcasts(&directives);
        assert!(
            matches!(messages[1], Message::DestroyObject(d) if d.object_type == ObjectType::Base as u8)
        );
    }

    #[test]
    fn test_minion_destruction_has_no_destroy_notice() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        relay.handle_message(
            0,
            &Message::PlayerState(PlayerStateUpdate {
                client_id: 0,
                minion_active: true,
                ..Default::default()
            }),
        );

        let directives = relay.handle_message(
            0,
            &Message::DamageMinion(DamageRequest {
                target: 0,
                amount: MINION_MAX_HEALTH,
            }),
        );
        let messages = broadcasts(&directives);
        assert_eq!(messages.len(), 1, "minions never get a destroy notice");
        assert!(matches!(messages[0], Message::MinionDamageNotice(n) if n.health <= 0));

        // Inactive now, so further damage is dropped.
        assert!(relay
            .handle_message(0, &Message::DamageMinion(DamageRequest { target: 0, amount: 1 }))
            .is_empty());
    }

    #[test]
    fn test_negative_damage_is_rejected() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        assert!(relay
            .handle_message(0, &Message::DamagePlayer(DamageRequest { target: 0, amount: -5 }))
            .is_empty());
        assert_eq!(relay.player_health(0), Some(PLAYER_MAX_HEALTH));
    }

    #[test]
    fn test_match_result_is_recorded_and_broadcast() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);

        let directives =
            relay.handle_message(0, &Message::MatchResult(MatchResultReport { winning_team: true }));
        assert_eq!(relay.winner(), Some(true));
        assert!(
            matches!(broadcasts(&directives)[0], Message::GameResult(r) if r.winning_team)
        );
    }

    #[test]
    fn test_disconnect_clears_slot_and_notifies_others() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        relay.handle_message(0, &state(0, 5.0, 5.0));

        let directives = relay.client_disconnected(0);
        assert_eq!(directives.len(), 1);
        match &directives[0] {
            Directive::Broadcast { message, exclude } => {
                assert_eq!(*exclude, Some(0));
                assert!(
                    matches!(message, Message::PlayerDisconnect(d) if d.client_id == 0)
                );
            }
            other => panic!("expected Broadcast, got {other:?}"),
        }

        // Idempotent: a second call has nothing to announce.
        assert!(relay.client_disconnected(0).is_empty());
    }

    #[test]
    fn test_attacks_expire_by_leaving_the_arena() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        relay.handle_message(0, &state(0, 100.0, 540.0));
        relay.handle_message(
            0,
            &Message::SpawnAttack(SpawnAttackRequest {
                attack_type: AttackType::LightningArrow as u8,
                target_x: 0.0,
                target_y: 540.0,
            }),
        );
        assert_eq!(relay.live_attack_count(), 1);

        // Flying straight at the left edge; one fat tick pushes it out.
        let directives = relay.tick(1.0);
        assert_eq!(relay.live_attack_count(), 0);
        assert!(
            matches!(broadcasts(&directives)[0], Message::DestroyObject(d) if d.object_type == ObjectType::Attack as u8)
        );
    }

    #[test]
    fn test_attacks_expire_by_lifetime() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        relay.handle_message(0, &state(0, 100.0, 540.0));
        // A slow bolt aimed across the arena runs out its fuse long
        // before it reaches the far edge.
        relay.handle_message(
            0,
            &Message::SpawnAttack(SpawnAttackRequest {
                attack_type: AttackType::TowerAttack as u8,
                target_x: 1900.0,
                target_y: 540.0,
            }),
        );

        let mut destroyed = 0;
        for _ in 0..((ATTACK_LIFETIME_SECS * 100.0) as usize + 10) {
            destroyed += relay.tick(0.01).len();
        }
        assert_eq!(destroyed, 1);
        assert_eq!(relay.live_attack_count(), 0);
    }

    #[test]
    fn test_server_only_messages_from_clients_are_dropped() {
        let mut relay = AuthorityRelay::new();
        join(&mut relay, 0);
        assert!(relay.handle_message(0, &Message::GameStart).is_empty());
    }
}

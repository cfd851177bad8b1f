use crate::net::{ReplicationEvent, ReplicationState};

/// The closed set of subsystems a frontend can register. Mirrors the
/// replicated object kinds plus the two presentation-only slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsystemKind {
    Player,
    Minion,
    Tower,
    Base,
    Attack,
    Map,
    Hud,
}

/// Capability interface every registered subsystem implements. All
/// hooks default to no-ops so a subsystem only writes the ones it needs.
pub trait Subsystem {
    fn kind(&self) -> SubsystemKind;

    fn on_tick(&mut self, _dt: f32, _state: &mut ReplicationState) {}

    fn on_render(&mut self, _state: &ReplicationState) {}

    fn on_event(&mut self, _event: &ReplicationEvent) {}

    fn on_shutdown(&mut self) {}
}

/// Iterates registered subsystems in registration order for every hook,
/// which keeps dispatch order deterministic and under the caller's
/// control.
#[derive(Default)]
pub struct Dispatcher {
    subsystems: Vec<Box<dyn Subsystem>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, subsystem: Box<dyn Subsystem>) {
        self.subsystems.push(subsystem);
    }

    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }

    pub fn kinds(&self) -> Vec<SubsystemKind> {
        self.subsystems.iter().map(|s| s.kind()).collect()
    }

    pub fn tick_all(&mut self, dt: f32, state: &mut ReplicationState) {
        for subsystem in &mut self.subsystems {
            subsystem.on_tick(dt, state);
        }
    }

    pub fn render_all(&mut self, state: &ReplicationState) {
        for subsystem in &mut self.subsystems {
            subsystem.on_render(state);
        }
    }

    pub fn dispatch(&mut self, event: &ReplicationEvent) {
        for subsystem in &mut self.subsystems {
            subsystem.on_event(event);
        }
    }

    pub fn shutdown_all(&mut self) {
        for subsystem in &mut self.subsystems {
            subsystem.on_shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        kind: SubsystemKind,
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Subsystem for Recorder {
        fn kind(&self) -> SubsystemKind {
            self.kind
        }

        fn on_tick(&mut self, _dt: f32, _state: &mut ReplicationState) {
            self.log.borrow_mut().push(format!("tick:{}", self.name));
        }

        fn on_event(&mut self, event: &ReplicationEvent) {
            self.log
                .borrow_mut()
                .push(format!("event:{}:{event:?}", self.name));
        }

        fn on_shutdown(&mut self) {
            self.log.borrow_mut().push(format!("down:{}", self.name));
        }
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        for (kind, name) in [
            (SubsystemKind::Map, "map"),
            (SubsystemKind::Player, "player"),
            (SubsystemKind::Hud, "hud"),
        ] {
            dispatcher.register(Box::new(Recorder {
                kind,
                name,
                log: Rc::clone(&log),
            }));
        }
        assert_eq!(
            dispatcher.kinds(),
            vec![SubsystemKind::Map, SubsystemKind::Player, SubsystemKind::Hud]
        );

        let mut state = ReplicationState::new();
        dispatcher.tick_all(0.016, &mut state);
        dispatcher.dispatch(&ReplicationEvent::GameStarted);
        dispatcher.shutdown_all();

        let log = log.borrow();
        assert_eq!(
            log.iter().map(|s| s.as_str()).collect::<Vec<_>>()[..3],
            ["tick:map", "tick:player", "tick:hud"]
        );
        assert!(log[3].starts_with("event:map"));
        assert!(log[4].starts_with("event:player"));
        assert!(log[5].starts_with("event:hud"));
        assert_eq!(log[6..], ["down:map", "down:player", "down:hud"]);
    }

    #[test]
    fn test_default_hooks_are_no_ops() {
        struct Quiet;
        impl Subsystem for Quiet {
            fn kind(&self) -> SubsystemKind {
                SubsystemKind::Attack
            }
        }

        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Box::new(Quiet));
        let mut state = ReplicationState::new();
        dispatcher.tick_all(0.016, &mut state);
        dispatcher.render_all(&state);
        dispatcher.dispatch(&ReplicationEvent::GameStarted);
        dispatcher.shutdown_all();
        assert_eq!(dispatcher.len(), 1);
    }
}

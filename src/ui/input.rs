/// Keyboard input tracker.
///
/// Tracks which keys are held so the sim can tell a held direction from a
/// one-frame tap. Each frame the held/pressed state of every bound key is
/// folded into the world's `IntentLatch`, merged with the gamepad.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't
/// report them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use grenadier::domain::intent::{IntentKey, IntentLatch};

use super::gamepad::GamepadState;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Keys bound to each intent. Arrows plus WASD for movement.
pub fn key_bindings(key: IntentKey) -> &'static [KeyCode] {
    match key {
        IntentKey::Left => &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')],
        IntentKey::Right => &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')],
        IntentKey::Up => &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')],
        IntentKey::Down => &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')],
        IntentKey::Jump => &[KeyCode::Char(' '), KeyCode::Char('z'), KeyCode::Char('Z')],
        IntentKey::Throw => &[KeyCode::Char('x'), KeyCode::Char('X'), KeyCode::Char('j'), KeyCode::Char('J')],
        IntentKey::Interact => &[KeyCode::Char('e'), KeyCode::Char('E')],
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// `drain_events()` call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the sim step.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key);
            }
        }

        self.expire(Instant::now());
    }

    fn apply(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Unconfirmed enhancement: rely on the timeout instead.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Fold this frame's keyboard and gamepad state into the latch.
    ///
    /// A press and release inside one drain still reaches the latch as a
    /// start followed by a stop, so the next snapshot carries both edges.
    pub fn feed_latch(&self, gamepad: &GamepadState, latch: &mut IntentLatch) {
        for key in IntentKey::ALL {
            let codes = key_bindings(key);
            let pressed = self.any_pressed(codes) || gamepad.pressed(key);
            let held = self.any_held(codes) || gamepad.held(key);
            if pressed || held {
                latch.on_intent_start(key);
            }
            if !held {
                latch.on_intent_stop(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    #[test]
    fn press_is_fresh_once() {
        let mut input = InputState::new();
        input.apply(key(KeyCode::Left, KeyEventKind::Press));
        assert!(input.was_pressed(KeyCode::Left));
        assert!(input.is_held(KeyCode::Left));

        input.fresh_presses.clear();
        input.apply(key(KeyCode::Left, KeyEventKind::Repeat));
        assert!(!input.was_pressed(KeyCode::Left));
        assert!(input.is_held(KeyCode::Left));
    }

    #[test]
    fn release_only_counts_when_honored() {
        let mut input = InputState::new();
        input.apply(key(KeyCode::Right, KeyEventKind::Press));
        input.apply(key(KeyCode::Right, KeyEventKind::Release));
        assert!(input.is_held(KeyCode::Right));

        input.honor_release = true;
        input.apply(key(KeyCode::Right, KeyEventKind::Release));
        assert!(!input.is_held(KeyCode::Right));
    }

    #[test]
    fn timeout_expires_held_keys() {
        let mut input = InputState::new();
        input.apply(key(KeyCode::Up, KeyEventKind::Press));
        input.expire(Instant::now() + HOLD_TIMEOUT);
        assert!(!input.is_held(KeyCode::Up));
    }

    #[test]
    fn tap_within_one_drain_reaches_latch_as_both_edges() {
        let mut input = InputState::new();
        input.honor_release = true;
        input.apply(key(KeyCode::Char('x'), KeyEventKind::Press));
        input.apply(key(KeyCode::Char('x'), KeyEventKind::Release));

        let mut latch = IntentLatch::new();
        input.feed_latch(&GamepadState::offline(), &mut latch);
        let snap = latch.snapshot();
        assert!(snap.throw_pressed);
        assert!(snap.throw_released);
        assert!(!snap.throw);
    }

    #[test]
    fn held_key_stays_held_without_new_edges() {
        let mut input = InputState::new();
        input.apply(key(KeyCode::Char(' '), KeyEventKind::Press));

        let mut latch = IntentLatch::new();
        let gp = GamepadState::offline();
        input.feed_latch(&gp, &mut latch);
        assert!(latch.snapshot().jump_pressed);

        input.fresh_presses.clear();
        input.feed_latch(&gp, &mut latch);
        let snap = latch.snapshot();
        assert!(snap.jump);
        assert!(!snap.jump_pressed);
        assert!(!snap.jump_released);
    }

    #[test]
    fn wasd_and_arrows_share_intents() {
        assert!(key_bindings(IntentKey::Left).contains(&KeyCode::Char('a')));
        assert!(key_bindings(IntentKey::Left).contains(&KeyCode::Left));
        assert!(key_bindings(IntentKey::Down).contains(&KeyCode::Char('s')));
    }
}

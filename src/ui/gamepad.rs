/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Left / Right / Up (aim) / Down (crouch, aim)
///   A                     →  Jump
///   X / R1                →  Throw (hold to aim, release to throw)
///   Y                     →  Interact
///   Start                 →  Restart
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::{info, warn};

use grenadier::config::GamepadConfig;
use grenadier::domain::intent::IntentKey;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Face and shoulder buttons the action map can name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,      // South
    X,      // West
    Y,      // North
    R1,     // RightTrigger
    Start,
    Select,
}

const BTN_COUNT: usize = 6;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Direction slot for the d-pad and stick arrays; `None` for button intents.
fn dir_index(key: IntentKey) -> Option<usize> {
    match key {
        IntentKey::Left => Some(0),
        IntentKey::Right => Some(1),
        IntentKey::Up => Some(2),
        IntentKey::Down => Some(3),
        IntentKey::Jump | IntentKey::Throw | IntentKey::Interact => None,
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    /// Set the held flag from a level reading, latching the rising edge.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn set_level(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

/// Which buttons drive each action.
#[derive(Debug, PartialEq)]
struct ActionMap {
    jump: Vec<Btn>,
    throw: Vec<Btn>,
    interact: Vec<Btn>,
    restart: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump:     vec![Btn::A],
            throw:    vec![Btn::X, Btn::R1],
            interact: vec![Btn::Y],
            restart:  vec![Btn::Start],
            quit:     vec![Btn::Select],
        }
    }
}

impl ActionMap {
    /// Config lists replace defaults; unknown names are dropped, and an
    /// action whose list ends up empty keeps its default.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if parsed.is_empty() { fallback } else { parsed }
        }
        let d = ActionMap::default();
        ActionMap {
            jump: parse_list(&cfg.jump, d.jump),
            throw: parse_list(&cfg.throw, d.throw),
            interact: parse_list(&cfg.interact, d.interact),
            restart: parse_list(&cfg.restart, d.restart),
            quit: parse_list(&cfg.quit, d.quit),
        }
    }

    fn for_intent(&self, key: IntentKey) -> &[Btn] {
        match key {
            IntentKey::Jump => &self.jump,
            IntentKey::Throw => &self.throw,
            IntentKey::Interact => &self.interact,
            IntentKey::Left | IntentKey::Right | IntentKey::Up | IntentKey::Down => &[],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    /// Left, right, up, down (see `dir_index`).
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg_attr(not(feature = "gamepad"), allow(unused_mut))]
        let mut state = Self::offline();

        #[cfg(feature = "gamepad")]
        match Gilrs::new() {
            Ok(g) => {
                state.connected = g.gamepads().next().is_some();
                info!(connected = state.connected, "gamepad_backend_ready");
                state.gilrs = Some(g);
            }
            Err(e) => warn!(error = %e, "gamepad_backend_unavailable"),
        }

        state
    }

    /// No backend attached: every query reports released.
    pub fn offline() -> Self {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: None,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected: false,
        }
    }

    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.action_map = ActionMap::from_config(cfg);
    }

    /// Clear edges, then drain pending gilrs events.
    pub fn update(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(Axis::LeftStickX, value, _) => self.stick_x = value,
                EventType::AxisChanged(Axis::LeftStickY, value, _) => self.stick_y = value,
                EventType::Connected => self.connected = true,
                EventType::Disconnected => {
                    info!("gamepad_disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        // gilrs reports stick Y up-positive.
        let levels = [
            self.stick_x < -STICK_DEADZONE,
            self.stick_x > STICK_DEADZONE,
            self.stick_y > STICK_DEADZONE,
            self.stick_y < -STICK_DEADZONE,
        ];
        for (state, held) in self.stick.iter_mut().zip(levels) {
            state.set_level(held);
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dir = match gilrs_btn {
            Button::DPadLeft => Some(IntentKey::Left),
            Button::DPadRight => Some(IntentKey::Right),
            Button::DPadUp => Some(IntentKey::Up),
            Button::DPadDown => Some(IntentKey::Down),
            _ => None,
        };
        let state = match dir.and_then(dir_index) {
            Some(i) => &mut self.dpad[i],
            None => match Btn::from_gilrs(gilrs_btn) {
                Some(b) => &mut self.buttons[b as usize],
                None => return,
            },
        };
        state.held = held;
        state.just_pressed |= held;
    }

    // ── Intent queries ──

    fn any_btn(&self, btns: &[Btn], f: fn(&BtnState) -> bool) -> bool {
        btns.iter().any(|&b| f(&self.buttons[b as usize]))
    }

    fn query(&self, key: IntentKey, f: fn(&BtnState) -> bool) -> bool {
        match dir_index(key) {
            Some(i) => f(&self.dpad[i]) || f(&self.stick[i]),
            None => self.any_btn(self.action_map.for_intent(key), f),
        }
    }

    /// Is the intent currently held on the pad?
    pub fn held(&self, key: IntentKey) -> bool {
        self.query(key, |s| s.held)
    }

    /// Was the intent pressed since the last `update()`? Catches presses
    /// released again before the frame ends.
    pub fn pressed(&self, key: IntentKey) -> bool {
        self.query(key, |s| s.just_pressed)
    }

    pub fn restart_pressed(&self) -> bool {
        self.any_btn(&self.action_map.restart, |s| s.just_pressed)
    }

    pub fn quit_pressed(&self) -> bool {
        self.any_btn(&self.action_map.quit, |s| s.just_pressed)
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad = [BtnState::default(); 4];
        self.stick = [BtnState::default(); 4];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad_config(jump: &[&str], throw: &[&str]) -> GamepadConfig {
        let list = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        GamepadConfig {
            jump: list(jump),
            throw: list(throw),
            interact: vec![],
            restart: vec!["start".into()],
            quit: vec!["back".into()],
        }
    }

    #[test]
    fn button_names_are_case_insensitive_with_aliases() {
        assert_eq!(Btn::from_name("south"), Some(Btn::A));
        assert_eq!(Btn::from_name("RB"), Some(Btn::R1));
        assert_eq!(Btn::from_name("back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("turbo"), None);
        assert_eq!(Btn::from_name("L2"), None);
    }

    #[test]
    fn config_lists_replace_defaults() {
        let map = ActionMap::from_config(&pad_config(&["Y"], &["RB", "west"]));
        assert_eq!(map.jump, vec![Btn::Y]);
        assert_eq!(map.throw, vec![Btn::R1, Btn::X]);
        assert_eq!(map.quit, vec![Btn::Select]);
    }

    #[test]
    fn empty_or_unknown_lists_keep_defaults() {
        let map = ActionMap::from_config(&pad_config(&["nope"], &[]));
        let d = ActionMap::default();
        assert_eq!(map.jump, d.jump);
        assert_eq!(map.throw, d.throw);
        assert_eq!(map.interact, d.interact);
    }

    #[test]
    fn held_buttons_map_to_intents() {
        let mut pad = GamepadState::offline();
        pad.buttons[Btn::A as usize].held = true;
        pad.dpad[0].held = true;
        assert!(pad.held(IntentKey::Jump));
        assert!(pad.held(IntentKey::Left));
        assert!(!pad.held(IntentKey::Throw));
        assert!(!pad.pressed(IntentKey::Jump));
    }

    #[test]
    fn stick_level_latches_rising_edge_once() {
        let mut pad = GamepadState::offline();
        pad.stick[1].set_level(true);
        assert!(pad.held(IntentKey::Right));
        assert!(pad.pressed(IntentKey::Right));
        pad.update();
        pad.stick[1].set_level(true);
        assert!(pad.held(IntentKey::Right));
        assert!(!pad.pressed(IntentKey::Right));
        pad.stick[1].set_level(false);
        assert!(!pad.held(IntentKey::Right));
    }
}

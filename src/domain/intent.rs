/// Player/AI intent: what the entity wants to do this frame.
///
/// The input layer calls `on_intent_start` / `on_intent_stop` as keys or
/// buttons change. Once per frame the sim takes an immutable `Intents`
/// snapshot, which is the only thing the controller ever reads. Edges
/// (pressed / released since the last snapshot) are latched so that a tap
/// shorter than a frame is still seen.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum IntentKey {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Throw,
    Interact,
}

impl IntentKey {
    pub const ALL: [IntentKey; 7] = [
        IntentKey::Left,
        IntentKey::Right,
        IntentKey::Up,
        IntentKey::Down,
        IntentKey::Jump,
        IntentKey::Throw,
        IntentKey::Interact,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Frame snapshot. Held flags are continuous; `*_pressed` / `*_released`
/// are edges observed since the previous snapshot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Intents {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub jump: bool,
    pub throw: bool,
    pub interact: bool,
    pub jump_pressed: bool,
    pub jump_released: bool,
    pub throw_pressed: bool,
    pub throw_released: bool,
}

impl Intents {
    /// Exactly one horizontal direction held.
    pub fn horizontal(&self) -> Option<i8> {
        match (self.left, self.right) {
            (true, false) => Some(-1),
            (false, true) => Some(1),
            _ => None,
        }
    }
}

/// Latched key state owned by the input collaborator.
#[derive(Clone, Debug, Default)]
pub struct IntentLatch {
    held: [bool; 7],
    pressed: [bool; 7],
    released: [bool; 7],
}

impl IntentLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_intent_start(&mut self, key: IntentKey) {
        let i = key.index();
        if !self.held[i] {
            self.pressed[i] = true;
        }
        self.held[i] = true;
    }

    pub fn on_intent_stop(&mut self, key: IntentKey) {
        let i = key.index();
        if self.held[i] {
            self.released[i] = true;
        }
        self.held[i] = false;
    }

    pub fn is_held(&self, key: IntentKey) -> bool {
        self.held[key.index()]
    }

    /// Drop everything (e.g. on level restart or focus loss).
    pub fn release_all(&mut self) {
        for key in IntentKey::ALL {
            self.on_intent_stop(key);
        }
    }

    /// Take this frame's snapshot and clear the edge latches.
    pub fn snapshot(&mut self) -> Intents {
        let held = |k: IntentKey| self.held[k.index()];
        let snap = Intents {
            left: held(IntentKey::Left),
            right: held(IntentKey::Right),
            up: held(IntentKey::Up),
            down: held(IntentKey::Down),
            jump: held(IntentKey::Jump),
            throw: held(IntentKey::Throw),
            interact: held(IntentKey::Interact),
            jump_pressed: self.pressed[IntentKey::Jump.index()],
            jump_released: self.released[IntentKey::Jump.index()],
            throw_pressed: self.pressed[IntentKey::Throw.index()],
            throw_released: self.released[IntentKey::Throw.index()],
        };
        self.pressed = [false; 7];
        self.released = [false; 7];
        snap
    }
}

/// Keyboard input state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Buffered turns: the most recent fresh press wins
///   - Continuous steering while a key is held
///   - Edge-triggered menu keys (confirm, pause, back)
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::Direction;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Held-key priority when no fresh press arrived this frame.
const HELD_PRIORITY: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

/// Arrow keys and WASD (either case).
pub fn key_direction(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Direction::Right),
        _ => None,
    }
}

/// Latest fresh direction wins; otherwise the first held one in
/// Up, Down, Left, Right order.
pub fn pick_direction(fresh: &[Direction], held: impl Fn(Direction) -> bool) -> Option<Direction> {
    if let Some(&d) = fresh.last() {
        return Some(d);
    }
    HELD_PRIORITY.iter().copied().find(|&d| held(d))
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call, in arrival order.
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
    /// Call this once per frame, before the simulation ticks.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply_key(key, Instant::now());
            }
        }

        if !self.honor_release {
            let now = Instant::now();
            self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        }
    }

    fn apply_key(&mut self, key: KeyEvent, at: Instant) {
        self.raw_events.push(key);

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {
                // Enhancement not confirmed; timeout handles release.
            }
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, at);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Is this key currently held down? With Release events available a
    /// key stays held until released; otherwise it times out.
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| self.honor_release || t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Steering request for this frame, if any.
    pub fn movement(&self) -> Option<Direction> {
        let fresh: Vec<Direction> = self.fresh_presses.iter().filter_map(|&c| key_direction(c)).collect();
        pick_direction(&fresh, |d| {
            self.last_active
                .keys()
                .any(|&c| key_direction(c) == Some(d) && self.is_held(c))
        })
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_wasd_map_to_directions() {
        assert_eq!(key_direction(KeyCode::Up), Some(Direction::Up));
        assert_eq!(key_direction(KeyCode::Char('a')), Some(Direction::Left));
        assert_eq!(key_direction(KeyCode::Char('D')), Some(Direction::Right));
        assert_eq!(key_direction(KeyCode::Char('s')), Some(Direction::Down));
        assert_eq!(key_direction(KeyCode::Enter), None);
    }

    #[test]
    fn latest_fresh_press_wins() {
        let d = pick_direction(&[Direction::Left, Direction::Down], |_| true);
        assert_eq!(d, Some(Direction::Down));
    }

    #[test]
    fn held_keys_use_fixed_priority() {
        let d = pick_direction(&[], |d| d == Direction::Right || d == Direction::Down);
        assert_eq!(d, Some(Direction::Down));
        assert_eq!(pick_direction(&[], |_| false), None);
    }

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    fn a_second_ago() -> Instant {
        Instant::now().checked_sub(Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn release_events_end_a_hold() {
        let mut input = InputState::new();
        input.honor_release = true;
        input.apply_key(key(KeyCode::Left, KeyEventKind::Press), a_second_ago());
        assert!(input.is_held(KeyCode::Left), "no timeout while releases are reported");
        assert_eq!(input.movement(), Some(Direction::Left));

        input.apply_key(key(KeyCode::Left, KeyEventKind::Release), Instant::now());
        assert!(!input.is_held(KeyCode::Left));
    }

    #[test]
    fn without_release_events_holds_time_out() {
        let mut input = InputState::new();
        input.apply_key(key(KeyCode::Up, KeyEventKind::Press), Instant::now());
        input.apply_key(key(KeyCode::Up, KeyEventKind::Release), Instant::now());
        assert!(input.is_held(KeyCode::Up), "release ignored");

        input.apply_key(key(KeyCode::Down, KeyEventKind::Press), a_second_ago());
        assert!(!input.is_held(KeyCode::Down));
    }

    #[test]
    fn fresh_state_has_no_movement() {
        let input = InputState::new();
        assert_eq!(input.movement(), None);
        assert!(!input.ctrl_c_pressed());
    }
}

//! Screen state machine.
//!
//! Four mutually exclusive screens, driven by the snapshot phase:
//!
//! ```text
//! Lobby ──join──▶ WaitingRoom ──started──▶ Active ──finished──▶ Finished
//!   ▲                  │                     │                     │
//!   └──────────────────┴──────── leave ──────┴─────────────────────┘
//! ```

use crate::protocol::GamePhase;

/// The screen currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Lobby,
    WaitingRoom,
    Active,
    Finished,
}

impl Screen {
    /// Screen for a snapshot phase.
    pub fn for_phase(phase: GamePhase) -> Self {
        match phase {
            GamePhase::Waiting => Self::WaitingRoom,
            GamePhase::Started => Self::Active,
            GamePhase::Finished => Self::Finished,
        }
    }
}

/// Outcome of feeding one input into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Screen,
    pub to: Screen,
}

impl Transition {
    /// Whether the visible screen switches. `false` means refresh in place.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScreenMachine {
    current: Screen,
}

impl ScreenMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    /// Move to the screen for `phase`. Re-delivering a phase is a no-op.
    pub fn apply_phase(&mut self, phase: GamePhase) -> Transition {
        self.go(Screen::for_phase(phase))
    }

    /// Join accepted: leave the lobby ahead of the first snapshot.
    pub fn joined(&mut self) -> Transition {
        if self.current == Screen::Lobby {
            self.go(Screen::WaitingRoom)
        } else {
            self.go(self.current)
        }
    }

    pub fn leave(&mut self) -> Transition {
        self.go(Screen::Lobby)
    }

    fn go(&mut self, to: Screen) -> Transition {
        let from = std::mem::replace(&mut self.current, to);
        Transition { from, to }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_lobby() {
        assert_eq!(ScreenMachine::new().current(), Screen::Lobby);
    }

    #[test]
    fn phases_drive_the_full_sequence() {
        let mut machine = ScreenMachine::new();
        assert_eq!(machine.apply_phase(GamePhase::Waiting).to, Screen::WaitingRoom);
        assert_eq!(machine.apply_phase(GamePhase::Started).to, Screen::Active);
        let last = machine.apply_phase(GamePhase::Finished);
        assert_eq!(last.from, Screen::Active);
        assert_eq!(last.to, Screen::Finished);
        assert!(last.changed());
    }

    #[test]
    fn repeated_phase_is_idempotent() {
        let mut machine = ScreenMachine::new();
        machine.apply_phase(GamePhase::Started);
        let again = machine.apply_phase(GamePhase::Started);
        assert!(!again.changed());
        assert_eq!(machine.current(), Screen::Active);
    }

    #[test]
    fn leave_returns_to_lobby_from_anywhere() {
        for phase in [GamePhase::Waiting, GamePhase::Started, GamePhase::Finished] {
            let mut machine = ScreenMachine::new();
            machine.apply_phase(phase);
            let t = machine.leave();
            assert!(t.changed());
            assert_eq!(machine.current(), Screen::Lobby);
        }
    }

    #[test]
    fn joined_only_moves_out_of_lobby() {
        let mut machine = ScreenMachine::new();
        assert_eq!(machine.joined().to, Screen::WaitingRoom);
        machine.apply_phase(GamePhase::Started);
        assert!(!machine.joined().changed());
        assert_eq!(machine.current(), Screen::Active);
    }
}

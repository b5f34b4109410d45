use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Which end-of-game screen, if any, the player is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndingScreen {
    #[default]
    None,
    Win,
    GameOver,
}

/// Where the current round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundPhase {
    #[default]
    Idle,
    Resolving,
    AwaitingCompletion,
    Finalizing,
    Won,
    GameOver,
}

impl RoundPhase {
    pub fn for_ending(screen: EndingScreen) -> Self {
        match screen {
            EndingScreen::None => RoundPhase::Idle,
            EndingScreen::Win => RoundPhase::Won,
            EndingScreen::GameOver => RoundPhase::GameOver,
        }
    }
}

/// Score and control flags of the running game.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub score: u32,
    /// High-water mark across games. Survives `new_game`.
    pub best_score: u32,
    pub move_made_this_round: bool,
    pub ready_for_input: bool,
    pub paused: bool,
    pub won: bool,
    pub ending_screen: EndingScreen,
    pub phase: RoundPhase,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            score: 0,
            best_score: 0,
            move_made_this_round: false,
            ready_for_input: true,
            paused: false,
            won: false,
            ending_screen: EndingScreen::None,
            phase: RoundPhase::Idle,
        }
    }
}

impl GameState {
    pub fn increase_score(&mut self, delta: u32) {
        self.score = self.score.saturating_add(delta);
        self.best_score = self.best_score.max(self.score);
    }

    /// Back to a fresh game, keeping the best score.
    pub fn reset_for_new_game(&mut self) {
        *self = Self {
            best_score: self.best_score,
            ..Self::default()
        };
    }

    pub fn accepts_input(&self) -> bool {
        self.ready_for_input && !self.paused && self.phase == RoundPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_score_tracks_high_water_mark() {
        let mut state = GameState::default();
        state.increase_score(12);
        assert_eq!((state.score, state.best_score), (12, 12));
        state.reset_for_new_game();
        assert_eq!((state.score, state.best_score), (0, 12));
        state.increase_score(4);
        assert_eq!((state.score, state.best_score), (4, 12));
    }

    #[test]
    fn paused_game_rejects_input() {
        let mut state = GameState::default();
        assert!(state.accepts_input());
        state.paused = true;
        assert!(!state.accepts_input());
    }
}

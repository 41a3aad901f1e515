use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    config::RuleConfig,
    rules::{ErrorKind, PlayCardAction, RuleEngine, RuleError},
    state::{EffectMessage, GamePhase, GameState, PlayerId},
};

/// Everything a client can ask of a game instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Join { name: String },
    StartGame,
    PlayCard(PlayCardAction),
    AdvanceTurn,
    EndRoundAck { player_id: PlayerId },
    Leave { player_id: PlayerId },
    Reset,
}

/// Broadcast after every accepted command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandOutcome {
    pub state: GameState,
    pub effects: Vec<EffectMessage>,
    /// Id handed out by a `Join`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined: Option<PlayerId>,
}

/// Sent back to the requester only.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<RuleError> for CommandError {
    fn from(error: RuleError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// One game room. Commands either apply completely or leave state and random source as
/// they were.
#[derive(Debug, Clone)]
pub struct GameEngine {
    state: GameState,
    rules: RuleEngine,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new(RuleConfig::default())
    }
}

impl GameEngine {
    pub fn new(config: RuleConfig) -> Self {
        Self {
            state: GameState::new(),
            rules: RuleEngine::new(config),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &RuleConfig {
        self.rules.config()
    }

    pub fn execute_json(&mut self, command_json: &str) -> Result<CommandOutcome, CommandError> {
        let command: Command =
            serde_json::from_str(command_json).map_err(|error| RuleError::MalformedCommand {
                reason: error.to_string(),
            })?;
        self.execute(command)
    }

    pub fn execute(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        let snapshot = (self.state.clone(), self.rules.clone());
        self.state.effect_log.clear();

        let result = self.apply(&command).and_then(|joined| {
            self.state
                .integrity_check()
                .map_err(|error| RuleError::IntegrityViolation { error })?;
            Ok(joined)
        });

        match result {
            Ok(joined) => Ok(CommandOutcome {
                state: self.state.clone(),
                effects: self.state.effect_log.clone(),
                joined,
            }),
            Err(error) => {
                warn!("rejected {command:?}: {error}");
                (self.state, self.rules) = snapshot;
                Err(error.into())
            }
        }
    }

    fn apply(&mut self, command: &Command) -> Result<Option<PlayerId>, RuleError> {
        match command {
            Command::Join { name } => self.join(name).map(Some),
            Command::StartGame => {
                self.rules.start_new_game(&mut self.state)?;
                Ok(None)
            }
            Command::PlayCard(action) => {
                self.rules.play_card(&mut self.state, action.clone())?;
                Ok(None)
            }
            Command::AdvanceTurn => {
                self.advance_turn()?;
                Ok(None)
            }
            Command::EndRoundAck { player_id } => {
                self.rules
                    .end_round_acknowledge(&mut self.state, *player_id)?;
                Ok(None)
            }
            Command::Leave { player_id } => {
                self.leave(*player_id)?;
                Ok(None)
            }
            Command::Reset => {
                self.state.reset_for_new_game();
                info!("game reset with {} players seated", self.state.player_count());
                Ok(None)
            }
        }
    }

    fn join(&mut self, name: &str) -> Result<PlayerId, RuleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RuleError::EmptyName);
        }
        if self.state.phase != GamePhase::WaitingPlayers {
            return Err(RuleError::InvalidPhase {
                expected: GamePhase::WaitingPlayers,
                actual: self.state.phase,
            });
        }
        let max = self.rules.config().max_players;
        if self.state.player_count() >= max {
            return Err(RuleError::RoomFull { max });
        }
        let player_id = self.state.add_player(name);
        info!("player {player_id} ({name}) joined");
        Ok(player_id)
    }

    fn leave(&mut self, player_id: PlayerId) -> Result<(), RuleError> {
        if self.state.remove_player(player_id).is_none() {
            return Err(RuleError::PlayerNotFound { player_id });
        }
        self.state.reset_for_new_game();
        info!("player {player_id} left, game reset");
        Ok(())
    }

    fn advance_turn(&mut self) -> Result<(), RuleError> {
        match self.state.phase {
            GamePhase::WaitingPlayers | GamePhase::InitialDraw => Err(RuleError::InvalidPhase {
                expected: GamePhase::PlayersPhase,
                actual: self.state.phase,
            }),
            _ => self.rules.advance_turn(&mut self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seated_engine(seed: u64) -> GameEngine {
        let mut engine = GameEngine::new(RuleConfig::default().with_seed(seed));
        for name in ["ana", "bo", "cy"] {
            engine
                .execute(Command::Join { name: name.into() })
                .expect("join should succeed");
        }
        engine
    }

    #[test]
    fn join_hands_out_ids_in_order() {
        let mut engine = GameEngine::default();
        let first = engine.execute(Command::Join { name: "ana".into() }).unwrap();
        let second = engine.execute(Command::Join { name: " bo ".into() }).unwrap();

        assert_eq!(first.joined, Some(1));
        assert_eq!(second.joined, Some(2));
        assert_eq!(engine.state().player_order, vec![1, 2]);
        assert_eq!(engine.state().get_player(2).unwrap().name, "bo");
    }

    #[test]
    fn join_rejects_blank_names_and_full_rooms() {
        let mut engine = seated_engine(1);
        let blank = engine
            .execute(Command::Join { name: "  ".into() })
            .unwrap_err();
        assert_eq!(blank.kind, ErrorKind::Validation);

        engine.execute(Command::Join { name: "di".into() }).unwrap();
        let full = engine
            .execute(Command::Join { name: "ed".into() })
            .unwrap_err();
        assert_eq!(full.kind, ErrorKind::State);
        assert_eq!(engine.state().player_count(), 4);
    }

    #[test]
    fn join_after_start_is_rejected() {
        let mut engine = seated_engine(2);
        engine.execute(Command::StartGame).unwrap();

        let err = engine
            .execute(Command::Join { name: "late".into() })
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::State);
        assert_eq!(engine.state().player_count(), 3);
    }

    #[test]
    fn start_game_broadcasts_the_dealt_state() {
        let mut engine = seated_engine(3);

        let outcome = engine.execute(Command::StartGame).unwrap();

        assert_eq!(outcome.state.phase, GamePhase::PlayersPhase);
        assert_eq!(outcome.state.current_turn, Some(1));
        assert_eq!(&outcome.state, engine.state());
        assert!(outcome.effects.is_empty());
    }

    #[test]
    fn starting_short_handed_is_a_state_error() {
        let mut engine = GameEngine::default();
        engine.execute(Command::Join { name: "ana".into() }).unwrap();

        let err = engine.execute(Command::StartGame).unwrap_err();

        assert_eq!(err.kind, ErrorKind::State);
        assert_eq!(engine.state().phase, GamePhase::WaitingPlayers);
    }

    #[test]
    fn advance_turn_needs_a_running_game() {
        let mut engine = seated_engine(4);
        let err = engine.execute(Command::AdvanceTurn).unwrap_err();
        assert_eq!(err.kind, ErrorKind::State);
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let mut engine = seated_engine(5);
        let err = engine.execute_json(r#"{ "type": "FLY" }"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn json_commands_use_screaming_tags() {
        let mut engine = GameEngine::default();
        let outcome = engine
            .execute_json(r#"{ "type": "JOIN", "name": "ana" }"#)
            .unwrap();
        assert_eq!(outcome.joined, Some(1));

        let command: Command = serde_json::from_str(
            r#"{ "type": "PLAY_CARD", "player_id": 1, "card_id": 9, "target_player_id": 2, "target_card_ids": [4] }"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::PlayCard(PlayCardAction {
                player_id: 1,
                card_id: 9,
                target_player_id: 2,
                target_card_ids: vec![4],
            })
        );
    }

    #[test]
    fn rejected_commands_leave_state_and_randomness_untouched() {
        let mut touched = seated_engine(6);
        let mut pristine = seated_engine(6);
        touched.execute(Command::StartGame).unwrap();
        pristine.execute(Command::StartGame).unwrap();

        let before = touched.state().clone();
        let err = touched
            .execute(Command::EndRoundAck { player_id: 1 })
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::State);
        assert_eq!(touched.state(), &before);

        for _ in 0..6 {
            let left = touched.execute(Command::AdvanceTurn);
            let right = pristine.execute(Command::AdvanceTurn);
            assert_eq!(left, right);
        }
    }

    #[test]
    fn effects_are_scoped_to_one_command() {
        let mut engine = seated_engine(7);
        engine.execute(Command::StartGame).unwrap();

        let mut wrap = None;
        for _ in 0..3 {
            let outcome = engine.execute(Command::AdvanceTurn).unwrap();
            if outcome.state.current_turn.is_none() || outcome.state.is_finished() {
                wrap = Some(outcome);
                break;
            }
            assert!(outcome.effects.is_empty());
        }
        let wrap = wrap.expect("three passes close the round");
        assert_eq!(wrap.effects, wrap.state.effect_log);

        let next = engine.execute(Command::AdvanceTurn).unwrap();
        assert!(next.effects.is_empty());
    }

    #[test]
    fn leave_resets_the_game_and_keeps_the_room() {
        let mut engine = seated_engine(8);
        engine.execute(Command::StartGame).unwrap();

        let outcome = engine.execute(Command::Leave { player_id: 2 }).unwrap();

        assert_eq!(outcome.state.phase, GamePhase::WaitingPlayers);
        assert_eq!(outcome.state.player_order, vec![1, 3]);
        assert!(outcome.state.main_deck.is_empty());
        assert!(outcome
            .state
            .players_in_order()
            .all(|player| player.hand.is_empty() && player.virus_field.is_empty()));

        let missing = engine
            .execute(Command::Leave { player_id: 2 })
            .unwrap_err();
        assert_eq!(missing.kind, ErrorKind::NotFound);
    }

    #[test]
    fn reset_allows_a_rematch() {
        let mut engine = seated_engine(9);
        engine.execute(Command::StartGame).unwrap();
        engine.execute(Command::Reset).unwrap();
        assert_eq!(engine.state().phase, GamePhase::WaitingPlayers);

        let outcome = engine.execute(Command::StartGame).unwrap();
        assert_eq!(outcome.state.phase, GamePhase::PlayersPhase);
        assert!(outcome.state.integrity_check().is_ok());
    }
}

//! Core rules of the game: card catalog, decks, state, effect resolution, turn scheduling
//! and the command facade.

pub mod catalog;
pub mod config;
pub mod deck;
pub mod effects;
pub mod engine;
pub mod rules;
pub mod state;
pub mod victory;

pub use catalog::{catalog, find_definition, ActionKind, CardCategory, CardDefinition};
pub use config::RuleConfig;
pub use deck::DeckBuilder;
pub use effects::EffectContext;
pub use engine::{Command, CommandError, CommandOutcome, GameEngine};
pub use rules::{ErrorKind, PlayCardAction, RuleEngine, RuleError};
pub use state::{
    CardId,
    CardInstance,
    EffectMessage,
    EffectOrigin,
    GamePhase,
    GameState,
    IntegrityError,
    OutcomeReason,
    Player,
    PlayerId,
};
pub use victory::{check_game_over_condition, check_victory_condition};

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    catalog::{virus_definition, ActionKind},
    config::RuleConfig,
    deck::DeckBuilder,
    effects::{
        apply_card_effect, auto_apply, find_nullifier, record_nullified, record_spread,
        EffectContext,
    },
    state::{CardId, EffectOrigin, GamePhase, GameState, IntegrityError, PlayerId},
    victory::{check_game_over_condition, check_victory_condition},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayCardAction {
    pub player_id: PlayerId,
    pub card_id: CardId,
    pub target_player_id: PlayerId,
    #[serde(default)]
    pub target_card_ids: Vec<CardId>,
}

/// Coarse classification reported to the requester alongside the message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    State,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("player count {count} is out of range")]
    InvalidPlayerCount { count: usize },
    #[error("player name must not be empty")]
    EmptyName,
    #[error("card {card_id} needs at least one target")]
    MissingTargets { card_id: CardId },
    #[error("card {card_id} affects at most {max} cards, {given} given")]
    TooManyTargets {
        card_id: CardId,
        max: usize,
        given: usize,
    },
    #[error("card {card_id} is targeted more than once")]
    DuplicateTarget { card_id: CardId },
    #[error("malformed command: {reason}")]
    MalformedCommand { reason: String },
    #[error("player {player_id} not found")]
    PlayerNotFound { player_id: PlayerId },
    #[error("card {card_id} is not on the field of player {player_id}")]
    TargetNotFound { player_id: PlayerId, card_id: CardId },
    #[error("command not allowed in phase {actual:?}, expected {expected:?}")]
    InvalidPhase {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("it is not the turn of player {player_id}")]
    NotPlayerTurn { player_id: PlayerId },
    #[error("card {card_id} not in hand")]
    CardNotInHand { card_id: CardId },
    #[error("{required} players required, {actual} seated")]
    NotEnoughPlayers { required: usize, actual: usize },
    #[error("room is full ({max} players)")]
    RoomFull { max: usize },
    #[error("game state integrity violated: {error:?}")]
    IntegrityViolation { error: IntegrityError },
}

impl RuleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuleError::InvalidPlayerCount { .. }
            | RuleError::EmptyName
            | RuleError::MissingTargets { .. }
            | RuleError::TooManyTargets { .. }
            | RuleError::DuplicateTarget { .. }
            | RuleError::MalformedCommand { .. } => ErrorKind::Validation,
            RuleError::PlayerNotFound { .. } | RuleError::TargetNotFound { .. } => {
                ErrorKind::NotFound
            }
            RuleError::InvalidPhase { .. }
            | RuleError::NotPlayerTurn { .. }
            | RuleError::CardNotInHand { .. }
            | RuleError::NotEnoughPlayers { .. }
            | RuleError::RoomFull { .. }
            | RuleError::IntegrityViolation { .. } => ErrorKind::State,
        }
    }
}

/// Turn and round state machine. Owns the random source used for shuffles and sampling.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    config: RuleConfig,
    rng: SmallRng,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RuleConfig::default())
    }
}

impl RuleEngine {
    pub fn new(config: RuleConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    fn ensure_phase(state: &GameState, expected: GamePhase) -> Result<(), RuleError> {
        if state.phase != expected {
            return Err(RuleError::InvalidPhase {
                expected,
                actual: state.phase,
            });
        }
        Ok(())
    }

    fn ensure_turn_owner(state: &GameState, player_id: PlayerId) -> Result<(), RuleError> {
        if state.current_turn != Some(player_id) {
            return Err(RuleError::NotPlayerTurn { player_id });
        }
        Ok(())
    }

    pub fn start_new_game(&mut self, state: &mut GameState) -> Result<(), RuleError> {
        Self::ensure_phase(state, GamePhase::WaitingPlayers)?;
        let player_count = state.player_count();
        if player_count < self.config.min_players {
            return Err(RuleError::NotEnoughPlayers {
                required: self.config.min_players,
                actual: player_count,
            });
        }

        let mut builder = DeckBuilder::new(&mut self.rng, state.next_card_id);
        let main_deck = builder.build_main_deck(player_count)?;
        let advantages_deck = builder.build_advantages_deck(player_count)?;
        let disadvantages_deck = builder.build_disadvantages_deck(player_count)?;
        state.next_card_id = builder.next_card_id();

        state.main_deck = main_deck;
        state.advantages_deck = advantages_deck;
        state.disadvantages_deck = disadvantages_deck;
        state.discard_pile.clear();
        state.round_acknowledgements.clear();
        state.current_turn = None;
        state.round = 0;
        state.number_of_virus = 0;
        state.outcome = None;

        let order = state.player_order.clone();
        for player_id in order {
            for _ in 0..self.config.initial_hand {
                state.draw_card(player_id);
            }
            state.deal_advantage(player_id);
            state.deal_disadvantage(player_id);
        }

        state.phase = GamePhase::InitialDraw;
        info!(
            "game started with {player_count} players, {} viruses dealt",
            state.number_of_virus
        );
        self.advance_turn(state)
    }

    /// Hands the turn to the next player in join order. Passing the last player resolves
    /// the round and leaves the turn empty until the next call opens a new round.
    pub fn advance_turn(&mut self, state: &mut GameState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Ok(());
        }

        match state.current_turn {
            None => {
                let first = state.player_order.first().copied().ok_or(
                    RuleError::NotEnoughPlayers {
                        required: self.config.min_players,
                        actual: 0,
                    },
                )?;
                Self::begin_round(state);
                state.current_turn = Some(first);
                state.phase = GamePhase::PlayersPhase;
                self.draw_for(state, first);
            }
            Some(current) => {
                let index = state
                    .player_index(current)
                    .ok_or(RuleError::PlayerNotFound { player_id: current })?;
                match state.player_order.get(index + 1).copied() {
                    Some(next) => {
                        state.current_turn = Some(next);
                        self.draw_for(state, next);
                    }
                    None => {
                        self.resolve_end_of_round(state)?;
                        state.current_turn = None;
                    }
                }
            }
        }
        Ok(())
    }

    fn begin_round(state: &mut GameState) {
        // The opening turn of a game starts round 1; later rounds were counted at the wrap.
        if state.round == 0 {
            state.round = 1;
        }
        state.clear_spread_flags();
        state.round_acknowledgements.clear();
        debug!("round {} begins", state.round);
    }

    fn draw_for(&self, state: &mut GameState, player_id: PlayerId) {
        match state.draw_card(player_id) {
            Some(card_id) => debug!("player {player_id} drew card {card_id}"),
            None => {
                warn!("main deck empty, player {player_id} draws nothing");
                check_game_over_condition(state, self.config.max_virus_per_player);
            }
        }
    }

    pub fn play_card(
        &mut self,
        state: &mut GameState,
        action: PlayCardAction,
    ) -> Result<(), RuleError> {
        if state.is_finished() {
            return Ok(());
        }
        Self::ensure_phase(state, GamePhase::PlayersPhase)?;

        let player = state
            .get_player(action.player_id)
            .ok_or(RuleError::PlayerNotFound {
                player_id: action.player_id,
            })?;
        Self::ensure_turn_owner(state, action.player_id)?;
        let hand_index = player
            .find_card_in_hand_index(action.card_id)
            .ok_or(RuleError::CardNotInHand {
                card_id: action.card_id,
            })?;
        let card = player.hand[hand_index].clone();

        let target = state
            .get_player(action.target_player_id)
            .ok_or(RuleError::PlayerNotFound {
                player_id: action.target_player_id,
            })?;
        let targets = &action.target_card_ids;
        if targets.is_empty() {
            return Err(RuleError::MissingTargets {
                card_id: card.card_id,
            });
        }
        let max = card.max_cards_impact.max(1);
        if targets.len() > max {
            return Err(RuleError::TooManyTargets {
                card_id: card.card_id,
                max,
                given: targets.len(),
            });
        }
        for (idx, card_id) in targets.iter().enumerate() {
            if targets[..idx].contains(card_id) {
                return Err(RuleError::DuplicateTarget { card_id: *card_id });
            }
            if target.find_virus(*card_id).is_none() {
                return Err(RuleError::TargetNotFound {
                    player_id: action.target_player_id,
                    card_id: *card_id,
                });
            }
        }
        let nullified_by = find_nullifier(target, &card).map(|counter| counter.element_id.clone());

        let ctx = EffectContext::new(EffectOrigin::PlayedCard, action.target_player_id)
            .with_source_card(action.player_id, card.card_id)
            .with_target_cards(action.target_card_ids.clone());
        match nullified_by {
            Some(element_id) => {
                record_nullified(state, &card, &ctx, &element_id);
            }
            None => {
                apply_card_effect(state, &card, &ctx)?;
            }
        }

        if let Some(played) = state
            .get_player_mut(action.player_id)
            .and_then(|player| player.remove_card_from_hand(action.card_id))
        {
            state.discard(played);
        }
        info!(
            "player {} played {} on player {}",
            action.player_id, card.element_id, action.target_player_id
        );

        self.advance_turn(state)
    }

    /// Records that a player finished replaying the round's effects; the last one opens the
    /// next round.
    pub fn end_round_acknowledge(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
    ) -> Result<(), RuleError> {
        if state.is_finished() {
            return Ok(());
        }
        Self::ensure_phase(state, GamePhase::VirusPhase)?;
        if state.get_player(player_id).is_none() {
            return Err(RuleError::PlayerNotFound { player_id });
        }

        state.acknowledge_round(player_id);
        if state.all_acknowledged() {
            state.round_acknowledgements.clear();
            self.advance_turn(state)?;
        }
        Ok(())
    }

    pub fn resolve_end_of_round(&mut self, state: &mut GameState) -> Result<(), RuleError> {
        info!("resolving end of round {}", state.round);

        Self::apply_self_growth(state)?;
        self.apply_held_cards(state, EffectOrigin::Advantage)?;
        if state.is_finished() {
            return Ok(());
        }
        self.apply_held_cards(state, EffectOrigin::Disadvantage)?;
        if state.is_finished() {
            return Ok(());
        }
        self.spread_viruses(state);

        check_game_over_condition(state, self.config.max_virus_per_player);
        check_victory_condition(state);
        if state.is_finished() {
            return Ok(());
        }

        state.phase = GamePhase::VirusPhase;
        state.round += 1;
        Ok(())
    }

    fn apply_self_growth(state: &mut GameState) -> Result<(), RuleError> {
        let growing: Vec<_> = state
            .players_in_order()
            .flat_map(|player| {
                player
                    .virus_field
                    .iter()
                    .filter(|virus| !virus.contained)
                    .map(move |virus| (player.id, virus.clone()))
            })
            .collect();
        for (player_id, virus) in growing {
            let ctx = EffectContext::new(EffectOrigin::SelfGrowth, player_id)
                .with_source_card(player_id, virus.card_id)
                .with_target_cards(vec![virus.card_id]);
            apply_card_effect(state, &virus, &ctx)?;
        }
        Ok(())
    }

    fn apply_held_cards(
        &mut self,
        state: &mut GameState,
        origin: EffectOrigin,
    ) -> Result<(), RuleError> {
        let order = state.player_order.clone();
        for player_id in order {
            let held = match (state.get_player(player_id), origin) {
                (Some(player), EffectOrigin::Advantage) => player.advantages.clone(),
                (Some(player), EffectOrigin::Disadvantage) => player.disadvantages.clone(),
                _ => continue,
            };
            for card in held {
                auto_apply(state, player_id, &card, origin, &mut self.rng)?;
                if state.is_finished() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn spread_viruses(&self, state: &mut GameState) {
        let threshold = self.config.spread_threshold;
        // Collected up front so viruses born this pass cannot spread again.
        let spreading: Vec<(usize, PlayerId, CardId)> = state
            .player_order
            .iter()
            .enumerate()
            .filter_map(|(index, id)| state.get_player(*id).map(|player| (index, player)))
            .flat_map(|(index, player)| {
                player
                    .virus_field
                    .iter()
                    .filter(|virus| virus.can_spread(threshold))
                    .map(move |virus| (index, player.id, virus.card_id))
            })
            .collect();

        for (index, player_id, virus_id) in spreading {
            for neighbour in state.neighbours(index) {
                let ctx = EffectContext::new(EffectOrigin::Spread, neighbour)
                    .with_source_card(player_id, virus_id);
                let immunity = state
                    .get_player(neighbour)
                    .and_then(|player| {
                        player.has_advantage_action(ActionKind::PreventFromNeighborInfection)
                    })
                    .map(|card| card.element_id.clone());
                match immunity {
                    Some(element_id) => {
                        debug!("player {neighbour} is immune to virus {virus_id}");
                        record_spread(state, &ctx, Some(element_id.as_str()));
                    }
                    None => {
                        if let Some(infection) = state.infect(neighbour, virus_definition()) {
                            debug!("virus {virus_id} infected player {neighbour} ({infection})");
                            record_spread(state, &ctx.with_target_cards(vec![infection]), None);
                        }
                    }
                }
            }
            if let Some(virus) = state
                .get_player_mut(player_id)
                .and_then(|player| player.find_virus_mut(virus_id))
            {
                virus.spreaded_this_round = true;
            }
        }
    }
}

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::catalog::{ActionKind, CardCategory, CardDefinition};

/// Unique id of a card instance for the lifetime of a game.
pub type CardId = u32;
/// Session id handed out on join, in arrival order.
pub type PlayerId = u32;

/// Lifecycle phase of one game instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    #[default]
    WaitingPlayers,
    InitialDraw,
    PlayersPhase,
    VirusPhase,
    Victory,
    GameOver,
}

impl GamePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::Victory | GamePhase::GameOver)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum OutcomeReason {
    VirusEradicated,
    FieldOverrun { player_id: PlayerId, viruses: usize },
    Unwinnable { tokens: i64, destroy_capacity: i64 },
}

/// A card in play. Carries a copy of its definition so it never aliases the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardInstance {
    pub card_id: CardId,
    pub element_id: String,
    pub category: CardCategory,
    pub name: String,
    pub description: String,
    pub action: ActionKind,
    pub max_tokens_impact: u32,
    pub max_cards_impact: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub impacted_elements: Vec<String>,
    pub tokens: i32,
    #[serde(default)]
    pub contained: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<PlayerId>,
    #[serde(default)]
    pub spreaded_this_round: bool,
    #[serde(default)]
    pub removed: bool,
}

impl CardInstance {
    pub fn from_definition(card_id: CardId, definition: &CardDefinition) -> Self {
        let tokens = if definition.category == CardCategory::Virus {
            1
        } else {
            0
        };
        Self {
            card_id,
            element_id: definition.element_id.clone(),
            category: definition.category,
            name: definition.name.clone(),
            description: definition.description.clone(),
            action: definition.action,
            max_tokens_impact: definition.max_tokens_impact,
            max_cards_impact: definition.max_cards_impact,
            impacted_elements: definition.impacted_elements.clone(),
            tokens,
            contained: false,
            holder: None,
            spreaded_this_round: false,
            removed: false,
        }
    }

    pub fn is_virus(&self) -> bool {
        self.category == CardCategory::Virus
    }

    pub fn impacts(&self, element_id: &str) -> bool {
        self.impacted_elements
            .iter()
            .any(|element| element == element_id)
    }

    pub fn can_spread(&self, threshold: i32) -> bool {
        self.is_virus()
            && !self.removed
            && !self.contained
            && !self.spreaded_this_round
            && self.tokens >= threshold
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub hand: Vec<CardInstance>,
    #[serde(default)]
    pub advantages: Vec<CardInstance>,
    #[serde(default)]
    pub disadvantages: Vec<CardInstance>,
    #[serde(default)]
    pub virus_field: Vec<CardInstance>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            hand: Vec::new(),
            advantages: Vec::new(),
            disadvantages: Vec::new(),
            virus_field: Vec::new(),
        }
    }

    pub fn find_card_in_hand_index(&self, card_id: CardId) -> Option<usize> {
        self.hand.iter().position(|card| card.card_id == card_id)
    }

    pub fn remove_card_from_hand(&mut self, card_id: CardId) -> Option<CardInstance> {
        let idx = self.find_card_in_hand_index(card_id)?;
        Some(self.hand.remove(idx))
    }

    pub fn find_virus(&self, card_id: CardId) -> Option<&CardInstance> {
        self.virus_field.iter().find(|card| card.card_id == card_id)
    }

    pub fn find_virus_mut(&mut self, card_id: CardId) -> Option<&mut CardInstance> {
        self.virus_field
            .iter_mut()
            .find(|card| card.card_id == card_id)
    }

    pub fn has_advantage_action(&self, action: ActionKind) -> Option<&CardInstance> {
        self.advantages.iter().find(|card| card.action == action)
    }

    fn cards(&self) -> impl Iterator<Item = &CardInstance> {
        self.hand
            .iter()
            .chain(self.advantages.iter())
            .chain(self.disadvantages.iter())
            .chain(self.virus_field.iter())
    }

    fn clear_cards(&mut self) {
        self.hand.clear();
        self.advantages.clear();
        self.disadvantages.clear();
        self.virus_field.clear();
    }
}

/// Why a message was written to the effect log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectOrigin {
    PlayedCard,
    SelfGrowth,
    Advantage,
    Disadvantage,
    Spread,
}

/// One resolved (or nullified) effect, replayed by clients for animation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectMessage {
    pub origin: EffectOrigin,
    pub action_kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_player_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_card_id: Option<CardId>,
    pub target_player_id: PlayerId,
    #[serde(default)]
    pub target_card_ids: Vec<CardId>,
    pub token_delta: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullified_by: Option<String>,
}

impl EffectMessage {
    pub fn is_nullified(&self) -> bool {
        self.nullified_by.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    InvalidCurrentTurn { player_id: PlayerId },
    PlayerOrderMismatch,
    DuplicateCardId { card_id: CardId },
    HolderMismatch { card_id: CardId },
    VirusCountMismatch { recorded: u32, actual: u32 },
}

/// The shared model of one game instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub phase: GamePhase,
    /// Join order; turn order and spread neighbours are derived from it.
    #[serde(default)]
    pub player_order: Vec<PlayerId>,
    #[serde(default)]
    pub players: HashMap<PlayerId, Player>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<PlayerId>,
    pub round: u32,
    pub number_of_virus: u32,
    #[serde(default)]
    pub main_deck: Vec<CardInstance>,
    #[serde(default)]
    pub advantages_deck: Vec<CardInstance>,
    #[serde(default)]
    pub disadvantages_deck: Vec<CardInstance>,
    #[serde(default)]
    pub discard_pile: Vec<CardInstance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub round_acknowledgements: Vec<PlayerId>,
    #[serde(default)]
    pub effect_log: Vec<EffectMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeReason>,
    pub next_card_id: CardId,
    pub next_player_id: PlayerId,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_count(&self) -> usize {
        self.player_order.len()
    }

    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        self.players.insert(id, Player::new(id, name));
        self.player_order.push(id);
        id
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.player_order.retain(|other| *other != id);
        self.round_acknowledgements.retain(|other| *other != id);
        Some(player)
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.player_order.iter().position(|other| *other == id)
    }

    /// Players in turn order.
    pub fn players_in_order(&self) -> impl Iterator<Item = &Player> {
        self.player_order
            .iter()
            .filter_map(move |id| self.players.get(id))
    }

    /// Turn-order neighbours of the player at `index`, wrapping around the table.
    pub fn neighbours(&self, index: usize) -> Vec<PlayerId> {
        let count = self.player_order.len();
        if count < 2 {
            return Vec::new();
        }
        let previous = self.player_order[(index + count - 1) % count];
        let next = self.player_order[(index + 1) % count];
        if previous == next {
            vec![previous]
        } else {
            vec![previous, next]
        }
    }

    pub fn allocate_card_id(&mut self) -> CardId {
        let id = self.next_card_id;
        self.next_card_id += 1;
        id
    }

    pub fn record_effect(&mut self, message: EffectMessage) {
        self.effect_log.push(message);
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Moves the top of the main deck to the player: viruses land on their field, anything
    /// else in their hand.
    pub fn draw_card(&mut self, player_id: PlayerId) -> Option<CardId> {
        let player = self.players.get_mut(&player_id)?;
        let mut card = self.main_deck.pop()?;
        card.holder = Some(player_id);
        let card_id = card.card_id;
        if card.is_virus() {
            player.virus_field.push(card);
            self.number_of_virus += 1;
        } else {
            player.hand.push(card);
        }
        Some(card_id)
    }

    pub fn deal_advantage(&mut self, player_id: PlayerId) -> Option<CardId> {
        let player = self.players.get_mut(&player_id)?;
        let mut card = self.advantages_deck.pop()?;
        card.holder = Some(player_id);
        let card_id = card.card_id;
        player.advantages.push(card);
        Some(card_id)
    }

    pub fn deal_disadvantage(&mut self, player_id: PlayerId) -> Option<CardId> {
        let player = self.players.get_mut(&player_id)?;
        let mut card = self.disadvantages_deck.pop()?;
        card.holder = Some(player_id);
        let card_id = card.card_id;
        player.disadvantages.push(card);
        Some(card_id)
    }

    pub fn discard(&mut self, mut card: CardInstance) {
        card.holder = None;
        self.discard_pile.push(card);
    }

    /// Strips a virus from the player's field into the discard pile.
    pub fn remove_virus(&mut self, player_id: PlayerId, card_id: CardId) -> Option<CardId> {
        let player = self.players.get_mut(&player_id)?;
        let idx = player
            .virus_field
            .iter()
            .position(|card| card.card_id == card_id)?;
        let mut card = player.virus_field.remove(idx);
        card.removed = true;
        self.number_of_virus = self.number_of_virus.saturating_sub(1);
        self.discard(card);
        Some(card_id)
    }

    /// Places a freshly synthesized virus on the player's field.
    pub fn infect(&mut self, player_id: PlayerId, definition: &CardDefinition) -> Option<CardId> {
        if !self.players.contains_key(&player_id) {
            return None;
        }
        let card_id = self.allocate_card_id();
        let mut card = CardInstance::from_definition(card_id, definition);
        card.holder = Some(player_id);
        let player = self.players.get_mut(&player_id)?;
        player.virus_field.push(card);
        self.number_of_virus += 1;
        Some(card_id)
    }

    pub fn live_virus_count(&self) -> u32 {
        self.players
            .values()
            .flat_map(|player| player.virus_field.iter())
            .filter(|card| card.is_virus() && !card.removed)
            .count() as u32
    }

    pub fn total_virus_tokens(&self) -> i64 {
        self.players
            .values()
            .flat_map(|player| player.virus_field.iter())
            .filter(|card| !card.removed)
            .map(|card| i64::from(card.tokens))
            .sum()
    }

    /// Tokens the group could still destroy with the resource cards in hand.
    pub fn held_destroy_capacity(&self) -> i64 {
        self.players
            .values()
            .flat_map(|player| player.hand.iter())
            .filter(|card| card.action == ActionKind::DestroyVirusToken)
            .map(|card| i64::from(card.max_tokens_impact))
            .sum()
    }

    pub fn clear_spread_flags(&mut self) {
        for player in self.players.values_mut() {
            for virus in &mut player.virus_field {
                virus.spreaded_this_round = false;
            }
        }
    }

    pub fn acknowledge_round(&mut self, player_id: PlayerId) {
        if !self.round_acknowledgements.contains(&player_id) {
            self.round_acknowledgements.push(player_id);
        }
    }

    pub fn all_acknowledged(&self) -> bool {
        self.player_order
            .iter()
            .all(|id| self.round_acknowledgements.contains(id))
    }

    /// Drops every card and counter but keeps the seated players, so the room can be reused.
    pub fn reset_for_new_game(&mut self) {
        for player in self.players.values_mut() {
            player.clear_cards();
        }
        self.phase = GamePhase::WaitingPlayers;
        self.current_turn = None;
        self.round = 0;
        self.number_of_virus = 0;
        self.main_deck.clear();
        self.advantages_deck.clear();
        self.disadvantages_deck.clear();
        self.discard_pile.clear();
        self.round_acknowledgements.clear();
        self.effect_log.clear();
        self.outcome = None;
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if let Some(player_id) = self.current_turn {
            if !self.players.contains_key(&player_id) {
                return Err(IntegrityError::InvalidCurrentTurn { player_id });
            }
        }

        if self.player_order.len() != self.players.len()
            || self
                .player_order
                .iter()
                .any(|id| !self.players.contains_key(id))
        {
            return Err(IntegrityError::PlayerOrderMismatch);
        }

        let mut seen = HashSet::new();
        let unheld = self
            .main_deck
            .iter()
            .chain(self.advantages_deck.iter())
            .chain(self.disadvantages_deck.iter())
            .chain(self.discard_pile.iter());
        for card in unheld {
            if !seen.insert(card.card_id) {
                return Err(IntegrityError::DuplicateCardId {
                    card_id: card.card_id,
                });
            }
            if card.holder.is_some() {
                return Err(IntegrityError::HolderMismatch {
                    card_id: card.card_id,
                });
            }
        }
        for player in self.players_in_order() {
            for card in player.cards() {
                if !seen.insert(card.card_id) {
                    return Err(IntegrityError::DuplicateCardId {
                        card_id: card.card_id,
                    });
                }
                if card.holder != Some(player.id) {
                    return Err(IntegrityError::HolderMismatch {
                        card_id: card.card_id,
                    });
                }
            }
        }

        let actual = self.live_virus_count();
        if actual != self.number_of_virus {
            return Err(IntegrityError::VirusCountMismatch {
                recorded: self.number_of_virus,
                actual,
            });
        }

        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            phase: GamePhase::default(),
            player_order: Vec::new(),
            players: HashMap::new(),
            current_turn: None,
            round: 0,
            number_of_virus: 0,
            main_deck: Vec::new(),
            advantages_deck: Vec::new(),
            disadvantages_deck: Vec::new(),
            discard_pile: Vec::new(),
            round_acknowledgements: Vec::new(),
            effect_log: Vec::new(),
            outcome: None,
            next_card_id: 1,
            next_player_id: 1,
        }
    }
}

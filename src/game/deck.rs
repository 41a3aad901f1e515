use rand::seq::SliceRandom;
use rand::Rng;

use super::catalog::{definitions_in, virus_definition, CardCategory, CardDefinition};
use super::rules::RuleError;
use super::state::{CardId, CardInstance};

/// Virus copies in the main deck per seated player.
pub const VIRUS_COPIES_PER_PLAYER: usize = 4;

/// Turns catalog definitions into shuffled decks of fresh card instances.
pub struct DeckBuilder<'a, R: Rng + ?Sized> {
    rng: &'a mut R,
    next_card_id: CardId,
}

impl<'a, R: Rng + ?Sized> DeckBuilder<'a, R> {
    pub fn new(rng: &'a mut R, first_card_id: CardId) -> Self {
        Self {
            rng,
            next_card_id: first_card_id,
        }
    }

    /// First id not handed out yet.
    pub fn next_card_id(&self) -> CardId {
        self.next_card_id
    }

    pub fn build_main_deck(&mut self, player_count: usize) -> Result<Vec<CardInstance>, RuleError> {
        ensure_player_count(player_count)?;
        let mut definitions: Vec<&CardDefinition> =
            vec![virus_definition(); VIRUS_COPIES_PER_PLAYER * player_count];
        for _ in 0..player_count {
            definitions.extend(definitions_in(CardCategory::Resource));
        }
        Ok(self.instantiate_shuffled(definitions))
    }

    pub fn build_advantages_deck(
        &mut self,
        player_count: usize,
    ) -> Result<Vec<CardInstance>, RuleError> {
        self.build_simple_deck(player_count, CardCategory::Advantage)
    }

    pub fn build_disadvantages_deck(
        &mut self,
        player_count: usize,
    ) -> Result<Vec<CardInstance>, RuleError> {
        self.build_simple_deck(player_count, CardCategory::Disadvantage)
    }

    fn build_simple_deck(
        &mut self,
        player_count: usize,
        category: CardCategory,
    ) -> Result<Vec<CardInstance>, RuleError> {
        ensure_player_count(player_count)?;
        let mut definitions = Vec::new();
        for _ in 0..player_count {
            definitions.extend(definitions_in(category));
        }
        Ok(self.instantiate_shuffled(definitions))
    }

    fn instantiate_shuffled(&mut self, mut definitions: Vec<&CardDefinition>) -> Vec<CardInstance> {
        definitions.shuffle(&mut *self.rng);
        definitions
            .into_iter()
            .map(|definition| {
                let card_id = self.next_card_id;
                self.next_card_id += 1;
                CardInstance::from_definition(card_id, definition)
            })
            .collect()
    }
}

fn ensure_player_count(player_count: usize) -> Result<(), RuleError> {
    if player_count == 0 {
        return Err(RuleError::InvalidPlayerCount {
            count: player_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    fn element_counts(deck: &[CardInstance]) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for card in deck {
            *counts.entry(card.element_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn main_deck_has_four_viruses_and_each_resource_per_player() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut builder = DeckBuilder::new(&mut rng, 1);
        let deck = builder.build_main_deck(3).expect("deck should build");

        assert_eq!(deck.len(), 24);
        let counts = element_counts(&deck);
        assert_eq!(counts["VIRUS1"], 12);
        for resource in ["R1", "R2", "R3", "R4"] {
            assert_eq!(counts[resource], 3, "{resource} copies");
        }
    }

    #[test]
    fn side_decks_hold_one_copy_per_player() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut builder = DeckBuilder::new(&mut rng, 1);
        let advantages = builder.build_advantages_deck(4).unwrap();
        let disadvantages = builder.build_disadvantages_deck(4).unwrap();

        assert_eq!(advantages.len(), 16);
        assert_eq!(disadvantages.len(), 16);
        assert!(advantages
            .iter()
            .all(|card| card.category == CardCategory::Advantage));
        assert!(element_counts(&disadvantages).values().all(|count| *count == 4));
    }

    #[test]
    fn card_ids_are_fresh_across_decks() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut builder = DeckBuilder::new(&mut rng, 40);
        let mut ids = HashSet::new();
        let decks = [
            builder.build_main_deck(3).unwrap(),
            builder.build_advantages_deck(3).unwrap(),
            builder.build_disadvantages_deck(3).unwrap(),
        ];
        for card in decks.iter().flatten() {
            assert!(ids.insert(card.card_id));
        }
        assert_eq!(ids.len(), 48);
        assert_eq!(builder.next_card_id(), 88);
        assert!(ids.iter().all(|id| *id >= 40));
    }

    #[test]
    fn same_seed_gives_same_order() {
        let order = |seed: u64| {
            let mut rng = SmallRng::seed_from_u64(seed);
            DeckBuilder::new(&mut rng, 1)
                .build_main_deck(3)
                .unwrap()
                .into_iter()
                .map(|card| card.element_id)
                .collect::<Vec<_>>()
        };
        assert_eq!(order(9), order(9));
    }

    #[test]
    fn zero_players_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut builder = DeckBuilder::new(&mut rng, 1);
        assert_eq!(
            builder.build_main_deck(0),
            Err(RuleError::InvalidPlayerCount { count: 0 })
        );
        assert!(builder.build_advantages_deck(0).is_err());
    }

    #[test]
    fn fresh_virus_instances_start_with_one_token() {
        let mut rng = SmallRng::seed_from_u64(5);
        let deck = DeckBuilder::new(&mut rng, 1).build_main_deck(3).unwrap();
        for card in deck {
            if card.is_virus() {
                assert_eq!(card.tokens, 1);
            } else {
                assert_eq!(card.tokens, 0);
            }
            assert!(card.holder.is_none());
        }
    }
}

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::catalog::{ActionKind, CardCategory};
use super::rules::RuleError;
use super::state::{
    CardId, CardInstance, EffectMessage, EffectOrigin, GameState, Player, PlayerId,
};
use super::victory::check_victory_condition;

/// Who is acting on whom for one card resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectContext {
    pub origin: EffectOrigin,
    pub source_player: Option<PlayerId>,
    pub source_card: Option<CardId>,
    pub target_player: PlayerId,
    pub target_cards: Vec<CardId>,
}

impl EffectContext {
    pub fn new(origin: EffectOrigin, target_player: PlayerId) -> Self {
        Self {
            origin,
            source_player: None,
            source_card: None,
            target_player,
            target_cards: Vec::new(),
        }
    }

    pub fn with_source_card(mut self, player_id: PlayerId, card_id: CardId) -> Self {
        self.source_player = Some(player_id);
        self.source_card = Some(card_id);
        self
    }

    pub fn with_target_cards(mut self, card_ids: Vec<CardId>) -> Self {
        self.target_cards = card_ids;
        self
    }

    fn message(&self, action_kind: ActionKind, token_delta: i32) -> EffectMessage {
        EffectMessage {
            origin: self.origin,
            action_kind,
            source_player_id: self.source_player,
            source_card_id: self.source_card,
            target_player_id: self.target_player,
            target_card_ids: self.target_cards.clone(),
            token_delta,
            nullified_by: None,
        }
    }
}

/// Applies `card`'s action to the targeted viruses of `ctx.target_player` and records the
/// resulting messages in the state's effect log. Targets are checked before anything
/// changes.
pub fn apply_card_effect(
    state: &mut GameState,
    card: &CardInstance,
    ctx: &EffectContext,
) -> Result<(), RuleError> {
    let target = state
        .get_player(ctx.target_player)
        .ok_or(RuleError::PlayerNotFound {
            player_id: ctx.target_player,
        })?;
    for card_id in &ctx.target_cards {
        if target.find_virus(*card_id).is_none() {
            return Err(RuleError::TargetNotFound {
                player_id: ctx.target_player,
                card_id: *card_id,
            });
        }
    }

    if card.action.is_passive() {
        return Ok(());
    }

    let impact = card.max_tokens_impact as i32;
    let mut destroyed = Vec::new();
    let token_delta = match card.action {
        ActionKind::ContainVirus => {
            for_each_target(state, ctx, |virus| virus.contained = true);
            0
        }
        ActionKind::IncrementVirusToken => {
            for_each_target(state, ctx, |virus| virus.tokens += impact);
            impact
        }
        ActionKind::DestroyVirusToken => {
            let mut exhausted = Vec::new();
            for_each_target(state, ctx, |virus| {
                virus.tokens -= impact;
                if virus.tokens < 1 {
                    exhausted.push(virus.card_id);
                }
            });
            for card_id in exhausted {
                if state.remove_virus(ctx.target_player, card_id).is_some() {
                    debug!("virus {card_id} destroyed on player {}", ctx.target_player);
                    destroyed.push(card_id);
                }
            }
            -impact
        }
        ActionKind::PreventFromNeighborInfection | ActionKind::PreventCardAction => 0,
    };

    state.record_effect(ctx.message(card.action, token_delta));

    if !destroyed.is_empty() {
        check_victory_condition(state);
    }

    Ok(())
}

fn for_each_target<F>(state: &mut GameState, ctx: &EffectContext, mut apply: F)
where
    F: FnMut(&mut CardInstance),
{
    if let Some(player) = state.get_player_mut(ctx.target_player) {
        for card_id in &ctx.target_cards {
            if let Some(virus) = player.find_virus_mut(*card_id) {
                apply(virus);
            }
        }
    }
}

/// Finds the opposing card held by `holder` that cancels `card`. Advantages are countered
/// by disadvantages and the other way round; played resources by disadvantages.
pub fn find_nullifier<'a>(holder: &'a Player, card: &CardInstance) -> Option<&'a CardInstance> {
    let opposing = match card.category {
        CardCategory::Advantage | CardCategory::Resource => &holder.disadvantages,
        CardCategory::Disadvantage => &holder.advantages,
        CardCategory::Virus => return None,
    };
    opposing.iter().find(|counter| {
        counter.action == ActionKind::PreventCardAction && counter.impacts(&card.element_id)
    })
}

/// Logs a cancelled effect. Nothing on the board changes.
pub fn record_nullified(
    state: &mut GameState,
    card: &CardInstance,
    ctx: &EffectContext,
    nullified_by: &str,
) {
    debug!(
        "{} ({}) nullified by {nullified_by}",
        card.element_id, card.card_id
    );
    let mut message = ctx.message(card.action, 0);
    message.nullified_by = Some(nullified_by.to_string());
    state.record_effect(message);
}

/// Logs one neighbour infection, or its cancellation by an immunity card.
pub fn record_spread(
    state: &mut GameState,
    ctx: &EffectContext,
    nullified_by: Option<&str>,
) {
    let token_delta = if nullified_by.is_some() { 0 } else { 1 };
    let mut message = ctx.message(ActionKind::IncrementVirusToken, token_delta);
    message.nullified_by = nullified_by.map(str::to_string);
    state.record_effect(message);
}

/// Uniform random subset of the field, without replacement, of at most `max_cards` cards.
pub fn sample_targets<R: Rng + ?Sized>(
    field: &[CardInstance],
    max_cards: usize,
    rng: &mut R,
) -> Vec<CardId> {
    let amount = max_cards.min(field.len());
    field
        .choose_multiple(rng, amount)
        .map(|card| card.card_id)
        .collect()
}

/// Resolves a held advantage or disadvantage against random viruses of its holder, unless a
/// counter-card of the same player cancels it.
pub fn auto_apply<R: Rng + ?Sized>(
    state: &mut GameState,
    player_id: PlayerId,
    card: &CardInstance,
    origin: EffectOrigin,
    rng: &mut R,
) -> Result<(), RuleError> {
    if card.action.is_passive() {
        return Ok(());
    }

    let player = state
        .get_player(player_id)
        .ok_or(RuleError::PlayerNotFound { player_id })?;
    let base_ctx = EffectContext::new(origin, player_id).with_source_card(player_id, card.card_id);

    if let Some(nullifier) = find_nullifier(player, card) {
        let nullified_by = nullifier.element_id.clone();
        record_nullified(state, card, &base_ctx, &nullified_by);
        return Ok(());
    }

    if player.virus_field.is_empty() {
        return Ok(());
    }

    let targets = sample_targets(&player.virus_field, card.max_cards_impact, rng);
    apply_card_effect(state, card, &base_ctx.with_target_cards(targets))
}

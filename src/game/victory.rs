use log::info;

use super::state::{GamePhase, GameState, OutcomeReason};

/// Moves the game to `Victory` once no virus is left on any field.
pub fn check_victory_condition(state: &mut GameState) -> bool {
    if state.is_finished() {
        return state.phase == GamePhase::Victory;
    }
    if state.number_of_virus == 0 {
        info!("all viruses eradicated in round {}", state.round);
        conclude(state, GamePhase::Victory, OutcomeReason::VirusEradicated);
        return true;
    }
    false
}

/// Moves the game to `GameOver` when a field is overrun, or when the deck is exhausted
/// and the destroy cards left in hand can no longer clear every token.
pub fn check_game_over_condition(state: &mut GameState, max_virus_per_player: usize) -> bool {
    if state.is_finished() {
        return state.phase == GamePhase::GameOver;
    }

    let overrun = state
        .players_in_order()
        .find(|player| player.virus_field.len() > max_virus_per_player)
        .map(|player| (player.id, player.virus_field.len()));
    if let Some((player_id, viruses)) = overrun {
        info!("player {player_id} overrun with {viruses} viruses");
        conclude(
            state,
            GamePhase::GameOver,
            OutcomeReason::FieldOverrun { player_id, viruses },
        );
        return true;
    }

    if state.main_deck.is_empty() {
        let tokens = state.total_virus_tokens();
        let destroy_capacity = state.held_destroy_capacity();
        if tokens > destroy_capacity {
            info!("deck exhausted: {tokens} tokens left against {destroy_capacity} destroyable");
            conclude(
                state,
                GamePhase::GameOver,
                OutcomeReason::Unwinnable {
                    tokens,
                    destroy_capacity,
                },
            );
            return true;
        }
    }

    false
}

fn conclude(state: &mut GameState, phase: GamePhase, reason: OutcomeReason) {
    state.phase = phase;
    state.outcome = Some(reason);
}

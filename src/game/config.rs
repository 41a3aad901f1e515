use serde::{Deserialize, Serialize};

const DEFAULT_MIN_PLAYERS: usize = 3;
const DEFAULT_MAX_PLAYERS: usize = 4;
const DEFAULT_INITIAL_HAND: usize = 3;
const DEFAULT_SPREAD_THRESHOLD: i32 = 3;
const DEFAULT_MAX_VIRUS_PER_PLAYER: usize = 5;

/// Tunable rules for one game instance. Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuleConfig {
    pub min_players: usize,
    pub max_players: usize,
    /// Main-deck cards dealt to each player at game start.
    pub initial_hand: usize,
    /// Token count at which an uncontained virus infects its neighbours.
    pub spread_threshold: i32,
    /// A field holding more viruses than this loses the game.
    pub max_virus_per_player: usize,
    /// Fixed seed for shuffles and target sampling; `None` draws from entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl RuleConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_spread_threshold(mut self, threshold: i32) -> Self {
        self.spread_threshold = threshold;
        self
    }

    pub fn with_max_virus_per_player(mut self, max: usize) -> Self {
        self.max_virus_per_player = max;
        self
    }

    pub fn with_player_limits(mut self, min_players: usize, max_players: usize) -> Self {
        self.min_players = min_players;
        self.max_players = max_players;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            min_players: DEFAULT_MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
            initial_hand: DEFAULT_INITIAL_HAND,
            spread_threshold: DEFAULT_SPREAD_THRESHOLD,
            max_virus_per_player: DEFAULT_MAX_VIRUS_PER_PLAYER,
            seed: None,
        }
    }
}

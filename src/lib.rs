pub mod game;
pub mod logging;

use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

pub use game::{
    catalog, ActionKind, CardCategory, CardDefinition, CardId, CardInstance, Command,
    CommandError, CommandOutcome, EffectMessage, EffectOrigin, ErrorKind, GameEngine, GamePhase,
    GameState, IntegrityError, OutcomeReason, PlayCardAction, Player, PlayerId, RuleConfig,
    RuleEngine, RuleError,
};

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    logging::init(log::LevelFilter::Info);
}

fn to_js_error(error: CommandError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// One game room driven by JSON commands, e.g. `{"type": "JOIN", "name": "ana"}`.
#[wasm_bindgen(js_name = "GameEngine")]
pub struct JsGameEngine {
    inner: GameEngine,
}

#[wasm_bindgen(js_class = "GameEngine")]
impl JsGameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<JsGameEngine, JsValue> {
        let config = match config_json {
            Some(json) => RuleConfig::from_json(&json).map_err(serde_to_js_error)?,
            None => RuleConfig::default(),
        };
        Ok(JsGameEngine {
            inner: GameEngine::new(config),
        })
    }

    /// Applies one command and returns the outcome to broadcast. Rejected commands throw a
    /// `{ kind, message }` object and leave the room unchanged.
    pub fn execute(&mut self, command_json: &str) -> Result<String, JsValue> {
        let outcome = self.inner.execute_json(command_json).map_err(to_js_error)?;
        serde_json::to_string(&outcome).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "stateJson")]
    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.inner.state()).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "catalogJson")]
    pub fn catalog_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(catalog()).map_err(serde_to_js_error)
    }
}

/// Card definitions as plain JS objects.
#[wasm_bindgen(js_name = "createCatalog")]
pub fn create_catalog() -> Result<JsValue, JsValue> {
    to_value(catalog()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state_json: &str) -> Result<(), JsValue> {
    let state: GameState = serde_json::from_str(state_json).map_err(serde_to_js_error)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }.into()))?;
    Ok(())
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}

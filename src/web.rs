//! Browser bindings
//!
//! Exposes one game to a JavaScript front-end. Rendering, camera, and the
//! realtime database live on the JS side; snapshots cross the boundary as JSON.

use wasm_bindgen::prelude::*;

use crate::orchestrator::MoveOrchestrator;
use crate::settings::Settings;
use crate::sim::GameState;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Already initialized by an earlier module instance
        return;
    }
    log::info!("Chain Reaction starting...");
}

#[wasm_bindgen]
pub struct WebGame {
    inner: MoveOrchestrator,
}

#[wasm_bindgen]
impl WebGame {
    /// `settings_json` may be empty for defaults
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: &str) -> Result<WebGame, JsError> {
        let settings = if settings_json.trim().is_empty() {
            Settings::load()
        } else {
            Settings::from_json(settings_json)?
        };
        Ok(WebGame {
            inner: MoveOrchestrator::new(settings)?,
        })
    }

    /// Cell click. False if the move was rejected.
    pub fn submit_move(&mut self, row: usize, col: usize) -> Result<bool, JsError> {
        Ok(self.inner.submit_move(row, col)?)
    }

    /// Frame step in seconds
    pub fn advance(&mut self, dt: f32) {
        self.inner.advance(dt);
    }

    pub fn playback_finished(&mut self) {
        self.inner.playback_finished();
    }

    pub fn is_busy(&self) -> bool {
        self.inner.is_busy()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Current state for publishing to the shared document
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(self.inner.state())?)
    }

    /// Adopt a snapshot from the shared document. True if local state changed.
    pub fn adopt_remote_json(&mut self, json: &str) -> Result<bool, JsError> {
        let state: GameState = serde_json::from_str(json)?;
        Ok(self.inner.adopt_remote(state))
    }

    /// Active orb flights as JSON `[{from, to, from_owner, to_owner, progress}]`
    pub fn flights_json(&self) -> Result<String, JsError> {
        let flights: Vec<serde_json::Value> = self
            .inner
            .playback()
            .map(|p| {
                p.active()
                    .map(|(f, progress)| {
                        serde_json::json!({
                            "from": f.from,
                            "to": f.to,
                            "from_owner": f.from_owner,
                            "to_owner": f.to_owner,
                            "progress": progress,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(serde_json::to_string(&flights)?)
    }
}

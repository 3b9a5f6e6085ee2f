use serde::Serialize;
use tokio_util::sync::CancellationToken;
use wasm_bindgen::prelude::*;

use super::collector::Annotator;
use super::config::MatchingConfig;
use super::role::{Role, RoleRegistry};

/// JS-facing annotator: hydrate roles once, annotate many times
#[wasm_bindgen]
pub struct RoleAnnotator {
    inner: Annotator,
    config: MatchingConfig,
}

fn parse_config(config: JsValue) -> Result<MatchingConfig, JsValue> {
    if config.is_null() || config.is_undefined() {
        return Ok(MatchingConfig::default());
    }
    serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| {
            web_sys::console::error_1(&format!("[RoleAnnotator] Serialization failed: {:?}", e).into());
            JsValue::from_str(&format!("Serialization error: {}", e))
        })
}

#[wasm_bindgen]
impl RoleAnnotator {
    /// Create an annotator with an optional `MatchingConfig` object
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<RoleAnnotator, JsValue> {
        Ok(Self {
            inner: Annotator::new(),
            config: parse_config(config)?,
        })
    }

    /// Replace the role registry. Returns false when `version` is already
    /// the current one.
    #[wasm_bindgen(js_name = hydrateRoles)]
    pub fn hydrate_roles(&mut self, roles: JsValue, version: f64) -> Result<bool, JsValue> {
        let roles: Vec<Role> = serde_wasm_bindgen::from_value(roles)
            .map_err(|e| JsValue::from_str(&format!("Invalid roles: {}", e)))?;
        let registry = RoleRegistry::new(version as u64, roles);
        self.inner
            .rebuild(&registry)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        self.config = parse_config(config)?;
        Ok(())
    }

    /// Full annotation pass over `text`
    #[wasm_bindgen]
    pub fn annotate(&self, text: &str) -> Result<JsValue, JsValue> {
        let annotation = self.inner.collect(text, &self.config, &CancellationToken::new());
        to_js(&annotation)
    }

    /// Role owning the span under `offset`, or null
    #[wasm_bindgen(js_name = roleAt)]
    pub fn role_at(&self, text: &str, offset: usize) -> Result<JsValue, JsValue> {
        let annotation = self.inner.collect(text, &self.config, &CancellationToken::new());
        match annotation.role_at(offset) {
            Some(entry) => to_js(entry),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = containsAny)]
    pub fn contains_any(&self, text: &str) -> bool {
        self.inner.index().contains_any(text)
    }

    #[wasm_bindgen(js_name = patternCount)]
    pub fn pattern_count(&self) -> usize {
        self.inner.index().pattern_count()
    }

    /// Registry version of the current index, or -1 before hydration
    #[wasm_bindgen(js_name = version)]
    pub fn version(&self) -> f64 {
        self.inner.version().map_or(-1.0, |v| v as f64)
    }
}

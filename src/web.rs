use crate::core::config::Config;
use crate::core::io::WebStorage;
use crate::services::api::{create_backend, StoryRequest};
use crate::services::handoff::SelectionHandoff;
use crate::services::store::StoryStore;
use crate::services::workflow::StoryWorkflow;
use serde::Serialize;
use std::rc::Rc;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

#[wasm_bindgen]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).unwrap_or(());
}

fn to_js(e: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Browser entry point: story state in `localStorage`, gallery handoff in
/// `sessionStorage`. Structured values cross the boundary as JSON strings.
#[wasm_bindgen]
pub struct NovelApp {
    workflow: Rc<StoryWorkflow>,
    handoff: SelectionHandoff,
}

#[wasm_bindgen]
impl NovelApp {
    #[wasm_bindgen(constructor)]
    pub fn new(production_url: Option<String>, demo: Option<bool>) -> Result<NovelApp, JsValue> {
        let mut config = Config::default();
        if let Some(url) = production_url {
            config.api.production_url = url;
        }
        config.api.demo = demo.unwrap_or(false);

        let host = web_sys::window()
            .and_then(|w| w.location().hostname().ok())
            .unwrap_or_default();
        let base_url = config.api.base_url_for_host(&host).to_string();
        log::info!("Using backend at {}", base_url);

        let local = Arc::new(WebStorage::local().map_err(to_js)?);
        let session = Arc::new(WebStorage::session().map_err(to_js)?);

        let backend = create_backend(&config, &base_url).map_err(to_js)?;
        let workflow = StoryWorkflow::new(backend, StoryStore::new(local))
            .with_default_model(&config.story.default_model);

        Ok(NovelApp {
            workflow: Rc::new(workflow),
            handoff: SelectionHandoff::new(session),
        })
    }

    pub fn has_story(&self) -> Result<bool, JsValue> {
        self.workflow.has_story().map_err(to_js)
    }

    pub fn episodes(&self) -> Result<String, JsValue> {
        to_json(&self.workflow.store().episodes().map_err(to_js)?)
    }

    pub fn session_data(&self) -> Result<String, JsValue> {
        to_json(&self.workflow.store().session_data().map_err(to_js)?)
    }

    pub fn latest_context(&self) -> Result<Option<String>, JsValue> {
        match self.workflow.store().latest_context().map_err(to_js)? {
            Some(context) => to_json(&context).map(Some),
            None => Ok(None),
        }
    }

    pub fn export_snapshot(&self) -> Result<String, JsValue> {
        to_json(&self.workflow.store().export_snapshot().map_err(to_js)?)
    }

    pub fn import_snapshot(&self, json: &str) -> bool {
        self.workflow.store().import_snapshot_str(json)
    }

    pub fn clear_all(&self) -> Result<(), JsValue> {
        self.workflow.restart().map_err(to_js)
    }

    pub fn take_selected_character(&self) -> Result<Option<String>, JsValue> {
        match self.handoff.take_character().map_err(to_js)? {
            Some(profile) => to_json(&profile).map(Some),
            None => Ok(None),
        }
    }

    pub fn take_selected_location(&self) -> Result<Option<String>, JsValue> {
        match self.handoff.take_location().map_err(to_js)? {
            Some(profile) => to_json(&profile).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves to the ideas text.
    pub fn generate_ideas(&self, genre: String, model_choice: String) -> js_sys::Promise {
        let workflow = self.workflow.clone();
        future_to_promise(async move {
            let ideas = workflow.ideas(&genre, &model_choice).await.map_err(to_js)?;
            Ok(JsValue::from_str(&ideas))
        })
    }

    /// Takes a JSON `StoryRequest`; resolves to the episode list as JSON.
    pub fn start_story(&self, request_json: String) -> js_sys::Promise {
        let workflow = self.workflow.clone();
        future_to_promise(async move {
            let request: StoryRequest = serde_json::from_str(&request_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid story request: {}", e)))?;
            let episodes = workflow.start(&request).await.map_err(to_js)?;
            Ok(JsValue::from_str(&to_json(&episodes)?))
        })
    }

    /// Resolves to the episode list as JSON.
    pub fn continue_story(&self) -> js_sys::Promise {
        let workflow = self.workflow.clone();
        future_to_promise(async move {
            let episodes = workflow.continue_story().await.map_err(to_js)?;
            Ok(JsValue::from_str(&to_json(&episodes)?))
        })
    }
}

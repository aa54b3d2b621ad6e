//! WASM bindings for storybook-engine: the synchronous half of the core
//! (theme listing, story assembly, session reducer, reader, checkout
//! validation) for the browser front end. Values cross the boundary as
//! JSON strings.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use storybook_engine::core::assembler::StoryAssembler;
use storybook_engine::core::catalog::ThemeMeta;
use storybook_engine::core::checkout::OrderForm;
use storybook_engine::core::progress::ProgressReadout;
use storybook_engine::core::reader::StoryReader;
use storybook_engine::core::session::{SessionEvent, SessionStore};
use storybook_engine::schema::order::{
    subscription_addon_label, DeliveryFormat, Plan, ShippingAddress, PLANS,
    SUBSCRIPTION_ADDON_CENTS,
};
use storybook_engine::schema::profile::ChildProfile;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(Serialize)]
struct ThemeInfo {
    tag: &'static str,
    #[serde(flatten)]
    meta: ThemeMeta,
}

#[derive(Deserialize)]
struct OrderFormInput {
    #[serde(default)]
    format: DeliveryFormat,
    #[serde(default)]
    email: String,
    #[serde(default)]
    subscribe_monthly: bool,
    #[serde(default)]
    address: Option<ShippingAddress>,
}

impl From<OrderFormInput> for OrderForm {
    fn from(input: OrderFormInput) -> Self {
        let defaults = OrderForm::default();
        OrderForm {
            format: input.format,
            email: input.email,
            subscribe_monthly: input.subscribe_monthly,
            address: input.address.unwrap_or(defaults.address),
        }
    }
}

#[derive(Serialize)]
struct Pricing {
    plans: &'static [Plan],
    subscription_addon: Addon,
}

#[derive(Serialize)]
struct Addon {
    price_cents: u32,
    label: String,
}

fn pricing() -> Pricing {
    Pricing {
        plans: &PLANS,
        subscription_addon: Addon {
            price_cents: SUBSCRIPTION_ADDON_CENTS,
            label: subscription_addon_label(),
        },
    }
}

#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
    errors: Vec<FieldError>,
}

#[derive(Serialize)]
struct FieldError {
    field: &'static str,
    message: &'static str,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// Exported API
// ---------------------------------------------------------------------------

/// One user session: the state holder plus the preview pager position.
#[wasm_bindgen]
pub struct StorybookSession {
    store: SessionStore,
    assembler: StoryAssembler,
    reader: StoryReader,
}

#[wasm_bindgen]
impl StorybookSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<StorybookSession, JsError> {
        let assembler = StoryAssembler::builtin()
            .map_err(|e| JsError::new(&format!("Theme load error: {e}")))?;
        Ok(StorybookSession {
            store: SessionStore::new(),
            assembler,
            reader: StoryReader::new(),
        })
    }

    /// Theme cards, in display order.
    pub fn themes(&self) -> Result<String, JsError> {
        let themes: Vec<ThemeInfo> = self
            .assembler
            .catalog()
            .themes()
            .into_iter()
            .map(|(theme, meta)| ThemeInfo {
                tag: theme.tag(),
                meta,
            })
            .collect();
        to_json(&themes)
    }

    /// Assemble a story for a profile without touching the session.
    pub fn assemble(&self, profile_json: &str) -> Result<String, JsError> {
        let profile: ChildProfile = serde_json::from_str(profile_json)
            .map_err(|e| JsError::new(&format!("Invalid profile JSON: {e}")))?;
        profile
            .validate()
            .map_err(|e| JsError::new(&format!("Invalid profile: {e}")))?;
        let story = self
            .assembler
            .assemble(&profile)
            .map_err(|e| JsError::new(&format!("Assembly error: {e}")))?;
        to_json(&story)
    }

    /// Apply a `{type, payload}` event and return the new state.
    pub fn dispatch(&mut self, event_json: &str) -> Result<String, JsError> {
        let event: SessionEvent = serde_json::from_str(event_json)
            .map_err(|e| JsError::new(&format!("Invalid event JSON: {e}")))?;
        if matches!(event, SessionEvent::SetStory(_) | SessionEvent::Reset) {
            self.reader = StoryReader::new();
        }
        self.store.dispatch(event);
        self.state()
    }

    pub fn state(&self) -> Result<String, JsError> {
        to_json(&self.store.snapshot())
    }

    /// Generating-screen stage, bar width and milestones.
    pub fn progress(&self) -> Result<String, JsError> {
        to_json(&ProgressReadout::at(self.store.snapshot().generation_progress))
    }

    /// The cover or current page of the session's story.
    pub fn reader_view(&self) -> Result<String, JsError> {
        let story = self
            .store
            .snapshot()
            .story
            .ok_or_else(|| JsError::new("No story to read"))?;
        to_json(&self.reader.view(&story))
    }

    pub fn open_book(&mut self) {
        self.reader.open();
    }

    pub fn close_book(&mut self) {
        self.reader.close();
    }

    pub fn next_page(&mut self) {
        if let Some(story) = self.store.snapshot().story {
            self.reader.next(&story);
        }
    }

    pub fn previous_page(&mut self) {
        self.reader.previous();
    }

    /// Check an order form; field errors come back keyed for inline display.
    pub fn validate_order(form_json: &str) -> Result<String, JsError> {
        let input: OrderFormInput = serde_json::from_str(form_json)
            .map_err(|e| JsError::new(&format!("Invalid order JSON: {e}")))?;
        let errors = OrderForm::from(input).validate();
        let report = ValidationReport {
            valid: errors.is_empty(),
            errors: errors
                .fields()
                .into_iter()
                .filter_map(|field| {
                    errors.get(field).map(|message| FieldError {
                        field: field.key(),
                        message,
                    })
                })
                .collect(),
        };
        to_json(&report)
    }

    /// Plans shown on the checkout screen, plus the monthly add-on
    /// offered beside the subscribe toggle.
    pub fn plans() -> Result<String, JsError> {
        to_json(&pricing())
    }
}

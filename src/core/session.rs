//! Session state machine: the single source of truth for one user
//! journey.
//!
//! [`reduce`] is a pure `(state, event) -> state` function. [`SessionStore`]
//! owns the one live value and applies dispatched events in order;
//! screens read snapshots and subscribe to changes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::schema::order::OrderDetails;
use crate::schema::profile::ChildProfile;
use crate::schema::story::{Story, StoryStatus};

/// The screen currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Landing,
    Onboarding,
    Generating,
    Preview,
    Order,
    Confirmation,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub step: Step,
    pub profile: Option<ChildProfile>,
    pub story: Option<Story>,
    pub order: Option<OrderDetails>,
    /// Derived from the story's illustrated pages, 0-100.
    pub generation_progress: u8,
}

impl SessionState {
    pub fn initial() -> Self {
        Self::default()
    }
}

/// The closed vocabulary of things a screen can ask the session to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    SetStep(Step),
    SetProfile(ChildProfile),
    SetStory(Story),
    UpdatePageIllustration { page_id: u32, url: String },
    SetOrder(OrderDetails),
    Reset,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetStep(_) => "SET_STEP",
            Self::SetProfile(_) => "SET_PROFILE",
            Self::SetStory(_) => "SET_STORY",
            Self::UpdatePageIllustration { .. } => "UPDATE_PAGE_ILLUSTRATION",
            Self::SetOrder(_) => "SET_ORDER",
            Self::Reset => "RESET",
        }
    }
}

/// Apply one event to a state, producing the next state.
///
/// Never changes `step` on its own: reaching `Ready` does not leave the
/// generating screen. An illustration update without a story is a
/// caller ordering bug and leaves the state untouched.
pub fn reduce(mut state: SessionState, event: SessionEvent) -> SessionState {
    match event {
        SessionEvent::SetStep(step) => state.step = step,
        SessionEvent::SetProfile(profile) => state.profile = Some(profile),
        SessionEvent::SetStory(story) => {
            state.generation_progress = story.progress_percent();
            state.story = Some(story);
        }
        SessionEvent::UpdatePageIllustration { page_id, url } => {
            let Some(story) = state.story.as_mut() else {
                tracing::warn!(page_id, "illustration update with no story, ignoring");
                return state;
            };
            match story.pages.iter_mut().find(|p| p.id == page_id) {
                Some(page) => page.illustration_url = Some(url),
                None => tracing::warn!(page_id, story_id = %story.id, "no such page"),
            }
            if story.status != StoryStatus::Ordered {
                story.status = if story.is_fully_illustrated() {
                    StoryStatus::Ready
                } else {
                    StoryStatus::Generating
                };
            }
            state.generation_progress = story.progress_percent();
        }
        SessionEvent::SetOrder(order) => {
            if let Some(story) = state.story.as_mut() {
                story.status = StoryStatus::Ordered;
            }
            state.order = Some(order);
        }
        SessionEvent::Reset => return SessionState::initial(),
    }
    state
}

/// Owner of the live session state.
///
/// Cloning the store hands out another dispatcher for the same session,
/// never a second copy of the state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_state(SessionState::initial())
    }

    pub fn with_state(state: SessionState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    /// Apply `event` atomically. Events from any number of clones are
    /// applied one at a time, in the order they arrive.
    pub fn dispatch(&self, event: SessionEvent) {
        tracing::debug!(event = event.name(), "dispatch");
        self.tx.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, event);
        });
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn step(&self) -> Step {
        self.tx.borrow().step
    }

    /// Receiver that observes every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}

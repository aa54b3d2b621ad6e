//! Onboarding wizard and the onboarding-completion flow.
//!
//! [`OnboardingForm`] holds the wizard's in-progress answers and owns the
//! photo previews. [`run_generation`] is the async sequence that turns a
//! finished profile into an illustrated story; [`GenerationTask`] runs it
//! in the background with a cancellation token tied to its own lifetime.

use rustc_hash::FxHashSet;
use std::sync::{Arc, Mutex};
use strum::{EnumCount, EnumIter, IntoEnumIterator};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::core::assembler::StoryAssembler;
use crate::core::catalog::CatalogError;
use crate::core::illustration::{
    request_illustrations, submit_fine_tune, FineTuneRequest, IllustrationError,
    IllustrationService,
};
use crate::core::session::{SessionEvent, SessionStore, Step};
use crate::schema::profile::{
    ChildProfile, PhotoHandle, ProfileError, Theme, MAX_AGE, MAX_INTERESTS, MAX_PHOTOS, MIN_AGE,
    MIN_PHOTOS, NAME_MAX_CHARS, NAME_MIN_CHARS,
};

/// The six wizard screens, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumCount, EnumIter)]
pub enum WizardStep {
    #[default]
    Photos,
    NameAndAge,
    Theme,
    Interests,
    Friends,
    FavoritePlace,
}

impl WizardStep {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<Self> {
        Self::iter().nth(self.index() + 1)
    }

    pub fn previous(&self) -> Option<Self> {
        self.index().checked_sub(1).and_then(|i| Self::iter().nth(i))
    }

    /// Width of the wizard progress bar, as a percentage.
    pub fn progress_percent(&self) -> u8 {
        (((self.index() + 1) * 100) / Self::COUNT) as u8
    }
}

/// Creates and releases preview URLs for uploaded photos.
pub trait PreviewRegistry: Send + Sync + std::fmt::Debug {
    fn create(&self, photo: &PhotoHandle) -> String;
    fn release(&self, preview_url: &str);
}

/// A preview URL that is released when dropped.
#[derive(Debug)]
pub struct PhotoPreview {
    photo: PhotoHandle,
    url: String,
    registry: Arc<dyn PreviewRegistry>,
}

impl PhotoPreview {
    pub fn new(photo: PhotoHandle, registry: Arc<dyn PreviewRegistry>) -> Self {
        let url = registry.create(&photo);
        Self {
            photo,
            url,
            registry,
        }
    }

    pub fn photo(&self) -> &PhotoHandle {
        &self.photo
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PhotoPreview {
    fn drop(&mut self) {
        self.registry.release(&self.url);
    }
}

/// In-process registry that hands out `preview://` URLs and tracks which
/// are still live.
#[derive(Debug, Default)]
pub struct InMemoryPreviews {
    state: Mutex<PreviewCounter>,
}

#[derive(Debug, Default)]
struct PreviewCounter {
    next_id: u64,
    live: FxHashSet<String>,
}

impl InMemoryPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().map(|s| s.live.len()).unwrap_or(0)
    }
}

impl PreviewRegistry for InMemoryPreviews {
    fn create(&self, photo: &PhotoHandle) -> String {
        let Ok(mut state) = self.state.lock() else {
            return format!("preview://{}", photo.as_str());
        };
        state.next_id += 1;
        let url = format!("preview://{}/{}", state.next_id, photo.as_str());
        state.live.insert(url.clone());
        url
    }

    fn release(&self, preview_url: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.live.remove(preview_url);
        }
    }
}

/// In-progress answers of the onboarding wizard.
#[derive(Debug)]
pub struct OnboardingForm {
    step: WizardStep,
    registry: Arc<dyn PreviewRegistry>,
    photos: Vec<PhotoPreview>,
    pub name: String,
    pub age: u8,
    pub theme: Theme,
    interests: Vec<String>,
    pub best_friend: String,
    pub fears: String,
    pub favorite_place: String,
}

impl OnboardingForm {
    pub fn new(registry: Arc<dyn PreviewRegistry>) -> Self {
        Self {
            step: WizardStep::default(),
            registry,
            photos: Vec::new(),
            name: String::new(),
            age: 5,
            theme: Theme::default(),
            interests: Vec::new(),
            best_friend: String::new(),
            fears: String::new(),
            favorite_place: String::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn photos(&self) -> &[PhotoPreview] {
        &self.photos
    }

    pub fn interests(&self) -> &[String] {
        &self.interests
    }

    /// Add uploads until three photos are held; extras are ignored.
    /// Returns how many were added.
    pub fn add_photos<I>(&mut self, uploads: I) -> usize
    where
        I: IntoIterator<Item = PhotoHandle>,
    {
        let room = MAX_PHOTOS.saturating_sub(self.photos.len());
        let before = self.photos.len();
        for photo in uploads.into_iter().take(room) {
            self.photos
                .push(PhotoPreview::new(photo, Arc::clone(&self.registry)));
        }
        self.photos.len() - before
    }

    /// Remove the photo at `index`, releasing its preview.
    pub fn remove_photo(&mut self, index: usize) -> Option<PhotoHandle> {
        if index >= self.photos.len() {
            return None;
        }
        let preview = self.photos.remove(index);
        Some(preview.photo().clone())
    }

    /// Swap the photo at `index` for a new upload. The old preview is
    /// released.
    pub fn replace_photo(&mut self, index: usize, photo: PhotoHandle) -> bool {
        match self.photos.get_mut(index) {
            Some(slot) => {
                *slot = PhotoPreview::new(photo, Arc::clone(&self.registry));
                true
            }
            None => false,
        }
    }

    /// Add a trimmed interest. Blank, duplicate, or seventh entries are
    /// refused.
    pub fn add_interest(&mut self, raw: &str) -> bool {
        let interest = raw.trim();
        if interest.is_empty()
            || self.interests.iter().any(|i| i == interest)
            || self.interests.len() >= MAX_INTERESTS
        {
            return false;
        }
        self.interests.push(interest.to_string());
        true
    }

    pub fn remove_interest(&mut self, interest: &str) -> bool {
        let before = self.interests.len();
        self.interests.retain(|i| i != interest);
        self.interests.len() != before
    }

    /// Whether the current wizard screen is complete enough to move on.
    pub fn can_proceed(&self) -> bool {
        match self.step {
            WizardStep::Photos => self.photos.len() >= MIN_PHOTOS,
            WizardStep::NameAndAge => {
                let len = self.name.trim().chars().count();
                (NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len)
                    && (MIN_AGE..=MAX_AGE).contains(&self.age)
            }
            WizardStep::Theme => true,
            WizardStep::Interests => !self.interests.is_empty(),
            WizardStep::Friends => !self.best_friend.trim().is_empty(),
            WizardStep::FavoritePlace => !self.favorite_place.trim().is_empty(),
        }
    }

    /// Move to the next screen if the current one is complete.
    pub fn advance(&mut self) -> bool {
        if !self.can_proceed() {
            return false;
        }
        match self.step.next() {
            Some(next) => {
                self.step = next;
                true
            }
            None => false,
        }
    }

    pub fn back(&mut self) -> bool {
        match self.step.previous() {
            Some(previous) => {
                self.step = previous;
                true
            }
            None => false,
        }
    }

    pub fn is_last_step(&self) -> bool {
        self.step.next().is_none()
    }

    /// Build the immutable profile from the collected answers.
    pub fn finish(&self) -> Result<ChildProfile, ProfileError> {
        let profile = ChildProfile {
            name: self.name.trim().to_string(),
            age: self.age,
            theme: self.theme,
            interests: self.interests.clone(),
            best_friend: self.best_friend.trim().to_string(),
            fears: self.fears.trim().to_string(),
            favorite_place: self.favorite_place.trim().to_string(),
            photos: self.photos.iter().map(|p| p.photo().clone()).collect(),
        };
        profile.validate()?;
        Ok(profile)
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("illustration error: {0}")]
    Illustration(#[from] IllustrationError),
    #[error("generation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// How the onboarding-completion flow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Every page was illustrated and the preview screen dispatched.
    Completed,
    /// The token was cancelled at a suspension point.
    Cancelled,
}

/// Run the onboarding-completion sequence against `store`.
///
/// Assembles the story, fine-tunes once, then illustrates pages one at
/// a time, dispatching each result before the next request. Only after
/// the last page does it move the session to the preview screen. When
/// `token` is cancelled the flow stops at the next await and dispatches
/// nothing further.
pub async fn run_generation(
    store: SessionStore,
    assembler: Arc<StoryAssembler>,
    service: Arc<dyn IllustrationService>,
    profile: ChildProfile,
    token: CancellationToken,
) -> Result<FlowOutcome, FlowError> {
    store.dispatch(SessionEvent::SetProfile(profile.clone()));
    store.dispatch(SessionEvent::SetStep(Step::Generating));

    let story = assembler.assemble(&profile)?;
    let pages = story.pages.clone();
    let request = FineTuneRequest {
        child_id: story.id.clone(),
        photo_urls: profile.photo_urls(),
    };
    let story_id = story.id.clone();
    store.dispatch(SessionEvent::SetStory(story));

    let handle = tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::info!(%story_id, "generation cancelled during fine-tune");
            return Ok(FlowOutcome::Cancelled);
        }
        handle = submit_fine_tune(service.as_ref(), &request) => handle.map_err(|e| {
            tracing::warn!(%story_id, error = %e, "fine-tune failed");
            e
        })?,
    };

    let dispatcher = store.clone();
    let delivery = request_illustrations(service.as_ref(), &pages, &handle, |page_id, url| {
        dispatcher.dispatch(SessionEvent::UpdatePageIllustration {
            page_id,
            url: url.to_string(),
        });
    });
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::info!(%story_id, "generation cancelled during illustration");
            return Ok(FlowOutcome::Cancelled);
        }
        delivered = delivery => delivered.map_err(|e| {
            tracing::warn!(%story_id, error = %e, "illustration failed");
            e
        })?,
    }

    store.dispatch(SessionEvent::SetStep(Step::Preview));
    tracing::info!(%story_id, "story ready for preview");
    Ok(FlowOutcome::Completed)
}

/// Background run of [`run_generation`]. Dropping the task cancels it.
#[derive(Debug)]
pub struct GenerationTask {
    token: CancellationToken,
    guard: DropGuard,
    handle: JoinHandle<Result<FlowOutcome, FlowError>>,
}

impl GenerationTask {
    pub fn spawn(
        store: SessionStore,
        assembler: Arc<StoryAssembler>,
        service: Arc<dyn IllustrationService>,
        profile: ChildProfile,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_generation(
            store,
            assembler,
            service,
            profile,
            token.child_token(),
        ));
        Self {
            guard: token.clone().drop_guard(),
            token,
            handle,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the flow to end without cancelling it.
    pub async fn join(self) -> Result<FlowOutcome, FlowError> {
        let Self { guard, handle, .. } = self;
        let _token = guard.disarm();
        handle.await?
    }
}

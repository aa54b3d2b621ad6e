//! Async flow tests: onboarding completion, cancellation and checkout,
//! driven through fake collaborators.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storybook_engine::core::assembler::StoryAssembler;
use storybook_engine::core::checkout::{submit_order, CheckoutError, OrderField, OrderForm};
use storybook_engine::core::illustration::{
    FineTuneRequest, FineTuneResponse, FineTuneStatus, IllustrationError, IllustrationRequest,
    IllustrationResponse, IllustrationService, ReferenceHandle, StubIllustrationService,
};
use storybook_engine::core::onboarding::{FlowError, FlowOutcome, GenerationTask};
use storybook_engine::core::orders::{OrderError, OrderService, StubOrderService};
use storybook_engine::core::session::{SessionEvent, SessionStore, Step};
use storybook_engine::schema::order::{DeliveryFormat, OrderDetails};
use storybook_engine::schema::profile::{ChildProfile, PhotoHandle, Theme};
use storybook_engine::schema::story::StoryStatus;

fn profile() -> ChildProfile {
    ChildProfile {
        name: "Mia".to_string(),
        age: 6,
        theme: Theme::Ocean,
        interests: vec!["drawing".to_string()],
        best_friend: "Zoe".to_string(),
        fears: String::new(),
        favorite_place: "the beach house".to_string(),
        photos: vec![
            PhotoHandle("upload://1".to_string()),
            PhotoHandle("upload://2".to_string()),
        ],
    }
}

fn assembler() -> Arc<StoryAssembler> {
    Arc::new(StoryAssembler::builtin().unwrap())
}

fn ready(handle: &str) -> FineTuneResponse {
    FineTuneResponse {
        reference_handle: ReferenceHandle(handle.to_string()),
        status: FineTuneStatus::Ready,
    }
}

/// Answers later pages faster than earlier ones and records, for each
/// request, its prompt and how many pages the session already showed.
struct ReversedTiming {
    store: SessionStore,
    calls: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl IllustrationService for ReversedTiming {
    async fn submit_fine_tune(
        &self,
        _request: &FineTuneRequest,
    ) -> Result<FineTuneResponse, IllustrationError> {
        Ok(ready("fake://handle"))
    }

    async fn generate(
        &self,
        request: &IllustrationRequest,
    ) -> Result<IllustrationResponse, IllustrationError> {
        let shown = self
            .store
            .snapshot()
            .story
            .map(|s| s.illustrated_count())
            .unwrap_or_default();
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((request.prompt.clone(), shown));
            calls.len() as u64
        };
        tokio::time::sleep(Duration::from_millis((9 - call) * 20)).await;
        Ok(IllustrationResponse {
            image_url: format!("https://img.test/{call}.png"),
            seed: call,
        })
    }
}

/// Fine-tunes instantly, then never finishes a page.
#[derive(Default)]
struct Hanging {
    started: AtomicUsize,
    dropped: Arc<AtomicBool>,
}

struct FlagOnDrop(Arc<AtomicBool>);

impl Drop for FlagOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IllustrationService for Hanging {
    async fn submit_fine_tune(
        &self,
        _request: &FineTuneRequest,
    ) -> Result<FineTuneResponse, IllustrationError> {
        Ok(ready("fake://handle"))
    }

    async fn generate(
        &self,
        _request: &IllustrationRequest,
    ) -> Result<IllustrationResponse, IllustrationError> {
        let _flag = FlagOnDrop(self.dropped.clone());
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

struct StillTraining;

#[async_trait]
impl IllustrationService for StillTraining {
    async fn submit_fine_tune(
        &self,
        _request: &FineTuneRequest,
    ) -> Result<FineTuneResponse, IllustrationError> {
        Ok(FineTuneResponse {
            reference_handle: ReferenceHandle("fake://pending".to_string()),
            status: FineTuneStatus::Training,
        })
    }

    async fn generate(
        &self,
        _request: &IllustrationRequest,
    ) -> Result<IllustrationResponse, IllustrationError> {
        panic!("generate called before fine-tune was ready");
    }
}

#[derive(Default)]
struct CountingOrders {
    calls: AtomicUsize,
}

#[async_trait]
impl OrderService for CountingOrders {
    async fn submit_order(
        &self,
        _order: &OrderDetails,
        _story_id: &str,
    ) -> Result<String, OrderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("ORDER-1".to_string())
    }
}

/// Print backend that rejects every order.
struct Rejecting;

#[async_trait]
impl OrderService for Rejecting {
    async fn submit_order(
        &self,
        _order: &OrderDetails,
        _story_id: &str,
    ) -> Result<String, OrderError> {
        Err(OrderError::Status(502))
    }
}

#[tokio::test]
async fn stub_flow_reaches_preview() {
    let store = SessionStore::new();
    let task = GenerationTask::spawn(
        store.clone(),
        assembler(),
        Arc::new(StubIllustrationService::new()),
        profile(),
    );
    assert_eq!(task.join().await.unwrap(), FlowOutcome::Completed);

    let state = store.snapshot();
    assert_eq!(state.step, Step::Preview);
    assert_eq!(state.profile, Some(profile()));
    assert_eq!(state.generation_progress, 100);
    let story = state.story.unwrap();
    assert_eq!(story.status, StoryStatus::Ready);
    assert!(story.pages.iter().all(|p| p.illustration_url.is_some()));
}

#[tokio::test(start_paused = true)]
async fn pages_are_requested_in_narrative_order() {
    let store = SessionStore::new();
    let service = Arc::new(ReversedTiming {
        store: store.clone(),
        calls: Mutex::new(Vec::new()),
    });
    let task = GenerationTask::spawn(store.clone(), assembler(), service.clone(), profile());
    assert_eq!(task.join().await.unwrap(), FlowOutcome::Completed);

    let story = store.snapshot().story.unwrap();
    let calls = service.calls.lock().unwrap().clone();
    let prompts: Vec<String> = calls.iter().map(|(p, _)| p.clone()).collect();
    let expected: Vec<String> = story
        .pages
        .iter()
        .map(|p| p.illustration_prompt.clone())
        .collect();
    assert_eq!(prompts, expected);

    // Each page was on screen before the next one was asked for.
    let shown: Vec<usize> = calls.iter().map(|(_, n)| *n).collect();
    assert_eq!(shown, (0..8).collect::<Vec<usize>>());

    for (index, page) in story.pages.iter().enumerate() {
        assert_eq!(
            page.illustration_url.as_deref(),
            Some(format!("https://img.test/{}.png", index + 1).as_str())
        );
    }
}

#[tokio::test]
async fn cancel_stops_without_more_events() {
    let store = SessionStore::new();
    let service = Arc::new(Hanging::default());
    let task = GenerationTask::spawn(store.clone(), assembler(), service.clone(), profile());

    let mut rx = store.subscribe();
    rx.wait_for(|s| s.story.is_some()).await.unwrap();
    while service.started.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    task.cancel();
    assert_eq!(task.join().await.unwrap(), FlowOutcome::Cancelled);
    assert!(service.dropped.load(Ordering::SeqCst));

    let state = store.snapshot();
    assert_eq!(state.step, Step::Generating);
    assert_eq!(state.generation_progress, 0);
    assert_eq!(state.story.unwrap().status, StoryStatus::Generating);
}

#[tokio::test]
async fn dropping_the_task_cancels_it() {
    let store = SessionStore::new();
    let service = Arc::new(Hanging::default());
    let task = GenerationTask::spawn(store.clone(), assembler(), service.clone(), profile());
    while service.started.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    drop(task);
    for _ in 0..100 {
        if service.dropped.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(service.dropped.load(Ordering::SeqCst));
    assert_eq!(store.step(), Step::Generating);
}

#[tokio::test]
async fn unready_fine_tune_aborts_flow() {
    let store = SessionStore::new();
    let task = GenerationTask::spawn(store.clone(), assembler(), Arc::new(StillTraining), profile());
    let err = task.join().await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Illustration(IllustrationError::NotReady(FineTuneStatus::Training))
    ));
    assert_eq!(store.step(), Step::Generating);
}

fn store_with_story() -> SessionStore {
    let store = SessionStore::new();
    let story = assembler().assemble(&profile()).unwrap();
    store.dispatch(SessionEvent::SetStory(story));
    store.dispatch(SessionEvent::SetStep(Step::Order));
    store
}

#[tokio::test]
async fn invalid_email_blocks_digital_order() {
    let store = store_with_story();
    let mut form = OrderForm::new();
    form.format = DeliveryFormat::Digital;
    form.email = "not-an-email".to_string();

    let err = submit_order(&store, &StubOrderService::new(), &form)
        .await
        .unwrap_err();
    let CheckoutError::Invalid(errors) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(errors.get(OrderField::Email), Some("Valid email required"));
    assert_eq!(errors.fields(), vec![OrderField::Email]);

    let state = store.snapshot();
    assert!(state.order.is_none());
    assert_eq!(state.step, Step::Order);
    assert_eq!(state.story.unwrap().status, StoryStatus::Generating);
}

#[tokio::test]
async fn print_order_needs_city() {
    let store = store_with_story();
    let mut form = OrderForm::new();
    form.email = "parent@example.com".to_string();
    form.address.line1 = "1 Main St".to_string();
    form.address.zip = "62701".to_string();

    let err = submit_order(&store, &StubOrderService::new(), &form)
        .await
        .unwrap_err();
    let CheckoutError::Invalid(errors) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(errors.get(OrderField::City), Some("City required"));
    assert!(store.snapshot().order.is_none());
}

#[tokio::test]
async fn print_order_is_confirmed() {
    let store = store_with_story();
    let story_id = store.snapshot().story.unwrap().id;
    let mut form = OrderForm::new();
    form.email = "parent@example.com".to_string();
    form.address.line1 = "1 Main St".to_string();
    form.address.city = "Springfield".to_string();
    form.address.zip = "62701".to_string();

    let confirmation = submit_order(&store, &StubOrderService::new(), &form)
        .await
        .unwrap();
    assert_eq!(
        confirmation.order_id,
        Some(StubOrderService::confirmation_id(&story_id))
    );

    let state = store.snapshot();
    assert_eq!(state.step, Step::Confirmation);
    assert_eq!(state.order, Some(confirmation.order));
    assert_eq!(state.story.unwrap().status, StoryStatus::Ordered);
}

#[tokio::test]
async fn failed_print_order_leaves_session_unordered() {
    let store = store_with_story();
    let mut form = OrderForm::new();
    form.email = "parent@example.com".to_string();
    form.address.line1 = "1 Main St".to_string();
    form.address.city = "Springfield".to_string();
    form.address.zip = "62701".to_string();

    let err = submit_order(&store, &Rejecting, &form).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Order(OrderError::Status(502))));

    let state = store.snapshot();
    assert!(state.order.is_none());
    assert_eq!(state.step, Step::Order);
    assert_eq!(state.story.unwrap().status, StoryStatus::Generating);
}

#[tokio::test]
async fn digital_order_skips_print_backend() {
    let store = store_with_story();
    let orders = CountingOrders::default();
    let mut form = OrderForm::new();
    form.format = DeliveryFormat::Digital;
    form.email = "parent@example.com".to_string();

    let confirmation = submit_order(&store, &orders, &form).await.unwrap();
    assert!(confirmation.order_id.is_none());
    assert!(confirmation.order.shipping.is_none());
    assert_eq!(orders.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.step(), Step::Confirmation);
}

#[tokio::test]
async fn order_without_story_is_rejected() {
    let store = SessionStore::new();
    let mut form = OrderForm::new();
    form.format = DeliveryFormat::Digital;
    form.email = "parent@example.com".to_string();
    let err = submit_order(&store, &StubOrderService::new(), &form)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::NoStory));
    assert!(store.snapshot().order.is_none());
}

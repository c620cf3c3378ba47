//! End-to-end meal plan generation: real router, in-memory store and a local
//! stand-in for the AI workflow reached over HTTP.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, Method, Request, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tower::ServiceExt;
use uuid::Uuid;

use grocerymind::{
    app::build_app,
    auth::JwtKeys,
    config::{AppConfig, JwtConfig, StoreBackend, WebhookConfig},
    meal_plans::{HttpWebhookClient, MealPlanWebhook},
    memory::MemoryStore,
    poller::{HttpListSource, MealPlanPoller, PollOutcome, PollerConfig},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Plans,
    Slow,
    Fail,
    /// Waits for a permit before answering with plans.
    Gated,
}

struct Workflow {
    mode: Mutex<Mode>,
    calls: AtomicUsize,
    gate: Semaphore,
}

impl Workflow {
    fn set(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn workflow_handler(State(wf): State<Arc<Workflow>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    wf.calls.fetch_add(1, Ordering::SeqCst);
    assert!(body["ingredients"].is_array());
    let mode = *wf.mode.lock().unwrap();
    match mode {
        Mode::Fail => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "workflow crashed" })),
            )
        }
        Mode::Slow => tokio::time::sleep(Duration::from_secs(2)).await,
        Mode::Gated => wf.gate.acquire().await.unwrap().forget(),
        Mode::Plans => {}
    }
    (
        StatusCode::OK,
        Json(json!([{
            "success": true,
            "mealPlans": [
                { "name": "Omelette", "description": "Eggs and spinach", "instructions": ["Whisk.", "Fry."] },
                { "description": "Leftover rice, fried", "servings": "3" }
            ]
        }])),
    )
}

struct TestApp {
    router: Router,
    token: String,
    workflow: Arc<Workflow>,
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_app(mode: Mode, webhook_timeout: Duration) -> TestApp {
    let workflow = Arc::new(Workflow {
        mode: Mutex::new(mode),
        calls: AtomicUsize::new(0),
        gate: Semaphore::new(0),
    });
    let workflow_url = serve(
        Router::new()
            .route("/webhook/meal-plans", post(workflow_handler))
            .with_state(workflow.clone()),
    )
    .await;

    let config = AppConfig {
        store: StoreBackend::Memory,
        database_url: None,
        jwt: JwtConfig {
            secret: "integration-secret".into(),
            issuer: "grocerymind".into(),
            audience: "grocerymind-users".into(),
            ttl_minutes: 5,
        },
        webhook: WebhookConfig {
            url: Some(format!("{workflow_url}/webhook/meal-plans")),
            api_key: Some("workflow-key".into()),
            timeout: webhook_timeout,
            client_id: "grocerymind-test".into(),
        },
    };
    let token = JwtKeys::from(&config.jwt).sign(Uuid::new_v4()).unwrap();

    let store = Arc::new(MemoryStore::default());
    let webhook: Arc<dyn MealPlanWebhook> =
        Arc::new(HttpWebhookClient::new(config.webhook.clone()).unwrap());
    let state = AppState::from_parts(Arc::new(config), store.clone(), store, webhook);

    TestApp {
        router: build_app(state),
        token,
        workflow,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let res = self
            .router
            .clone()
            .oneshot(req.body(body).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn catalog_item(&self, name: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/items",
                Some(json!({ "name": name, "price": 2.5, "nutrition": { "calories": 120.0 } })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_list(&self, names: &[&str]) -> Value {
        let mut items = Vec::new();
        for name in names {
            items.push(json!({ "item": self.catalog_item(name).await, "quantity": 2 }));
        }
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/grocery-lists",
                Some(json!({ "name": "weekly shop", "items": items })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    async fn generation(&self, id: &str) -> Value {
        let (status, body) = self
            .send(Method::GET, &format!("/api/v1/grocery-lists/{id}/generation"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    /// Waits until no attempt is running and returns the final status.
    async fn settle(&self, id: &str) -> Value {
        for _ in 0..300 {
            let status = self.generation(id).await;
            if status["state"] != "running" {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("generation for {id} never settled");
    }

    async fn wait_for_calls(&self, n: usize) {
        for _ in 0..300 {
            if self.workflow.calls() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("workflow never reached {n} calls");
    }

    async fn trigger(&self, id: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            &format!("/api/v1/grocery-lists/{id}/generate-meal-plan"),
            None,
        )
        .await
    }
}

#[tokio::test]
async fn create_returns_before_plans_then_plans_arrive_once() {
    let app = spawn_app(Mode::Plans, Duration::from_secs(5)).await;

    let created = app.create_list(&["eggs", "spinach", "rice"]).await;
    let id = created["id"].as_str().unwrap().to_string();

    assert_eq!(created["mealPlans"], json!([]));
    assert_eq!(created["totalItems"], 6);

    let status = app.settle(&id).await;
    assert_eq!(status["state"], "succeeded");

    let (_, list) = app
        .send(Method::GET, &format!("/api/v1/grocery-lists/{id}"), None)
        .await;
    let plans = list["mealPlans"].as_array().unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0]["name"], "Omelette");
    assert_eq!(plans[0]["instructions"], "Whisk. Fry.");
    assert_eq!(plans[1]["name"], "Meal 2");
    assert_eq!(plans[1]["servings"], 3);
    assert_eq!(plans[1]["prepTime"], "Not specified");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.workflow.calls(), 1);
}

#[tokio::test]
async fn timed_out_attempt_can_be_retried_manually() {
    let app = spawn_app(Mode::Slow, Duration::from_millis(100)).await;
    let created = app.create_list(&["lentils"]).await;
    let id = created["id"].as_str().unwrap().to_string();

    let status = app.settle(&id).await;
    assert_eq!(status["state"], "failed");
    assert_eq!(status["lastError"], "remote_call");
    assert_eq!(status["retryAvailable"], true);

    app.workflow.set(Mode::Plans);
    let (code, receipt) = app.trigger(&id).await;
    assert_eq!(code, StatusCode::ACCEPTED);
    assert_eq!(receipt, json!({ "attempt": 2, "maxAttempts": 3 }));

    assert_eq!(app.settle(&id).await["state"], "succeeded");
    let (_, list) = app
        .send(Method::GET, &format!("/api/v1/grocery-lists/{id}"), None)
        .await;
    assert_eq!(list["mealPlans"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn result_for_list_deleted_mid_flight_is_discarded() {
    let app = spawn_app(Mode::Gated, Duration::from_secs(5)).await;
    let created = app.create_list(&["leeks", "potatoes"]).await;
    let id = created["id"].as_str().unwrap().to_string();
    app.wait_for_calls(1).await;

    let (code, _) = app
        .send(Method::DELETE, &format!("/api/v1/grocery-lists/{id}"), None)
        .await;
    assert_eq!(code, StatusCode::NO_CONTENT);

    app.workflow.gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (code, _) = app
        .send(Method::GET, &format!("/api/v1/grocery-lists/{id}"), None)
        .await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    let (_, lists) = app.send(Method::GET, "/api/v1/grocery-lists", None).await;
    assert_eq!(lists, json!([]));
}

#[tokio::test]
async fn concurrent_trigger_conflicts() {
    let app = spawn_app(Mode::Gated, Duration::from_secs(5)).await;
    let created = app.create_list(&["beef"]).await;
    let id = created["id"].as_str().unwrap().to_string();
    app.wait_for_calls(1).await;

    let (code, _) = app.trigger(&id).await;
    assert_eq!(code, StatusCode::CONFLICT);

    app.workflow.gate.add_permits(1);
    assert_eq!(app.settle(&id).await["state"], "succeeded");
    assert_eq!(app.workflow.calls(), 1);
}

#[tokio::test]
async fn retries_stop_at_the_cap() {
    let app = spawn_app(Mode::Fail, Duration::from_secs(5)).await;
    let created = app.create_list(&["tofu"]).await;
    let id = created["id"].as_str().unwrap().to_string();
    app.settle(&id).await;

    for attempt in 2..=3 {
        let (code, receipt) = app.trigger(&id).await;
        assert_eq!(code, StatusCode::ACCEPTED);
        assert_eq!(receipt["attempt"], attempt);
        app.settle(&id).await;
    }

    let status = app.generation(&id).await;
    assert_eq!(status["attempts"], 3);
    assert_eq!(status["retryAvailable"], false);

    let (code, _) = app.trigger(&id).await;
    assert_eq!(code, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(app.workflow.calls(), 3);
}

#[tokio::test]
async fn emptied_list_cannot_be_generated() {
    let app = spawn_app(Mode::Plans, Duration::from_secs(5)).await;
    let created = app.create_list(&["apples"]).await;
    let id = created["id"].as_str().unwrap().to_string();
    app.settle(&id).await;

    let (code, patched) = app
        .send(
            Method::PATCH,
            &format!("/api/v1/grocery-lists/{id}"),
            Some(json!({ "items": [] })),
        )
        .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(patched["totalItems"], 0);
    // edits never touch meal plans
    assert_eq!(patched["mealPlans"].as_array().unwrap().len(), 2);

    let (code, _) = app.trigger(&id).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_list_is_not_found() {
    let app = spawn_app(Mode::Plans, Duration::from_secs(5)).await;
    let (code, _) = app.trigger(&Uuid::new_v4().to_string()).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

fn fast_poller() -> PollerConfig {
    PollerConfig {
        poll_interval: Duration::from_millis(20),
        progress_tick: Duration::from_millis(5),
        timeout: Duration::from_millis(400),
        ..PollerConfig::default()
    }
}

#[tokio::test]
async fn poller_observes_plans_over_http() {
    let app = spawn_app(Mode::Plans, Duration::from_secs(5)).await;
    let base = serve(app.router.clone()).await;
    let created = app.create_list(&["chickpeas", "tomatoes"]).await;
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    let source = HttpListSource::new(base, app.token.clone()).unwrap();
    let poller = MealPlanPoller::new(source, id, fast_poller());

    match poller.watch().await.unwrap() {
        PollOutcome::Ready(plans) => assert_eq!(plans[0].name, "Omelette"),
        PollOutcome::TimedOut => panic!("plans never observed"),
    }
    assert_eq!(poller.attempt().progress, 100);
}

#[tokio::test]
async fn poller_retry_goes_through_the_server() {
    let app = spawn_app(Mode::Fail, Duration::from_secs(5)).await;
    let base = serve(app.router.clone()).await;
    let created = app.create_list(&["oats"]).await;
    let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

    let source = HttpListSource::new(base, app.token.clone()).unwrap();
    let poller = MealPlanPoller::new(source, id, fast_poller());

    assert_eq!(poller.watch().await.unwrap(), PollOutcome::TimedOut);
    app.workflow.set(Mode::Plans);

    let outcome = poller.retry().await.unwrap();

    assert!(matches!(outcome, PollOutcome::Ready(ref plans) if plans.len() == 2));
    assert_eq!(poller.attempt().retry_count, 1);
    assert_eq!(app.workflow.calls(), 2);
}

#[tokio::test]
async fn poller_retry_ignores_plans_from_the_previous_generation() {
    let app = spawn_app(Mode::Plans, Duration::from_secs(5)).await;
    let base = serve(app.router.clone()).await;
    let created = app.create_list(&["peppers", "onions"]).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(app.settle(&id).await["state"], "succeeded");

    app.workflow.set(Mode::Gated);
    let workflow = app.workflow.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        workflow.gate.add_permits(1);
    });

    let source = HttpListSource::new(base, app.token.clone()).unwrap();
    let poller = MealPlanPoller::new(source, id.parse().unwrap(), fast_poller());
    let started = std::time::Instant::now();

    let outcome = poller.retry().await.unwrap();

    assert!(matches!(outcome, PollOutcome::Ready(_)));
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(app.workflow.calls(), 2);
}

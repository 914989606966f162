use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use ward_engine::{SharedWardEngine, WardEngine};
use ward_notifications::{
    EventDispatcher, InMemoryNotificationQueue, NotificationProcessor, TemplateRenderer,
};
use ward_storage::DynWardStore;

use crate::config::AppConfig;
use crate::handlers::{admissions, beds, emergencies, handovers, orders, supplies, system};
use crate::middleware as app_middleware;
use crate::state::AppState;
use crate::sweeper::Sweeper;

fn api_routes() -> Router<AppState> {
    Router::new()
        // Beds and occupancy
        .route("/beds", get(beds::list_beds).post(beds::create_bed))
        .route("/beds/{id}", get(beds::get_bed))
        .route("/beds/{id}/status", post(beds::set_bed_status))
        .route("/occupancy/invariant", get(beds::check_invariant))
        // Admissions
        .route(
            "/admissions",
            get(admissions::list_admissions).post(admissions::admit),
        )
        .route("/admissions/{id}", get(admissions::get_admission))
        .route("/admissions/{id}/status", post(admissions::update_status))
        .route("/admissions/{id}/transfer", post(admissions::transfer))
        .route("/admissions/{id}/discharge", post(admissions::discharge))
        .route("/admissions/{id}/death", post(admissions::record_death))
        .route(
            "/admissions/{id}/orders",
            get(admissions::orders_for_admission),
        )
        .route("/admissions/{id}/due", get(admissions::due_list))
        // Orders and medication
        .route("/orders", post(orders::create_order))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/hold", post(orders::hold_order))
        .route("/orders/{id}/resume", post(orders::resume_order))
        .route("/orders/{id}/complete", post(orders::complete_order))
        .route("/orders/{id}/cancel", post(orders::cancel_order))
        .route(
            "/orders/{id}/schedules",
            get(orders::schedules_for_order).post(orders::schedule_medication),
        )
        .route("/schedules/{id}", get(orders::get_schedule))
        .route("/schedules/{id}/cancel", post(orders::cancel_schedule))
        .route(
            "/schedules/{id}/administrations",
            get(orders::administrations_for_schedule),
        )
        .route("/administrations/{id}", get(orders::get_administration))
        .route(
            "/administrations/{id}/administer",
            post(orders::administer),
        )
        .route("/administrations/{id}/skip", post(orders::skip))
        // Emergencies
        .route(
            "/emergencies",
            get(emergencies::list_open).post(emergencies::raise),
        )
        .route("/emergencies/{id}", get(emergencies::get_emergency))
        .route(
            "/emergencies/{id}/acknowledge",
            post(emergencies::acknowledge),
        )
        .route("/emergencies/{id}/escalate", post(emergencies::escalate))
        .route("/emergencies/{id}/respond", post(emergencies::respond))
        .route("/emergencies/{id}/resolve", post(emergencies::resolve))
        // Supplies
        .route("/supplies", post(supplies::request))
        .route("/supplies/{id}", get(supplies::get_request))
        .route("/supplies/{id}/fulfill", post(supplies::fulfill))
        .route("/supplies/{id}/cancel", post(supplies::cancel))
        // Handovers
        .route("/handovers", post(handovers::create))
        .route("/handovers/{id}", get(handovers::get_handover))
        .route("/handovers/{id}/corrections", post(handovers::correct))
        .route("/handovers/{id}/acknowledge", post(handovers::acknowledge))
        .route("/handovers/{id}/review", post(handovers::review))
        // Per-ward views
        .route("/wards/{ward}/occupancy", get(beds::occupancy_summary))
        .route("/wards/{ward}/emergencies", get(emergencies::for_ward))
        .route("/wards/{ward}/supplies", get(supplies::for_ward))
        .route("/wards/{ward}/handovers", get(handovers::for_ward))
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let timeout = state.config.request_timeout();
    Router::new()
        .route("/healthz", get(system::healthz))
        .route("/changes", get(system::changes))
        .route("/changes/watermark", get(system::watermark))
        .nest("/api", api_routes())
        .with_state(state)
        // Middleware stack (order: timeout -> request id -> cors/trace -> body limit)
        .layer(middleware::from_fn_with_state(
            timeout,
            app_middleware::request_timeout,
        ))
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = tracing::field::Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<DynWardStore>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use `store` instead of a fresh in-memory store.
    pub fn with_store(mut self, store: DynWardStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> WardServer {
        let store = self.store.unwrap_or_else(ward_db_memory::create_store);
        let engine: SharedWardEngine =
            Arc::new(WardEngine::new(store, self.config.engine.clone()));
        let state = AppState::new(engine.clone(), self.config);
        let app = build_app(state.clone());

        WardServer {
            addr: self.addr,
            app,
            state,
        }
    }
}

pub struct WardServer {
    addr: SocketAddr,
    app: Router,
    state: AppState,
}

impl WardServer {
    pub fn engine(&self) -> &SharedWardEngine {
        &self.state.engine
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Serve until Ctrl+C, then stop the background tasks.
    pub async fn run(self) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = spawn_background(&self.state, shutdown_rx);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        let _ = shutdown_tx.send(true);
        for task in tasks.drain(..) {
            if let Err(e) = task.await
                && !e.is_cancelled()
            {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }
        served?;
        Ok(())
    }
}

/// Start the sweeper and, when enabled, notification delivery.
///
/// Each task watches `shutdown`; the event dispatcher has no natural end
/// while the engine lives, so it is aborted from the same signal.
fn spawn_background(state: &AppState, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();
    let engine = state.engine.clone();
    let config = &state.config;

    if config.sweep.enabled {
        let sweeper = Sweeper::new(engine.clone(), config.sweep.interval());
        let rx = shutdown.clone();
        tasks.push(tokio::spawn(async move { sweeper.run(rx).await }));
    }

    let notifications = &config.notifications;
    if notifications.enabled {
        let queue = Arc::new(InMemoryNotificationQueue::new());
        let templates = Arc::new(TemplateRenderer::with_ward_defaults());
        let clock = engine.clock().clone();

        let dispatcher =
            EventDispatcher::new(queue.clone(), notifications.channels.clone(), clock.clone());
        let events = engine.subscribe();
        let mut rx = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = dispatcher.run(events) => {}
                _ = rx.changed() => {}
            }
        }));

        let processor =
            NotificationProcessor::from_config(queue, templates, clock, notifications);
        let (poll, batch) = (notifications.poll_interval(), notifications.batch_size);
        let rx = shutdown.clone();
        tasks.push(tokio::spawn(async move { processor.run(poll, batch, rx).await }));
    }

    tasks
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

//! HTTP API server with SSE change feed

use super::{
    calls::CallRegistry,
    error::{ApiError, ApiResult},
    pages,
};
use crate::agent::{AskOutcome, CallSession};
use crate::config::AgentSettings;
use crate::desk::HelpDesk;
use crate::events::{ChangeFilter, ChangeKind, Table};
use crate::notice::Notice;
use crate::supervisor::{KnowledgeBaseView, PendingRequestsView, RequestHistoryView};
use crate::types::{
    CallId, HelpRequest, KnowledgeBaseEntry, RequestId, RequestStatus, RequestWithResponse,
    Resolution,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive},
        Sse,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, net::SocketAddr};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt as _,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Simulated agent settings for new calls
    pub agent: AgentSettings,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 3000).into(),
            agent: AgentSettings::default(),
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    desk: HelpDesk,
    calls: CallRegistry,
    agent: AgentSettings,
    instance_id: String,
}

impl AppState {
    pub fn new(desk: HelpDesk, agent: AgentSettings) -> Self {
        Self {
            desk,
            calls: CallRegistry::new(),
            agent,
            instance_id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
        }
    }

    pub fn calls(&self) -> &CallRegistry {
        &self.calls
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

/// Build the full router: pages, JSON API, change feed, 404 fallback
pub fn router(state: AppState) -> Router {
    Router::new()
        // Pages
        .route("/", get(pages::simulator_page))
        .route("/supervisor", get(pages::supervisor_page))
        // Caller simulator
        .route("/api/calls", post(start_call_handler))
        .route(
            "/api/calls/:id",
            get(get_call_handler).delete(end_call_handler),
        )
        .route("/api/calls/:id/questions", post(ask_handler))
        // Supervisor
        .route("/api/requests/pending", get(pending_handler))
        .route("/api/requests/history", get(history_handler))
        .route("/api/requests/:id", get(request_handler))
        .route("/api/requests/:id/answer", post(answer_handler))
        .route("/api/knowledge", get(knowledge_handler))
        // Change feed
        .route("/api/events", get(events_handler))
        // Health check
        .route("/health", get(health_handler))
        .fallback(pages::not_found)
        .with_state(state)
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, desk: HelpDesk) -> Self {
        let state = AppState::new(desk, config.agent.clone());
        Self { config, state }
    }

    pub fn instance_id(&self) -> &str {
        self.state.instance_id()
    }

    /// Start serving with dynamic port allocation
    ///
    /// Tries the configured address first, then up to ten following ports.
    pub async fn serve(self) -> anyhow::Result<()> {
        let instance_id = self.state.instance_id.clone();
        let router = router(self.state);

        match tokio::net::TcpListener::bind(self.config.addr).await {
            Ok(listener) => return run(listener, router, &instance_id).await,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                debug!(
                    "Port {} in use, trying alternative ports...",
                    self.config.addr.port()
                );
            }
            Err(e) => return Err(e.into()),
        }

        let base_port = self.config.addr.port();
        for offset in 1..=10 {
            let alt_addr = SocketAddr::new(self.config.addr.ip(), base_port + offset);

            match tokio::net::TcpListener::bind(alt_addr).await {
                Ok(listener) => return run(listener, router, &instance_id).await,
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(anyhow::anyhow!(
            "All ports ({}-{}) are in use. Server unavailable for instance {}.",
            base_port,
            base_port + 10,
            instance_id
        ))
    }
}

async fn run(listener: tokio::net::TcpListener, router: Router, instance_id: &str) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("Server [{}] listening on http://{}", instance_id, addr);
    info!("Caller simulator: http://{}/", addr);
    info!("Supervisor dashboard: http://{}/supervisor", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server [{}] stopped", instance_id);
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

fn parse_call_id(raw: &str) -> ApiResult<CallId> {
    CallId::from_string(raw).map_err(|e| ApiError::BadRequest(format!("Invalid call id: {}", e)))
}

fn parse_request_id(raw: &str) -> ApiResult<RequestId> {
    RequestId::from_string(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request id: {}", e)))
}

#[derive(Debug, Serialize)]
struct CallResponse {
    call: CallSession,
    notice: Notice,
}

async fn start_call_handler(State(state): State<AppState>) -> (StatusCode, Json<CallResponse>) {
    let call = state
        .calls
        .start(&state.agent.business_name, state.agent.reply_delay())
        .await;

    (
        StatusCode::CREATED,
        Json(CallResponse {
            call,
            notice: Notice::call_started(),
        }),
    )
}

async fn get_call_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CallSession>> {
    let id = parse_call_id(&id)?;
    let call = state
        .calls
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No active call {}", id)))?;

    let session = call.lock().await.clone();
    Ok(Json(session))
}

#[derive(Debug, Serialize)]
struct EndCallResponse {
    notice: Notice,
}

async fn end_call_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<EndCallResponse>> {
    let id = parse_call_id(&id)?;
    if !state.calls.end(id).await {
        return Err(ApiError::NotFound(format!("No active call {}", id)));
    }

    Ok(Json(EndCallResponse {
        notice: Notice::call_ended(),
    }))
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    result: AskOutcome,
    call: CallSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<Notice>,
}

async fn ask_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> ApiResult<Json<AskResponse>> {
    let id = parse_call_id(&id)?;
    let call = state
        .calls
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No active call {}", id)))?;

    let mut session = call.lock().await;
    let result = session
        .ask_question(&state.desk, &req.question)
        .await
        .map_err(|e| ApiError::failed(e, "Failed to create help request"))?;

    Ok(Json(AskResponse {
        notice: result.notice(),
        result,
        call: session.clone(),
    }))
}

#[derive(Debug, Serialize)]
struct PendingResponse {
    count: usize,
    requests: Vec<HelpRequest>,
}

async fn pending_handler(State(state): State<AppState>) -> ApiResult<Json<PendingResponse>> {
    let mut view = PendingRequestsView::new(state.desk.clone());
    view.refresh()
        .await
        .map_err(|e| ApiError::failed(e, "Failed to fetch pending requests"))?;

    Ok(Json(PendingResponse {
        count: view.count(),
        requests: view.requests().to_vec(),
    }))
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    count: usize,
    resolved: usize,
    requests: Vec<RequestWithResponse>,
}

async fn history_handler(State(state): State<AppState>) -> ApiResult<Json<HistoryResponse>> {
    let mut view = RequestHistoryView::new(state.desk.clone());
    view.refresh()
        .await
        .map_err(|e| ApiError::failed(e, "Failed to fetch request history"))?;

    Ok(Json(HistoryResponse {
        count: view.count(),
        resolved: view.resolved_count(),
        requests: view.rows().to_vec(),
    }))
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    answer: String,
}

async fn request_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<HelpRequest>> {
    let id = parse_request_id(&id)?;
    let request = state
        .desk
        .get_request(id)
        .await
        .map_err(|e| ApiError::failed(e, "Failed to fetch help request"))?;
    Ok(Json(request))
}

#[derive(Debug, Serialize)]
struct AnswerResponse {
    resolution: Resolution,
    notice: Notice,
}

async fn answer_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let id = parse_request_id(&id)?;
    let mut view = PendingRequestsView::new(state.desk.clone());
    view.refresh()
        .await
        .map_err(|e| ApiError::failed(e, "Failed to fetch pending requests"))?;
    let resolution = view
        .submit_answer(id, &req.answer)
        .await
        .map_err(|e| ApiError::failed(e, "Failed to submit answer"))?;

    Ok(Json(AnswerResponse {
        resolution,
        notice: Notice::answer_submitted(),
    }))
}

#[derive(Debug, Deserialize)]
struct KnowledgeQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
struct EmptyState {
    title: &'static str,
    hint: &'static str,
}

#[derive(Debug, Serialize)]
struct KnowledgeResponse {
    total: usize,
    entries: Vec<KnowledgeBaseEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    empty: Option<EmptyState>,
}

async fn knowledge_handler(
    State(state): State<AppState>,
    Query(query): Query<KnowledgeQuery>,
) -> ApiResult<Json<KnowledgeResponse>> {
    let mut view = KnowledgeBaseView::new(state.desk.clone());
    view.refresh()
        .await
        .map_err(|e| ApiError::failed(e, "Failed to fetch knowledge base"))?;
    view.set_search(query.q.trim());

    let entries: Vec<KnowledgeBaseEntry> = view.filtered().into_iter().cloned().collect();
    let empty = entries.is_empty().then(|| {
        let (title, hint) = view.empty_message();
        EmptyState { title, hint }
    });

    Ok(Json(KnowledgeResponse {
        total: view.count(),
        entries,
        empty,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct EventsQuery {
    table: Option<String>,
    event: Option<String>,
    status: Option<String>,
}

impl EventsQuery {
    /// `None` means every change on every table
    fn filter(&self) -> ApiResult<Option<ChangeFilter>> {
        let Some(table) = &self.table else {
            if self.event.is_some() || self.status.is_some() {
                return Err(ApiError::BadRequest(
                    "event and status filters require a table".to_string(),
                ));
            }
            return Ok(None);
        };

        let table: Table = table.parse().map_err(ApiError::BadRequest)?;
        let mut filter = ChangeFilter::table(table);

        if let Some(event) = self.event.as_deref().filter(|e| *e != "*") {
            let kind: ChangeKind = event.parse().map_err(ApiError::BadRequest)?;
            filter = filter.with_kind(kind);
        }

        if let Some(status) = &self.status {
            let status: RequestStatus = status.parse().map_err(ApiError::BadRequest)?;
            filter = filter.with_status(status);
        }

        Ok(Some(filter))
    }
}

/// SSE change feed
///
/// Change frames are unnamed so `EventSource.onmessage` sees them; the
/// change kind travels in the JSON payload. Lagged receivers get a named
/// `resync` event carrying the number of missed changes.
async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>>> {
    let filter = query.filter()?;
    debug!("New SSE client connected with filter {:?}", filter);

    let rx = state.desk.events().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) => {
            if let Some(filter) = &filter {
                if !filter.matches(&event) {
                    return None;
                }
            }
            let data = serde_json::to_string(&event).ok()?;
            Some(Ok(SseEvent::default().data(data).id(event.id)))
        }
        Err(BroadcastStreamRecvError::Lagged(missed)) => Some(Ok(SseEvent::default()
            .event("resync")
            .data(serde_json::json!({ "missed": missed }).to_string()))),
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance_id: String,
    pub subscribers: usize,
    pub open_calls: usize,
    /// Absent when the store is unreachable
    pub pending_requests: Option<usize>,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let pending_requests = match state.desk.count_requests(Some(RequestStatus::Pending)).await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Health check could not count pending requests: {}", e);
            None
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
        subscribers: state.desk.events().subscriber_count(),
        open_calls: state.calls.count().await,
        pending_requests,
    })
}

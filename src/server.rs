use crate::auth::{bearer_token, AuthService};
use crate::content::{ContentService, Upload};
use crate::domain::User;
use crate::error::{ConsoleError, Result};
use crate::graphql::{create_schema, GraphQLContext, GraphQLSchema, RequestLanguage, Viewer};
use crate::jobs::{Job, JobQueue};
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{
        header::{ACCEPT_LANGUAGE, AUTHORIZATION},
        HeaderMap, Method, StatusCode,
    },
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use hyper::Server;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub schema: GraphQLSchema,
    pub content: ContentService,
    pub queue: JobQueue,
    pub auth: AuthService,
    pub require_login: bool,
}

impl AppState {
    pub fn new(
        content: ContentService,
        queue: JobQueue,
        auth: AuthService,
        require_login: bool,
    ) -> Self {
        let schema = create_schema(GraphQLContext {
            content: content.clone(),
            queue: queue.clone(),
            auth: auth.clone(),
            require_login,
        });
        Self {
            schema,
            content,
            queue,
            auth,
            require_login,
        }
    }

    async fn viewer(&self, headers: &HeaderMap) -> Result<Option<User>> {
        let Some(token) = token_from(headers) else {
            return Ok(None);
        };
        self.auth.current_user(token).await
    }

    /// The viewer, or an error when login is required and nobody is logged in.
    async fn require_viewer(&self, headers: &HeaderMap) -> Result<Option<User>> {
        let viewer = self.viewer(headers).await?;
        if self.require_login && viewer.is_none() {
            return Err(ConsoleError::Unauthorized("Authentication required".into()));
        }
        Ok(viewer)
    }
}

fn token_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
}

/// JSON error body with a status derived from the error kind.
pub struct ApiError(ConsoleError);

impl From<ConsoleError> for ApiError {
    fn from(e: ConsoleError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ConsoleError::NotFound { .. } => StatusCode::NOT_FOUND,
            ConsoleError::Validation(_) => StatusCode::BAD_REQUEST,
            ConsoleError::Conflict(_) => StatusCode::CONFLICT,
            ConsoleError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ConsoleError::Forbidden(_) => StatusCode::FORBIDDEN,
            ConsoleError::Http(_) | ConsoleError::Api { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        let body = Json(json!({"error": self.0.to_string(), "code": self.0.code()}));
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "content-console",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GraphQL handler (supports GET and POST)
async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> ApiResult<GraphQLResponse> {
    let user = state.viewer(&headers).await?;
    let accept_language = headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok());
    let language = state.content.negotiate_language(accept_language).await;
    let request = req
        .into_inner()
        .data(Viewer { user })
        .data(RequestLanguage(language));
    Ok(state.schema.execute(request).await.into())
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct UserBody {
    id: i64,
    email: String,
    full_name: String,
    last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserBody {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    expires_at: DateTime<Utc>,
    user: UserBody,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (session, user) = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: user.into(),
    }))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let ended = match token_from(&headers) {
        Some(token) => state.auth.logout(token).await,
        None => false,
    };
    Json(json!({"success": ended}))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<UserBody>> {
    let user = state
        .viewer(&headers)
        .await?
        .ok_or_else(|| ConsoleError::Unauthorized("Not logged in".into()))?;
    Ok(Json(user.into()))
}

async fn bulk_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    state.require_viewer(&headers).await?;
    let enqueued = state.queue.enqueue(Job::BulkGeneration).await?;
    info!("Bulk generation queued as {}", enqueued.id);
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "queued",
            "job_id": enqueued.id,
            "position": enqueued.position,
        })),
    ))
}

async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let job_id = Uuid::parse_str(&id)
        .map_err(|_| ConsoleError::Validation(format!("Invalid job id: {id}")))?;
    let Some(record) = state.queue.get(job_id).await else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Job {id} not found"), "code": "NOT_FOUND"})),
        ));
    };
    let position = state.queue.position(job_id).await;
    let mut body = serde_json::to_value(&record).map_err(ConsoleError::from)?;
    body["position"] = json!(position);
    Ok((StatusCode::OK, Json(body)))
}

async fn upload_media(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    state.require_viewer(&headers).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ConsoleError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ConsoleError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some(Upload {
            original_filename,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| ConsoleError::Validation("No file provided".into()))?;
    let media = state.content.create_media_from_upload(upload).await?;
    let url = state.content.media_public_url(&media);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": media.id,
            "filename": media.filename,
            "mediaType": media.media_type,
            "url": url,
        })),
    ))
}

/// Build the router with every route.
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let media = state.content.media_config().clone();
    let upload_limit = media.max_upload_bytes + 64 * 1024;

    Router::new()
        .route("/health", get(health))
        .route("/graphql", post(graphql_handler).get(graphql_handler))
        .route("/graphiql", get(graphiql))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/tasks/bulk-generate", post(bulk_generate))
        .route("/tasks/jobs/:id", get(job_status))
        .route(
            "/content/api/media/upload",
            post(upload_media).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .nest_service("/content/uploads", ServeDir::new(media.upload_dir))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = create_server(state);

    info!("HTTP server running on http://{addr}");
    info!("GraphQL:  http://{addr}/graphql");
    info!("GraphiQL: http://{addr}/graphiql");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .map_err(|e| ConsoleError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    info!("HTTP server stopped");
    Ok(())
}

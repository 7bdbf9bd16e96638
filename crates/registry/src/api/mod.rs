// REST and JSON-RPC surface of the registry.

pub mod accesses;
pub mod documents;
pub mod events;
pub mod jsonrpc;

use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::{
    error::{ErrorCode, RegistryError},
    pagination::{PageEnvelope, PageRequest, PageUrl},
    rpc::{DispatchError, Dispatcher},
    store::{models::Document, Entity, Session, Store, StoreError},
};

#[derive(Clone)]
pub struct ApiState {
    pub store: Store,
    pub dispatcher: Arc<Dispatcher>,
    /// Mount point of the registry routes, used to render hyperlinks.
    pub path_prefix: Arc<str>,
}

impl ApiState {
    pub fn new(store: Store, dispatcher: Dispatcher, path_prefix: &str) -> Self {
        Self { store, dispatcher: Arc::new(dispatcher), path_prefix: Arc::from(path_prefix) }
    }

    fn url(&self, path: impl AsRef<str>) -> PageUrl {
        PageUrl::new(self.href(path))
    }

    fn href(&self, path: impl AsRef<str>) -> String {
        format!("{}{}", self.path_prefix, path.as_ref())
    }
}

impl FromRef<ApiState> for Store {
    fn from_ref(state: &ApiState) -> Self {
        state.store.clone()
    }
}

/// Registry routes nested under the configured prefix, plus `/healthz`.
pub fn router(state: ApiState) -> Router {
    let registry = Router::new()
        .route("/jsonrpc", post(jsonrpc::handle))
        .route("/accesses", get(accesses::list_accesses).head(accesses::check_creator))
        .route("/documents", get(documents::list_documents))
        .route("/documents/{document_id}", get(documents::get_document))
        .route("/documents/{document_id}/events", get(events::list_events))
        .route("/documents/{document_id}/events/{event_id}", get(events::get_event))
        .route("/documents/{document_id}/accesses", get(accesses::list_document_accesses))
        .route("/abi", get(abi));

    let routes = if state.path_prefix.is_empty() {
        registry
    } else {
        Router::new().nest(&state.path_prefix, registry)
    };

    routes.route("/healthz", get(healthz)).with_state(state)
}

async fn abi() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn healthz(State(state): State<ApiState>) -> Response {
    match state.store.check_health().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(error) => {
            let backend = state.store.backend_name();
            tracing::warn!(error = ?error, backend, "registry health check failed");
            RegistryError::from_code(ErrorCode::Unavailable).into_response()
        }
    }
}

/// `page[after]` / `page[size]` as they arrive on the query string.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(rename = "page[after]")]
    pub after: Option<i64>,
    #[serde(rename = "page[size]")]
    pub size: Option<i64>,
}

impl PageQuery {
    pub fn resolve(&self) -> PageRequest {
        PageRequest::resolve(self.after, self.size)
    }
}

/// Count, window and project one page of `E`.
async fn list_page<E, T>(
    session: &mut Session,
    filter: &E::Filter,
    page: PageRequest,
    url: &PageUrl,
    project: impl Fn(E) -> T,
) -> Result<PageEnvelope<T>, ApiError>
where
    E: Entity,
{
    let mut repo = session.repo::<E>();
    let total = repo.count(filter).await?;
    let rows = repo.list(page.offset(), page.limit(), None, filter).await?;

    Ok(PageEnvelope::new(url, page, total, rows.into_iter().map(project).collect()))
}

async fn require_document(session: &mut Session, document_id: &str) -> Result<(), ApiError> {
    let id = document_id.to_owned();
    match session.repo::<Document>().get(&id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound(format!("document `{document_id}` not found"))),
    }
}

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    InvalidMethod(String),
    Decode(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { .. } => Self::NotFound(error.to_string()),
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::Database(error) => Self::Internal(error.into()),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::InvalidRequest(_) | DispatchError::InvalidParams(_) => {
                Self::Validation(error.to_string())
            }
            DispatchError::InvalidMethod(_) => Self::InvalidMethod(error.to_string()),
            DispatchError::Decode(message) => Self::Decode(message),
            DispatchError::NotFound(message) => Self::NotFound(message),
            DispatchError::Conflict(message) => Self::Conflict(message),
            DispatchError::Store(error) => Self::from(error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => {
                RegistryError::new(ErrorCode::ValidationFailed, message).into_response()
            }
            Self::InvalidMethod(message) => {
                RegistryError::new(ErrorCode::InvalidMethod, message).into_response()
            }
            Self::Decode(message) => {
                RegistryError::new(ErrorCode::DecodeFailed, message).into_response()
            }
            Self::NotFound(message) => {
                RegistryError::new(ErrorCode::NotFound, message).into_response()
            }
            Self::Conflict(message) => {
                RegistryError::new(ErrorCode::Conflict, message).into_response()
            }
            Self::Internal(error) => {
                tracing::error!(error = ?error, "registry api internal error");
                RegistryError::from_code(ErrorCode::InternalError).into_response()
            }
        }
    }
}

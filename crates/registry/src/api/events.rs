// Event read endpoints, always scoped to their document.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tnt_common::types::Timestamp;

use super::{list_page, require_document, ApiError, ApiState, PageQuery};
use crate::{
    pagination::PageEnvelope,
    store::{
        models::{Event, EventFilter},
        Session,
    },
    validation::ValidatedQuery,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventItem {
    pub event_id: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPublic {
    pub metadata: String,
    pub sender: String,
    pub origin: String,
    pub hash: String,
    pub external_hash: Option<String>,
    pub timestamp: Option<Timestamp>,
}

impl From<Event> for EventPublic {
    fn from(event: Event) -> Self {
        Self {
            timestamp: event.timestamp(),
            metadata: event.metadata,
            sender: event.sender,
            origin: event.origin,
            hash: event.hash,
            external_hash: event.external_hash,
        }
    }
}

pub(super) async fn list_events(
    State(state): State<ApiState>,
    Path(document_id): Path<String>,
    mut session: Session,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<PageEnvelope<EventItem>>, ApiError> {
    require_document(&mut session, &document_id).await?;

    let base = format!("/documents/{document_id}/events");
    let url = state.url(&base);
    let filter = EventFilter { document_id: Some(document_id) };
    let envelope = list_page(&mut session, &filter, query.resolve(), &url, |event: Event| {
        EventItem { href: state.href(format!("{base}/{}", event.id)), event_id: event.id }
    })
    .await?;

    Ok(Json(envelope))
}

pub(super) async fn get_event(
    Path((document_id, event_id)): Path<(String, String)>,
    mut session: Session,
) -> Result<Json<EventPublic>, ApiError> {
    match session.repo::<Event>().get(&event_id).await? {
        Some(event) if event.document_id == document_id => Ok(Json(event.into())),
        _ => Err(ApiError::NotFound(format!(
            "event `{event_id}` not found for document `{document_id}`"
        ))),
    }
}

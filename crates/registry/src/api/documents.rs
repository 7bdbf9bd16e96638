// Document read endpoints.
//
// Routes:
//   GET /documents                  : paginated summaries
//   GET /documents/{document_id}    : full document (`?version=latest|deprecated`)

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tnt_common::types::{DocumentVersion, Timestamp};

use super::{list_page, ApiError, ApiState, PageQuery};
use crate::{
    pagination::PageEnvelope,
    store::{
        models::{Document, DocumentFilter},
        Session,
    },
    validation::ValidatedQuery,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub document_id: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentPublic {
    pub metadata: String,
    pub timestamp: Option<Timestamp>,
    pub creator: String,
}

impl From<Document> for DocumentPublic {
    fn from(document: Document) -> Self {
        Self {
            timestamp: document.timestamp(),
            metadata: document.metadata,
            creator: document.creator,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    #[serde(default)]
    pub version: DocumentVersion,
}

pub(super) async fn list_documents(
    State(state): State<ApiState>,
    mut session: Session,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<PageEnvelope<DocumentItem>>, ApiError> {
    let url = state.url("/documents");
    let filter = DocumentFilter::default();
    let envelope = list_page(&mut session, &filter, query.resolve(), &url, |document: Document| {
        DocumentItem {
            href: state.href(format!("/documents/{}", document.id)),
            document_id: document.id,
        }
    })
    .await?;

    Ok(Json(envelope))
}

pub(super) async fn get_document(
    Path(document_id): Path<String>,
    mut session: Session,
    ValidatedQuery(query): ValidatedQuery<VersionQuery>,
) -> Result<Json<DocumentPublic>, ApiError> {
    // Documents are never updated in place, so no superseded revision exists.
    if query.version == DocumentVersion::Deprecated {
        return Err(ApiError::NotFound(format!(
            "document `{document_id}` has no deprecated version"
        )));
    }

    match session.repo::<Document>().get(&document_id).await? {
        Some(document) => Ok(Json(document.into())),
        None => Err(ApiError::NotFound(format!("document `{document_id}` not found"))),
    }
}

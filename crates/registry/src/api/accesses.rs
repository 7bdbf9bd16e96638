// Access grant endpoints.
//
// Routes:
//   HEAD /accesses?creator=<id>                 : 204 if any grant names the subject, else 404
//   GET  /accesses?subject=&documentId=         : paginated grants
//   GET  /documents/{document_id}/accesses      : paginated grants of one document

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tnt_common::types::Permission;

use super::{list_page, require_document, ApiError, ApiState, PageQuery};
use crate::{
    pagination::{PageEnvelope, PageRequest},
    store::{
        models::{Access, AccessFilter},
        Session,
    },
    validation::ValidatedQuery,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessItem {
    pub subject: String,
    pub granted_by: String,
    pub permission: Permission,
    pub document_id: String,
}

impl From<Access> for AccessItem {
    fn from(access: Access) -> Self {
        Self {
            subject: access.subject,
            granted_by: access.granted_by,
            permission: access.permission,
            document_id: access.document_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatorQuery {
    pub creator: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessListQuery {
    pub subject: Option<String>,
    #[serde(rename = "documentId")]
    pub document_id: Option<String>,
    #[serde(rename = "page[after]")]
    pub after: Option<i64>,
    #[serde(rename = "page[size]")]
    pub size: Option<i64>,
}

pub(super) async fn check_creator(
    mut session: Session,
    ValidatedQuery(query): ValidatedQuery<CreatorQuery>,
) -> Result<StatusCode, ApiError> {
    let filter = AccessFilter { subject: Some(query.creator), ..AccessFilter::default() };
    let matches = session.repo::<Access>().count(&filter).await?;

    if matches > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("no access grant for subject".to_owned()))
    }
}

pub(super) async fn list_accesses(
    State(state): State<ApiState>,
    mut session: Session,
    ValidatedQuery(query): ValidatedQuery<AccessListQuery>,
) -> Result<Json<PageEnvelope<AccessItem>>, ApiError> {
    let url = state
        .url("/accesses")
        .filter("subject", query.subject.as_deref())
        .filter("documentId", query.document_id.as_deref());
    let page = PageRequest::resolve(query.after, query.size);
    let filter = AccessFilter {
        subject: query.subject,
        document_id: query.document_id,
        ..AccessFilter::default()
    };

    let envelope =
        list_page(&mut session, &filter, page, &url, |access: Access| AccessItem::from(access))
            .await?;

    Ok(Json(envelope))
}

pub(super) async fn list_document_accesses(
    State(state): State<ApiState>,
    Path(document_id): Path<String>,
    mut session: Session,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<PageEnvelope<AccessItem>>, ApiError> {
    require_document(&mut session, &document_id).await?;

    let url = state.url(format!("/documents/{document_id}/accesses"));
    let filter = AccessFilter { document_id: Some(document_id), ..AccessFilter::default() };

    let envelope = list_page(&mut session, &filter, query.resolve(), &url, |access: Access| {
        AccessItem::from(access)
    })
    .await?;

    Ok(Json(envelope))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::api::test_support::{create_document, read_json, rpc, send, test_router, PREFIX};

    fn grant(document_id: &str, subject_hex: &str, permission: &str) -> Value {
        json!({
            "documentHash": document_id,
            "grantedByAccount": "0x61646d696e",
            "subjectAccount": subject_hex,
            "permission": permission,
        })
    }

    // user1 / user2 as hex identities.
    const USER1: &str = "0x7573657231";
    const USER2: &str = "0x7573657232";

    fn user1_write_doc1() -> Value {
        json!({
            "subject": "user1",
            "grantedBy": "admin",
            "permission": "write",
            "documentId": "doc1",
        })
    }

    #[tokio::test]
    async fn head_accesses_reports_whether_subject_has_grants() {
        let (router, _) = test_router();
        rpc(&router, "createDocument", vec![create_document("doc1")]).await;
        let grants = vec![grant("doc1", USER1, "write"), grant("doc1", USER1, "delegate")];
        rpc(&router, "grantAccess", grants).await;

        let found = format!("{PREFIX}/accesses?creator=user1");
        let response = send(&router, Method::HEAD, &found, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let missing = format!("{PREFIX}/accesses?creator=user2");
        let response = send(&router, Method::HEAD, &missing, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn head_accesses_requires_creator() {
        let (router, _) = test_router();

        let uri = format!("{PREFIX}/accesses");
        let response = send(&router, Method::HEAD, &uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn accesses_by_subject_keep_filter_in_links() {
        let (router, _) = test_router();
        rpc(&router, "createDocument", vec![create_document("doc1"), create_document("doc2")])
            .await;
        let grants = vec![
            grant("doc1", USER1, "write"),
            grant("doc2", USER1, "creator"),
            grant("doc1", USER2, "write"),
        ];
        rpc(&router, "grantAccess", grants).await;

        let uri = format!("{PREFIX}/accesses?subject=user1&page%5Bsize%5D=1");
        let body = read_json(send(&router, Method::GET, &uri, None).await).await;

        assert_eq!(body["total"], 2);
        assert_eq!(body["items"], json!([user1_write_doc1()]));
        let second = format!("{PREFIX}/accesses?subject=user1&page[after]=2&page[size]=1");
        assert_eq!(body["links"]["next"], second);
        assert_eq!(body["links"]["last"], second);
    }

    #[tokio::test]
    async fn accesses_by_document_keep_filter_in_links() {
        let (router, _) = test_router();
        rpc(&router, "createDocument", vec![create_document("doc1"), create_document("doc2")])
            .await;
        let grants = vec![
            grant("doc1", USER1, "write"),
            grant("doc2", USER1, "creator"),
            grant("doc1", USER2, "write"),
        ];
        rpc(&router, "grantAccess", grants).await;

        let uri = format!("{PREFIX}/accesses?documentId=doc1&page%5Bsize%5D=1");
        let response = send(&router, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"], json!([user1_write_doc1()]));
        let second = format!("{PREFIX}/accesses?documentId=doc1&page[after]=2&page[size]=1");
        assert_eq!(body["links"]["next"], second);
        assert_eq!(body["links"]["last"], second);
    }

    #[tokio::test]
    async fn granted_access_is_listed_under_its_document() {
        let (router, _) = test_router();
        rpc(&router, "createDocument", vec![create_document("doc1")]).await;

        let response = rpc(&router, "grantAccess", vec![grant("doc1", USER1, "write")]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "status": "success", "message": "Operation completed successfully" },
            })
        );

        let uri = format!("{PREFIX}/documents/doc1/accesses");
        let body = read_json(send(&router, Method::GET, &uri, None).await).await;
        assert_eq!(body["items"], json!([user1_write_doc1()]));
    }

    #[tokio::test]
    async fn accesses_of_missing_document_return_404() {
        let (router, _) = test_router();

        let uri = format!("{PREFIX}/documents/ghost/accesses");
        assert_eq!(send(&router, Method::GET, &uri, None).await.status(), StatusCode::NOT_FOUND);
    }
}

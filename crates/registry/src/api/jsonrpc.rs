// POST /jsonrpc: ledger announcements applied as one unit of work.

use axum::{extract::State, Json};
use tnt_common::protocol::jsonrpc::{Request, Response};

use super::{ApiError, ApiState};
use crate::{store::Session, validation::ValidatedJson};

pub(super) async fn handle(
    State(state): State<ApiState>,
    mut session: Session,
    ValidatedJson(request): ValidatedJson<Request>,
) -> Result<Json<Response>, ApiError> {
    let response = state.dispatcher.dispatch(&mut session, request).await?;
    Ok(Json(response))
}

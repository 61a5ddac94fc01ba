use axum::extract::State;
use axum::Json;
use scriptsui_core::scripting::sources::{self, SourceListing};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/scripts -- runnable scripts grouped by source.
pub async fn list_scripts(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<SourceListing>>>> {
    let snapshot = state.sources.snapshot().await?;
    let data = sources::list_scripts(&snapshot).await;
    Ok(Json(DataResponse { data }))
}

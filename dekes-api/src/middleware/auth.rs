/// Session authentication layer
///
/// Resolves the caller with [`resolve_session`] and inserts the resulting
/// [`AuthContext`] into request extensions. Rejected requests never reach
/// the handler.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dekes_shared::auth::middleware::resolve_session;

use crate::app::AppState;
use crate::error::ApiError;

pub async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = resolve_session(&state.sessions, req.headers()).await?;

    tracing::debug!(
        user_id = %auth.user_id,
        organization_id = %auth.organization_id,
        "Request authenticated"
    );
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

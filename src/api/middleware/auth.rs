use crate::models::{Caller, Role};
use crate::utils::auth::validate_jwt;
use crate::{AppState, entities::prelude::Users};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;
use serde::Deserialize;
use tracing::warn;

#[derive(Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

/// Resolves the bearer token (header or `?token=`) to a [`Caller`]. The role
/// comes from the user row, not the token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let token = if let Some(t) = auth_header {
        Some(t)
    } else {
        let query = req.uri().query().unwrap_or_default();
        serde_urlencoded::from_str::<AuthQuery>(query)
            .ok()
            .and_then(|q| q.token)
    };

    let Some(token) = token else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let Ok(claims) = validate_jwt(&token, &state.config.jwt_secret) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let user = Users::find_by_id(claims.sub.clone())
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let role: Role = user.role.parse().map_err(|e| {
        warn!("User {} has an unusable role: {}", user.id, e);
        StatusCode::FORBIDDEN
    })?;

    req.extensions_mut().insert(Caller::new(user.id, role));
    Ok(next.run(req).await)
}

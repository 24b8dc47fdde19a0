//! Member identity
//!
//! Login happens in the proxy in front of this service, which forwards the
//! authenticated member id in the `X-Member-Id` header. Protected routes
//! run [`require_member`], which rejects requests without a well-formed id
//! and hands the id to handlers as an `Extension<CurrentMember>`.

use axum::{extract::Request, middleware::Next, response::Response};
use bandstand_common::uuid_utils::parse_id;
use tracing::debug;
use uuid::Uuid;

use super::ApiError;

pub const MEMBER_HEADER: &str = "x-member-id";

/// The member making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentMember(pub Uuid);

pub async fn require_member(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(MEMBER_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("missing X-Member-Id header".to_string()))?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("X-Member-Id header is not text".to_string()))?;

    let member_id = parse_id("X-Member-Id", value)?;
    debug!(member_id = %member_id, path = %request.uri().path(), "Member request");

    request.extensions_mut().insert(CurrentMember(member_id));
    Ok(next.run(request).await)
}

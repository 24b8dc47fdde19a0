//! HTTP API handlers for bandstand-server

pub mod error;
pub mod extract;
pub mod health;
pub mod members;
pub mod rankings;
pub mod search;
pub mod session;
pub mod setlists;
pub mod suggestions;
pub mod votes;

pub use error::ApiError;
pub use extract::AppJson;
pub use health::health_routes;
pub use session::{require_member, CurrentMember, MEMBER_HEADER};

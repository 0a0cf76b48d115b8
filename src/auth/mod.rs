//! Authentication: password sign-in, refresh token rotation and the access
//! guard for protected routes.
//!
//! Access tokens are short-lived and stateless. Refresh tokens are tracked in
//! a durable store and marked in a fast store so that they can be rotated and
//! revoked.

mod errors;
mod extractors;
mod service;
mod types;

pub use errors::AuthError;
pub use extractors::{CurrentUser, bearer_token, require_access_token};
pub use service::{AuthService, parse_access_token};
pub use types::{AuthenticatedUser, TokenPair};

mod auth;

pub use auth::{AuthenticatedUser, AUTHENTICATED_USER_HEADER};

//! Bearer authentication and refresh-cookie transport.
//!
//! Access tokens travel in the `Authorization: Bearer` header and are
//! verified statelessly. The refresh token travels in an HTTP-only cookie
//! and is only ever read by the refresh endpoint.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
pub use errors::AuthError;
pub use extractors::Auth;
pub use state::HasAuthState;
pub use types::Principal;

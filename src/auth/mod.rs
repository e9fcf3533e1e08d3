//! Bearer-token authentication.
//!
//! Dual-credential system: short-lived signed access tokens presented on
//! every request, and long-lived opaque refresh secrets backed by the
//! session store. Revocation is a jti blacklist consulted by the request
//! authenticator.

mod errors;
mod extractors;
mod password;
mod service;
mod state;
mod types;

pub use errors::{AuthError, AuthRejection};
pub use extractors::{Auth, OptionalAuth};
pub use password::{PasswordAuthenticator, UserAuthenticator, UserIdentity, hash_password};
pub use service::{AuthService, CleanupReport, LoginTokens, RefreshedToken};
pub use state::HasAuthState;
pub use types::AuthUser;

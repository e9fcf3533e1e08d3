//! Authenticated identity attached to a request.

/// Identity extracted from a verified, non-revoked access token.
///
/// Inserted into the request's extensions by the auth extractors and
/// handed to handlers; carries exactly what downstream code needs to act
/// on behalf of the caller or to revoke the presented token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The authenticated user's UUID
    pub user_id: String,
    /// The authenticated user's email
    pub email: String,
    /// The presented access token's unique identifier
    pub jti: String,
}

//! Identity hook for the handshake.
//!
//! Minefield doesn't implement authentication itself. The server calls an
//! [`Authenticator`] with the token from the client's `Handshake` and
//! trusts the [`PlayerId`] it returns. Plug in JWT validation, an auth
//! provider, or a session cookie lookup; tests and the demo use
//! [`UsernameAuthenticator`].

use minefield_protocol::PlayerId;

use crate::MinefieldError;

/// Validates a client's token and returns their stable identity.
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// connection task for the lifetime of the server.
pub trait Authenticator: Send + Sync + 'static {
    /// Resolves `token` to a player.
    ///
    /// # Errors
    /// [`MinefieldError::Unauthorized`] when the token is rejected. The
    /// handler answers with a 401 and closes the connection.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<PlayerId, MinefieldError>> + Send;
}

/// Treats the token as a username and uses it as the player id.
///
/// Accepts 1 to 32 characters of ASCII letters, digits, `_` and `-`.
/// Only for development; there is no secret involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsernameAuthenticator;

impl UsernameAuthenticator {
    pub const MAX_LEN: usize = 32;
}

impl Authenticator for UsernameAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<PlayerId, MinefieldError> {
        let name = token.trim();
        if name.is_empty() || name.len() > Self::MAX_LEN {
            return Err(MinefieldError::Unauthorized(format!(
                "username must be 1 to {} characters",
                Self::MAX_LEN
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(MinefieldError::Unauthorized(
                "username may only contain letters, digits, '_' and '-'".into(),
            ));
        }
        Ok(PlayerId::new(name))
    }
}

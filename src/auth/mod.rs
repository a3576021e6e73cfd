mod identity_toolkit;

use async_trait::async_trait;

use crate::error::Result;

pub use identity_toolkit::IdentityToolkitVerifier;

/// Checks a bearer ID token with the external identity provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// The verified subject (the provider's user id), or `None` when the provider rejects the
    /// token. `Err` is reserved for the provider being unreachable or misbehaving.
    async fn verify(&self, token: &str) -> Result<Option<String>>;
}

//! Authorization provider client.
//!
//! A vote needs an authorization from the voter's wallet — an account
//! address plus a signature (or a provider-side handle standing in for one).
//! The provider is external and untrusted for availability: it may be down,
//! slow, or the voter may simply decline the prompt. Credentials are never
//! cached beyond the session that requested them.

pub mod error;
pub mod http;

pub use error::WalletError;
pub use http::HttpAuthorizationProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use votum_types::{SessionId, Timestamp, VoterAddress};

/// A granted vote authorization.
///
/// The address format and signature scheme are provider-defined and opaque
/// to the service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Authorization {
    /// Account the vote will be cast from.
    pub address: VoterAddress,
    /// Provider-defined signature or handle proving consent.
    pub signature_or_handle: String,
    /// When the provider granted the authorization.
    pub granted_at: Timestamp,
}

/// A pluggable wallet-side authorization provider.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Prompt the wallet holder to authorize a vote for this session.
    ///
    /// Each call is a fresh prompt; a previous rejection does not poison
    /// later calls.
    async fn authorize(&self, session_id: SessionId) -> Result<Authorization, WalletError>;
}

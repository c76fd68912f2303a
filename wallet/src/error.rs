use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("authorization rejected by the wallet holder")]
    UserRejected,

    #[error("wallet provider unavailable: {0}")]
    Unavailable(String),

    #[error("wallet provider holds no accounts")]
    NoAccounts,

    #[error("malformed provider response: {0}")]
    Protocol(String),
}

impl WalletError {
    /// Whether re-prompting within the same session may succeed.
    ///
    /// Every `authorize` call is a fresh prompt, so only a protocol
    /// violation is not worth re-prompting for.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Protocol(_))
    }
}

//! Nullable authorization provider — scripted wallet prompts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use votum_types::{SessionId, Timestamp, VoterAddress};
use votum_wallet::{Authorization, AuthorizationProvider, WalletError};

/// A provider that replays scripted prompt outcomes in order.
///
/// With an empty script every prompt is granted for a fixed test address,
/// which keeps happy-path tests short.
pub struct NullAuthorizer {
    address: String,
    script: Mutex<VecDeque<Result<String, WalletError>>>,
    calls: AtomicU32,
}

impl NullAuthorizer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Script the next prompt to be granted for `address`.
    pub fn push_grant(&self, address: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(address.into()));
    }

    /// Script the next prompt to fail.
    pub fn push_error(&self, error: WalletError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// How many times `authorize` has been called.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for NullAuthorizer {
    fn default() -> Self {
        Self::new("0xnull")
    }
}

#[async_trait]
impl AuthorizationProvider for NullAuthorizer {
    async fn authorize(&self, session_id: SessionId) -> Result<Authorization, WalletError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let address = match next {
            Some(Ok(address)) => address,
            Some(Err(e)) => return Err(e),
            None => self.address.clone(),
        };
        Ok(Authorization {
            address: VoterAddress::new(address),
            signature_or_handle: format!("sig-{session_id}"),
            granted_at: Timestamp::new(0),
        })
    }
}

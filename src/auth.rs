// Credential handling: decides when a new bearer token has to be fetched.

use std::time::{Duration, Instant};

use log::debug;

use crate::api::VideoApi;
use crate::errors::ApiResult;

/// Lifetime the service documents for its tokens.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Tokens this close to expiry are treated as expired.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPolicy {
    /// Fetch a new token before every authenticated request.
    #[default]
    AlwaysRefresh,
    /// Reuse a token until it is about to expire. `default_ttl` applies when
    /// the auth response does not state a lifetime.
    ReuseUntilExpiry { default_ttl: Duration },
}

/// Source of bearer tokens for authenticated requests.
pub trait CredentialProvider {
    /// Token to put in the next request's `Authorization` header.
    fn bearer_token(&mut self, api: &dyn VideoApi) -> ApiResult<String>;

    /// Forget any cached token, e.g. after the server rejected it.
    fn invalidate(&mut self);
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Token provider driven by a `TokenPolicy`.
#[derive(Debug, Default)]
pub struct Credentials {
    policy: TokenPolicy,
    cached: Option<CachedToken>,
}

impl Credentials {
    pub fn new(policy: TokenPolicy) -> Self {
        Credentials {
            policy,
            cached: None,
        }
    }

    fn fresh_cached(&self, now: Instant) -> Option<&str> {
        self.cached
            .as_ref()
            .filter(|c| now + EXPIRY_MARGIN < c.expires_at)
            .map(|c| c.value.as_str())
    }
}

impl CredentialProvider for Credentials {
    fn bearer_token(&mut self, api: &dyn VideoApi) -> ApiResult<String> {
        let default_ttl = match self.policy {
            TokenPolicy::AlwaysRefresh => return Ok(api.authenticate()?.value),
            TokenPolicy::ReuseUntilExpiry { default_ttl } => default_ttl,
        };

        let now = Instant::now();
        if let Some(token) = self.fresh_cached(now) {
            return Ok(token.to_string());
        }

        debug!("Fetching a new access token");
        let token = api.authenticate()?;
        if token.is_empty() {
            // an empty token is never worth keeping
            self.cached = None;
        } else {
            self.cached = Some(CachedToken {
                value: token.value.clone(),
                expires_at: now + token.expires_in.unwrap_or(default_ttl),
            });
        }
        Ok(token.value)
    }

    fn invalidate(&mut self) {
        self.cached = None;
    }
}

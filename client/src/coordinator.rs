//! Token caching and single-flight refresh coordination
//!
//! The coordinator owns the client's token state and hides expiry from
//! callers. Concurrent calls that all hit an expired token share one
//! refresh network call through a broadcast channel; everyone waits on
//! the same outcome instead of racing the rotation endpoint, which
//! would trip server-side reuse detection.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::storage::{keys, TokenStore};
use crate::transport::{ApiRequest, ApiResponse, AuthTransport, TokenGrant, TransportError};

/// Tokens are treated as expired this many seconds before their real
/// expiry so a request never carries a token that dies mid-flight.
const DEFAULT_REFRESH_MARGIN_SECS: i64 = 30;

/// Snapshot of the locally cached token state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTokens {
    pub access_token: String,
    /// Absent in the degraded legacy state where only the old access
    /// token alias was persisted.
    pub refresh_token: Option<String>,
    /// Locally estimated access token expiry. Absent for legacy-only
    /// state, in which case requests proceed until the server rejects.
    pub expires_at: Option<DateTime<Utc>>,
}

type RefreshOutcome = Result<CachedTokens, ClientError>;
type InFlightSlot = Mutex<Option<broadcast::Sender<RefreshOutcome>>>;

/// Per-instance refresh coordination plus token persistence.
///
/// One coordinator per client runtime. The in-flight slot holds the
/// broadcast sender while a refresh is running; it is taken back out in
/// every outcome path, including cancellation of the leading call, so a
/// later call can always start a new refresh.
///
/// The slot mutex is synchronous and only ever held for the length of a
/// subscribe or a take, never across an await.
pub struct TokenCoordinator<S: TokenStore, T: AuthTransport> {
    store: S,
    transport: T,
    refresh_margin: Duration,
    in_flight: InFlightSlot,
}

/// Held by the leading refresh call. Dropping the guard empties the
/// in-flight slot, so a leader cancelled mid-refresh (a caller-supplied
/// timeout, an aborted task) releases the coordination flag: its waiters
/// see the channel close and fail, and the next call starts a fresh
/// refresh instead of waiting on a sender nobody will use.
struct RefreshLead<'a> {
    slot: &'a InFlightSlot,
}

impl RefreshLead<'_> {
    /// Broadcasts the outcome to every waiter and releases the slot.
    fn finish(self, outcome: &RefreshOutcome) {
        if let Some(sender) = lock_slot(self.slot).take() {
            let _ = sender.send(outcome.clone());
        }
    }
}

impl Drop for RefreshLead<'_> {
    fn drop(&mut self) {
        lock_slot(self.slot).take();
    }
}

fn lock_slot(slot: &InFlightSlot) -> MutexGuard<'_, Option<broadcast::Sender<RefreshOutcome>>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<S: TokenStore, T: AuthTransport> TokenCoordinator<S, T> {
    pub fn new(store: S, transport: T) -> Self {
        Self::with_refresh_margin(store, transport, DEFAULT_REFRESH_MARGIN_SECS)
    }

    pub fn with_refresh_margin(store: S, transport: T, margin_secs: i64) -> Self {
        Self {
            store,
            transport,
            refresh_margin: Duration::seconds(margin_secs),
            in_flight: Mutex::new(None),
        }
    }

    /// Read the cached token state, falling back to the deprecated
    /// legacy access token alias when the canonical key is absent.
    pub fn cached(&self) -> Option<CachedTokens> {
        let access_token = self
            .store
            .get(keys::ACCESS_TOKEN)
            .or_else(|| self.store.get(keys::LEGACY_TOKEN))?;

        let expires_at = self
            .store
            .get(keys::EXPIRES_AT)
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|v| v.with_timezone(&Utc));

        Some(CachedTokens {
            access_token,
            refresh_token: self.store.get(keys::REFRESH_TOKEN),
            expires_at,
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.cached().is_some()
    }

    /// Persist a freshly issued token pair. The legacy alias is written
    /// alongside the canonical key so older readers stay working; both
    /// are cleared together.
    pub fn store_grant(&self, grant: &TokenGrant) -> CachedTokens {
        let expires_at = Utc::now() + Duration::seconds(grant.expires_in);

        self.store.set(keys::ACCESS_TOKEN, &grant.access_token);
        self.store.set(keys::LEGACY_TOKEN, &grant.access_token);
        self.store.set(keys::REFRESH_TOKEN, &grant.refresh_token);
        self.store.set(keys::EXPIRES_AT, &expires_at.to_rfc3339());

        CachedTokens {
            access_token: grant.access_token.clone(),
            refresh_token: Some(grant.refresh_token.clone()),
            expires_at: Some(expires_at),
        }
    }

    /// Remove every token key, canonical and legacy.
    pub fn clear(&self) {
        self.store.remove(keys::ACCESS_TOKEN);
        self.store.remove(keys::LEGACY_TOKEN);
        self.store.remove(keys::REFRESH_TOKEN);
        self.store.remove(keys::EXPIRES_AT);
    }

    /// Send a request, attaching the cached access token and refreshing
    /// it when needed.
    ///
    /// Refreshes proactively when the cached expiry is within the
    /// safety margin. On a 401 the coordinator refreshes once and
    /// retries once; a second 401 surfaces as `SessionExpired` rather
    /// than looping.
    pub async fn authorized_call(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut bearer = None;
        if request.requires_auth {
            if let Some(cached) = self.cached() {
                if self.needs_refresh(&cached) && cached.refresh_token.is_some() {
                    let refreshed = self.coordinated_refresh().await?;
                    bearer = Some(refreshed.access_token);
                } else {
                    bearer = Some(cached.access_token);
                }
            }
        }

        let response = self.transport.send(request, bearer.as_deref()).await?;
        if response.status != 401 || !request.requires_auth {
            return Ok(response);
        }

        debug!(path = %request.path, "request rejected with 401, refreshing once");
        let refreshed = self.coordinated_refresh().await?;
        let retried = self
            .transport
            .send(request, Some(&refreshed.access_token))
            .await?;
        if retried.status == 401 {
            warn!(path = %request.path, "retry rejected after refresh, session is gone");
            self.clear();
            return Err(ClientError::SessionExpired);
        }
        Ok(retried)
    }

    /// Refresh the token pair, sharing one in-flight network call among
    /// concurrent callers.
    pub async fn coordinated_refresh(&self) -> Result<CachedTokens, ClientError> {
        let mut waiter = {
            let mut slot = lock_slot(&self.in_flight);
            match slot.as_ref() {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    *slot = Some(sender);
                    None
                }
            }
        };

        if let Some(rx) = waiter.as_mut() {
            return match rx.recv().await {
                Ok(outcome) => outcome,
                // Channel closed without a message: the leading call
                // was cancelled. Fail so the caller can retry against
                // the now-empty slot.
                Err(_) => Err(ClientError::RefreshFailed(
                    "refresh coordination interrupted".to_string(),
                )),
            };
        }

        // The guard releases the slot even if this future is dropped
        // mid-refresh; on the normal path it broadcasts the outcome.
        let lead = RefreshLead {
            slot: &self.in_flight,
        };
        let outcome = self.perform_refresh().await;
        lead.finish(&outcome);
        outcome
    }

    fn needs_refresh(&self, cached: &CachedTokens) -> bool {
        match cached.expires_at {
            Some(expires_at) => expires_at - self.refresh_margin <= Utc::now(),
            None => false,
        }
    }

    async fn perform_refresh(&self) -> Result<CachedTokens, ClientError> {
        let refresh_token = match self.store.get(keys::REFRESH_TOKEN) {
            Some(value) => value,
            None => {
                self.clear();
                return Err(ClientError::SessionExpired);
            }
        };

        match self.transport.refresh(&refresh_token).await {
            Ok(grant) => {
                info!("token pair refreshed");
                Ok(self.store_grant(&grant))
            }
            Err(TransportError::Status(401)) => {
                warn!("refresh token rejected, clearing session");
                self.clear();
                Err(ClientError::SessionExpired)
            }
            Err(error) => {
                warn!(%error, "refresh call failed, clearing session");
                self.clear();
                Err(ClientError::RefreshFailed(error.to_string()))
            }
        }
    }

    /// Revoke the session server-side and clear local state. Local
    /// state is cleared even when the server call fails.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.get(keys::REFRESH_TOKEN) {
            if let Err(error) = self.transport.logout(&refresh_token).await {
                debug!(%error, "server logout failed, clearing locally anyway");
            }
        }
        self.clear();
    }
}

#[cfg(test)]
mod tests;

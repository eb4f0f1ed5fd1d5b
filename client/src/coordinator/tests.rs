use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

use super::*;
use crate::storage::MemoryTokenStore;

/// Scripted transport. `accepted_token` is the only bearer `send`
/// answers 200 to; a successful `refresh` rotates it to the new grant's
/// access token, mirroring the server.
#[derive(Clone, Default)]
struct MockTransport {
    refresh_calls: Arc<AtomicUsize>,
    send_calls: Arc<AtomicUsize>,
    accepted_token: Arc<StdMutex<Option<String>>>,
    next_grant: Arc<StdMutex<Option<TokenGrant>>>,
    reject_everything: Arc<AtomicBool>,
    refresh_delay_ms: Arc<AtomicU64>,
}

impl MockTransport {
    fn accept(&self, token: &str) {
        *self.accepted_token.lock().unwrap() = Some(token.to_string());
    }

    fn will_grant(&self, grant: TokenGrant) {
        *self.next_grant.lock().unwrap() = Some(grant);
    }

    /// Stalls only the next refresh call; later refreshes run at once.
    fn delay_next_refresh(&self, ms: u64) {
        self.refresh_delay_ms.store(ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthTransport for MockTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);

        let accepted = self.accepted_token.lock().unwrap().clone();
        let authorized = !request.requires_auth
            || (!self.reject_everything.load(Ordering::SeqCst)
                && bearer.map(str::to_string) == accepted
                && accepted.is_some());

        if authorized {
            Ok(ApiResponse {
                status: 200,
                body: json!({ "ok": true }),
            })
        } else {
            Ok(ApiResponse {
                status: 401,
                body: json!({ "error": "UNAUTHORIZED" }),
            })
        }
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay_ms = self.refresh_delay_ms.swap(0, Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(StdDuration::from_millis(delay_ms)).await;
        }

        match self.next_grant.lock().unwrap().clone() {
            Some(grant) => {
                self.accept(&grant.access_token);
                Ok(grant)
            }
            None => Err(TransportError::Status(401)),
        }
    }

    async fn logout(&self, _refresh_token: &str) -> Result<(), TransportError> {
        Ok(())
    }
}

fn grant(access: &str, refresh: &str) -> TokenGrant {
    TokenGrant {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_in: 900,
        refresh_expires_in: 604800,
    }
}

fn coordinator(
    transport: MockTransport,
) -> TokenCoordinator<MemoryTokenStore, MockTransport> {
    TokenCoordinator::new(MemoryTokenStore::new(), transport)
}

fn seed_expired_session(store: &MemoryTokenStore) {
    store.set(keys::ACCESS_TOKEN, "stale-access");
    store.set(keys::LEGACY_TOKEN, "stale-access");
    store.set(keys::REFRESH_TOKEN, "valid-refresh");
    store.set(
        keys::EXPIRES_AT,
        &(Utc::now() - Duration::seconds(60)).to_rfc3339(),
    );
}

fn seed_live_session(store: &MemoryTokenStore, access: &str) {
    store.set(keys::ACCESS_TOKEN, access);
    store.set(keys::LEGACY_TOKEN, access);
    store.set(keys::REFRESH_TOKEN, "valid-refresh");
    store.set(
        keys::EXPIRES_AT,
        &(Utc::now() + Duration::seconds(600)).to_rfc3339(),
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_one_refresh() {
    let transport = MockTransport::default();
    transport.delay_next_refresh(50);
    transport.will_grant(grant("fresh-access", "fresh-refresh"));

    let coordinator = Arc::new(coordinator(transport.clone()));
    seed_expired_session(&coordinator.store);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            coordinator.authorized_call(&ApiRequest::get("/me")).await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.status, 200);
    }

    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        coordinator.store.get(keys::ACCESS_TOKEN),
        Some("fresh-access".to_string())
    );
}

#[tokio::test]
async fn test_401_is_retried_once_without_caller_seeing_it() {
    // Token looks live locally but the server already rejects it.
    let transport = MockTransport::default();
    transport.accept("server-side-token");
    transport.will_grant(grant("fresh-access", "fresh-refresh"));

    let coordinator = coordinator(transport.clone());
    seed_live_session(&coordinator.store, "stale-access");

    let response = coordinator
        .authorized_call(&ApiRequest::get("/me"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(transport.send_calls.load(Ordering::SeqCst), 2);
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_401_surfaces_session_expired() {
    let transport = MockTransport::default();
    transport.reject_everything.store(true, Ordering::SeqCst);
    transport.will_grant(grant("fresh-access", "fresh-refresh"));

    let coordinator = coordinator(transport.clone());
    seed_live_session(&coordinator.store, "stale-access");

    let error = coordinator
        .authorized_call(&ApiRequest::get("/me"))
        .await
        .unwrap_err();

    assert_eq!(error, ClientError::SessionExpired);
    assert_eq!(transport.send_calls.load(Ordering::SeqCst), 2);
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
    assert!(coordinator.cached().is_none());
}

#[tokio::test]
async fn test_refresh_rejection_clears_every_token_key() {
    // next_grant unset: the refresh endpoint answers 401.
    let transport = MockTransport::default();
    let coordinator = coordinator(transport);
    seed_expired_session(&coordinator.store);

    let error = coordinator
        .authorized_call(&ApiRequest::get("/me"))
        .await
        .unwrap_err();

    assert_eq!(error, ClientError::SessionExpired);
    assert_eq!(coordinator.store.get(keys::ACCESS_TOKEN), None);
    assert_eq!(coordinator.store.get(keys::LEGACY_TOKEN), None);
    assert_eq!(coordinator.store.get(keys::REFRESH_TOKEN), None);
    assert_eq!(coordinator.store.get(keys::EXPIRES_AT), None);
}

#[tokio::test]
async fn test_network_failure_clears_session_and_reports_refresh_failed() {
    struct DeadTransport;

    #[async_trait]
    impl AuthTransport for DeadTransport {
        async fn send(
            &self,
            _request: &ApiRequest,
            _bearer: Option<&str>,
        ) -> Result<ApiResponse, TransportError> {
            Err(TransportError::Network("connection refused".to_string()))
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, TransportError> {
            Err(TransportError::Timeout)
        }

        async fn logout(&self, _refresh_token: &str) -> Result<(), TransportError> {
            Err(TransportError::Timeout)
        }
    }

    let coordinator = TokenCoordinator::new(MemoryTokenStore::new(), DeadTransport);
    seed_expired_session(&coordinator.store);

    let error = coordinator.coordinated_refresh().await.unwrap_err();
    assert!(matches!(error, ClientError::RefreshFailed(_)));
    assert!(coordinator.cached().is_none());

    // The in-flight slot was released, so a later refresh is attempted
    // rather than hanging on the dead one.
    let error = coordinator.coordinated_refresh().await.unwrap_err();
    assert_eq!(error, ClientError::SessionExpired);
}

#[tokio::test]
async fn test_cancelled_leading_refresh_releases_the_in_flight_slot() {
    let transport = MockTransport::default();
    transport.delay_next_refresh(60_000);
    transport.will_grant(grant("fresh-access", "fresh-refresh"));

    let coordinator = Arc::new(coordinator(transport.clone()));
    seed_expired_session(&coordinator.store);

    // A caller-supplied timeout cancels the leading refresh mid-call.
    let led = tokio::time::timeout(
        StdDuration::from_millis(50),
        coordinator.coordinated_refresh(),
    )
    .await;
    assert!(led.is_err());
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);

    // The cancellation released the slot, so this call issues a fresh
    // network refresh instead of waiting on the abandoned channel.
    let refreshed = tokio::time::timeout(
        StdDuration::from_millis(500),
        coordinator.coordinated_refresh(),
    )
    .await
    .expect("new refresh should not be blocked by the cancelled one")
    .unwrap();

    assert_eq!(refreshed.access_token, "fresh-access");
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_waiters_fail_fast_when_the_leader_is_dropped() {
    let transport = MockTransport::default();
    transport.delay_next_refresh(60_000);
    transport.will_grant(grant("fresh-access", "fresh-refresh"));

    let coordinator = Arc::new(coordinator(transport.clone()));
    seed_expired_session(&coordinator.store);

    let leader = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.coordinated_refresh().await })
    };
    tokio::time::sleep(StdDuration::from_millis(10)).await;

    let waiter = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.coordinated_refresh().await })
    };
    tokio::time::sleep(StdDuration::from_millis(10)).await;

    leader.abort();

    // The waiter sees the channel close and fails instead of hanging.
    let outcome = waiter.await.unwrap();
    assert!(matches!(outcome, Err(ClientError::RefreshFailed(_))));

    // And the slot is free for a new refresh.
    let refreshed = coordinator.coordinated_refresh().await.unwrap();
    assert_eq!(refreshed.access_token, "fresh-access");
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_store_grant_writes_legacy_alias_and_clear_removes_both() {
    let coordinator = coordinator(MockTransport::default());

    coordinator.store_grant(&grant("fresh-access", "fresh-refresh"));
    assert_eq!(
        coordinator.store.get(keys::ACCESS_TOKEN),
        Some("fresh-access".to_string())
    );
    assert_eq!(
        coordinator.store.get(keys::LEGACY_TOKEN),
        Some("fresh-access".to_string())
    );

    coordinator.clear();
    assert_eq!(coordinator.store.get(keys::ACCESS_TOKEN), None);
    assert_eq!(coordinator.store.get(keys::LEGACY_TOKEN), None);
}

#[tokio::test]
async fn test_legacy_only_state_still_authorizes() {
    // Only the deprecated alias is present: logged in, no refresh
    // capability, no local expiry estimate.
    let transport = MockTransport::default();
    transport.accept("legacy-access");

    let coordinator = coordinator(transport.clone());
    coordinator.store.set(keys::LEGACY_TOKEN, "legacy-access");

    assert!(coordinator.is_logged_in());

    let response = coordinator
        .authorized_call(&ApiRequest::get("/me"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_legacy_only_state_ends_when_server_rejects() {
    let transport = MockTransport::default();
    let coordinator = coordinator(transport.clone());
    coordinator.store.set(keys::LEGACY_TOKEN, "legacy-access");

    let error = coordinator
        .authorized_call(&ApiRequest::get("/me"))
        .await
        .unwrap_err();

    assert_eq!(error, ClientError::SessionExpired);
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 0);
    assert!(!coordinator.is_logged_in());
}

#[tokio::test]
async fn test_token_inside_safety_margin_refreshes_proactively() {
    let transport = MockTransport::default();
    transport.will_grant(grant("fresh-access", "fresh-refresh"));

    let coordinator = coordinator(transport.clone());
    coordinator.store.set(keys::ACCESS_TOKEN, "nearly-dead");
    coordinator.store.set(keys::REFRESH_TOKEN, "valid-refresh");
    coordinator.store.set(
        keys::EXPIRES_AT,
        &(Utc::now() + Duration::seconds(10)).to_rfc3339(),
    );

    let response = coordinator
        .authorized_call(&ApiRequest::get("/me"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(transport.send_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unauthenticated_requests_skip_token_handling() {
    let transport = MockTransport::default();
    let coordinator = coordinator(transport.clone());
    seed_expired_session(&coordinator.store);

    let mut request = ApiRequest::post("/auth/login", json!({ "email": "a@b.c" }));
    request.requires_auth = false;

    let response = coordinator.authorized_call(&request).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_logout_clears_local_state() {
    let transport = MockTransport::default();
    let coordinator = coordinator(transport);
    seed_live_session(&coordinator.store, "live-access");

    coordinator.logout().await;

    assert!(!coordinator.is_logged_in());
    assert_eq!(coordinator.store.get(keys::REFRESH_TOKEN), None);
}

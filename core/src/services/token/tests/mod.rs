//! Tests for the token lifecycle service

mod rotation_tests;

use std::sync::Arc;

use chrono::Utc;

use crate::repositories::MockTokenRepository;
use crate::services::identity::MockIdentityVerifier;

use super::{ManualClock, TokenService, TokenServiceConfig};

/// Test fixture bundling the service with handles to its collaborators
pub(crate) struct Fixture {
    pub service: Arc<TokenService<MockTokenRepository>>,
    pub repository: MockTokenRepository,
    pub identity: Arc<MockIdentityVerifier>,
    pub clock: Arc<ManualClock>,
}

pub(crate) fn fixture(config: TokenServiceConfig) -> Fixture {
    let repository = MockTokenRepository::new();
    let identity = Arc::new(MockIdentityVerifier::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let service = TokenService::new(
        repository.clone(),
        identity.clone(),
        config,
        clock.clone(),
    )
    .expect("service construction");

    Fixture {
        service: Arc::new(service),
        repository,
        identity,
        clock,
    }
}

pub(crate) fn default_fixture() -> Fixture {
    fixture(TokenServiceConfig {
        jwt_secret: "test-secret".to_string(),
        ..TokenServiceConfig::default()
    })
}

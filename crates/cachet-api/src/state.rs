//! Application state shared across handlers

use std::sync::Arc;

use cachet_engine::{AnchorWriter, CredentialIntake, RevocationLedger, VerificationResolver};
use cachet_persist::Storage;

use crate::auth::JwtAuth;

/// Shared handles for the engine components
#[derive(Clone)]
pub struct AppState {
    jwt_auth: JwtAuth,
    storage: Storage,
    intake: Arc<CredentialIntake>,
    resolver: Arc<VerificationResolver>,
    anchorer: Arc<AnchorWriter>,
    ledger: Arc<RevocationLedger>,
}

impl AppState {
    pub fn new(
        jwt_auth: JwtAuth,
        storage: Storage,
        intake: Arc<CredentialIntake>,
        resolver: Arc<VerificationResolver>,
        anchorer: Arc<AnchorWriter>,
        ledger: Arc<RevocationLedger>,
    ) -> Self {
        Self {
            jwt_auth,
            storage,
            intake,
            resolver,
            anchorer,
            ledger,
        }
    }

    pub fn jwt_auth(&self) -> &JwtAuth {
        &self.jwt_auth
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn intake(&self) -> Arc<CredentialIntake> {
        self.intake.clone()
    }

    pub fn resolver(&self) -> Arc<VerificationResolver> {
        self.resolver.clone()
    }

    pub fn anchorer(&self) -> Arc<AnchorWriter> {
        self.anchorer.clone()
    }

    pub fn ledger(&self) -> Arc<RevocationLedger> {
        self.ledger.clone()
    }
}

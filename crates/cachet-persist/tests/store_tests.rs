use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use cachet_core::{
    ActorRole, AnchorStatus, BlockchainAnchor, ChainName, ContentDigest, Credential,
    CredentialIssuer, CredentialStatus, Network, QrToken, RevocationEvent, TrustLevel,
    VerificationLog, VerificationOutcome, Visibility,
};
use cachet_persist::{Storage, StorageError};

fn sample_credential() -> Credential {
    Credential {
        id: Uuid::new_v4(),
        holder_id: Uuid::new_v4(),
        issuer_id: None,
        title: "Forklift Operator License".to_string(),
        description: Some("Class 3 counterbalance".to_string()),
        credential_type: Some("license".to_string()),
        category: Some("machinery".to_string()),
        issued_date: NaiveDate::from_ymd_opt(2025, 3, 10),
        expiry_date: NaiveDate::from_ymd_opt(2030, 3, 10),
        status: CredentialStatus::Active,
        trust_level: TrustLevel::SelfAsserted,
        visibility: Visibility::LinkOnly,
        qr_token: QrToken::generate(),
        content_hash: ContentDigest::digest(b"pdf bytes"),
        storage_path: "holder/1741600000-abc.pdf".to_string(),
        verification_count: 0,
        last_verified_at: None,
        revoked_at: None,
        revoked_by: None,
        revoked_reason: None,
        created_at: Utc::now(),
    }
}

fn pending_anchor(credential_id: Uuid) -> BlockchainAnchor {
    BlockchainAnchor {
        id: Uuid::new_v4(),
        credential_id,
        chain_name: ChainName::Polygon,
        network: Network::Testnet,
        registry_address: "0x1111111111111111111111111111111111111111".to_string(),
        transaction_hash: None,
        block_number: None,
        status: AnchorStatus::Pending,
        confirmed_at: None,
        confirmation_count: None,
        gas_used: None,
        error: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_credential_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let store = storage.credentials();

    let credential = sample_credential();
    store.insert(&credential).await?;

    let by_id = store.find_by_id(credential.id).await?.unwrap();
    assert_eq!(by_id.title, credential.title);
    assert_eq!(by_id.status, CredentialStatus::Active);
    assert_eq!(by_id.content_hash, credential.content_hash);
    assert_eq!(by_id.issued_date, credential.issued_date);

    let by_token = store
        .find_by_qr_token(credential.qr_token.as_str())
        .await?
        .unwrap();
    assert_eq!(by_token.id, credential.id);

    assert!(store.find_by_qr_token("no-such-token").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_qr_token_must_be_unique() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let store = storage.credentials();

    let first = sample_credential();
    store.insert(&first).await?;

    let mut second = sample_credential();
    second.qr_token = first.qr_token.clone();

    match store.insert(&second).await {
        Err(StorageError::AlreadyExists(_)) => {}
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_mark_revoked_keeps_first_metadata() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let store = storage.credentials();

    let credential = sample_credential();
    store.insert(&credential).await?;

    let holder = credential.holder_id;
    let admin = Uuid::new_v4();

    assert!(store.mark_revoked(credential.id, holder, Some("lost")).await?);
    assert!(store.mark_revoked(credential.id, admin, Some("fraud")).await?);

    let loaded = store.find_by_id(credential.id).await?.unwrap();
    assert_eq!(loaded.status, CredentialStatus::Revoked);
    assert_eq!(loaded.revoked_by, Some(holder));
    assert_eq!(loaded.revoked_reason.as_deref(), Some("lost"));
    assert!(loaded.revoked_at.is_some());

    assert!(!store.mark_revoked(Uuid::new_v4(), holder, None).await?);
    Ok(())
}

#[tokio::test]
async fn test_record_verification_increments() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let store = storage.credentials();

    let credential = sample_credential();
    store.insert(&credential).await?;

    store.record_verification(credential.id).await?;
    store.record_verification(credential.id).await?;

    let loaded = store.find_by_id(credential.id).await?.unwrap();
    assert_eq!(loaded.verification_count, 2);
    assert!(loaded.last_verified_at.is_some());
    Ok(())
}

#[tokio::test]
async fn test_set_trust_level() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let store = storage.credentials();

    let credential = sample_credential();
    store.insert(&credential).await?;

    assert!(store
        .set_trust_level(credential.id, TrustLevel::Reviewed)
        .await?);
    let loaded = store.find_by_id(credential.id).await?.unwrap();
    assert_eq!(loaded.trust_level, TrustLevel::Reviewed);
    Ok(())
}

#[tokio::test]
async fn test_anchor_unique_while_live() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let credentials = storage.credentials();
    let anchors = storage.anchors();

    let credential = sample_credential();
    credentials.insert(&credential).await?;

    let first = pending_anchor(credential.id);
    anchors.insert_pending(&first).await?;

    // A second live anchor for the same (credential, chain, network) loses
    // the race.
    let second = pending_anchor(credential.id);
    match anchors.insert_pending(&second).await {
        Err(StorageError::AlreadyExists(_)) => {}
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    // A failed anchor stops blocking retries.
    anchors.mark_failed(first.id, "execution reverted").await?;
    anchors.insert_pending(&pending_anchor(credential.id)).await?;
    Ok(())
}

#[tokio::test]
async fn test_anchor_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let credentials = storage.credentials();
    let anchors = storage.anchors();

    let credential = sample_credential();
    credentials.insert(&credential).await?;

    let anchor = pending_anchor(credential.id);
    anchors.insert_pending(&anchor).await?;

    anchors.set_transaction_hash(anchor.id, "0xabc123").await?;
    anchors
        .mark_confirmed(anchor.id, 4_200_000, 1, Some("21000"))
        .await?;

    let active = anchors
        .find_active(credential.id, ChainName::Polygon, Network::Testnet)
        .await?
        .unwrap();
    assert_eq!(active.id, anchor.id);
    assert_eq!(active.status, AnchorStatus::Confirmed);
    assert_eq!(active.transaction_hash.as_deref(), Some("0xabc123"));
    assert_eq!(active.block_number, Some(4_200_000));
    assert_eq!(active.gas_used.as_deref(), Some("21000"));
    assert!(active.confirmed_at.is_some());

    // Different network sees nothing.
    assert!(anchors
        .find_active(credential.id, ChainName::Polygon, Network::Mainnet)
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_anchor_placeholder_delete() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let credentials = storage.credentials();
    let anchors = storage.anchors();

    let credential = sample_credential();
    credentials.insert(&credential).await?;

    let anchor = pending_anchor(credential.id);
    anchors.insert_pending(&anchor).await?;

    assert!(anchors.delete(anchor.id).await?);
    assert!(!anchors.delete(anchor.id).await?);
    assert!(anchors
        .find_active(credential.id, ChainName::Polygon, Network::Testnet)
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_revocation_ledger_appends() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let credentials = storage.credentials();
    let revocations = storage.revocations();

    let credential = sample_credential();
    credentials.insert(&credential).await?;

    let event = RevocationEvent {
        id: Uuid::new_v4(),
        credential_id: credential.id,
        actor: credential.holder_id,
        actor_role: ActorRole::Holder,
        reason: Some("card reissued".to_string()),
        created_at: Utc::now(),
    };
    revocations.append(&event).await?;

    let again = RevocationEvent {
        id: Uuid::new_v4(),
        reason: None,
        actor_role: ActorRole::Admin,
        ..event.clone()
    };
    revocations.append(&again).await?;

    let history = revocations.list(credential.id).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].actor_role, ActorRole::Holder);
    assert_eq!(history[0].reason.as_deref(), Some("card reissued"));
    Ok(())
}

#[tokio::test]
async fn test_verification_log_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let credentials = storage.credentials();
    let logs = storage.verification_logs();

    let credential = sample_credential();
    credentials.insert(&credential).await?;

    let log = VerificationLog {
        id: Uuid::new_v4(),
        credential_id: credential.id,
        qr_token: credential.qr_token.as_str().to_string(),
        result: VerificationOutcome::Valid,
        hash_match: true,
        blockchain_verified: false,
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("curl/8.5".to_string()),
        referrer: None,
        created_at: Utc::now(),
    };
    logs.append(&log).await?;

    let recent = logs.recent(credential.id, 10).await?;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].result, VerificationOutcome::Valid);
    assert!(recent[0].hash_match);
    assert_eq!(recent[0].ip_address.as_deref(), Some("203.0.113.7"));
    Ok(())
}

#[tokio::test]
async fn test_issuer_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::memory().await?;
    let issuers = storage.issuers();

    let issuer = CredentialIssuer {
        id: Uuid::new_v4(),
        name: "Northfield Technical Institute".to_string(),
        logo_url: None,
        website_url: Some("https://nti.example.edu".to_string()),
        is_active: true,
        created_at: Utc::now(),
    };
    issuers.insert(&issuer).await?;

    let loaded = issuers.find_by_id(issuer.id).await?.unwrap();
    assert_eq!(loaded.name, issuer.name);
    assert!(loaded.is_active);

    assert!(issuers.find_by_id(Uuid::new_v4()).await?.is_none());
    Ok(())
}

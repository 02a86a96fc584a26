//! API routes for the credential lifecycle

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::OpenApi;
use uuid::Uuid;

use cachet_core::{
    ActorRole, Credential, CredentialStatus, PublicCredential, TrustLevel, VerificationReport,
    Visibility,
};
use cachet_engine::{AnchorOutcome, NewCredential};

use crate::auth::Claims;
use crate::error::{ApiError, ApiResult};
use crate::middleware::request_meta;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

static STARTED: std::sync::LazyLock<std::time::Instant> =
    std::sync::LazyLock::new(std::time::Instant::now);

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Liveness check", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.storage().is_healthy().await {
        "healthy"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: STARTED.elapsed().as_secs(),
        timestamp: chrono::Utc::now(),
    })
}

/// Owner-facing credential view. Unlike [`PublicCredential`] this includes
/// the qr token and bookkeeping; it is only ever returned to authenticated
/// holders.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CredentialResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub credential_type: Option<String>,
    pub category: Option<String>,
    pub issuer_id: Option<Uuid>,
    pub issued_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub status: CredentialStatus,
    pub trust_level: TrustLevel,
    pub visibility: Visibility,
    pub qr_token: String,
    pub content_hash: String,
    pub verification_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Credential> for CredentialResponse {
    fn from(c: &Credential) -> Self {
        Self {
            id: c.id,
            title: c.title.clone(),
            description: c.description.clone(),
            credential_type: c.credential_type.clone(),
            category: c.category.clone(),
            issuer_id: c.issuer_id,
            issued_date: c.issued_date,
            expiry_date: c.expiry_date,
            status: c.status,
            trust_level: c.trust_level,
            visibility: c.visibility,
            qr_token: c.qr_token.as_str().to_string(),
            content_hash: c.content_hash.to_hex(),
            verification_count: c.verification_count,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct VerifyParams {
    /// The credential's public qr token
    pub token: Option<String>,
}

/// Public verification response
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerifyResponse {
    pub credential: PublicCredential,
    pub verification: VerificationReport,
}

/// Verify a credential by its public token.
///
/// Unauthenticated by design. Unknown tokens and private credentials
/// produce byte-identical 404 responses, and internal failures are mapped
/// to the same 404 rather than leaking anything to an anonymous caller.
#[utoipa::path(
    get,
    path = "/api/v1/verify",
    params(VerifyParams),
    responses(
        (status = 200, description = "Verification verdict", body = VerifyResponse),
        (status = 400, description = "Missing token"),
        (status = 404, description = "Token unresolvable")
    )
)]
pub async fn verify_credential(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
    headers: HeaderMap,
) -> ApiResult<Json<VerifyResponse>> {
    let token = params
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("token query parameter is required".to_string()))?;

    let meta = request_meta(&headers);

    match state.resolver().verify(token, &meta).await {
        Ok(Some((credential, verification))) => Ok(Json(VerifyResponse {
            credential,
            verification,
        })),
        Ok(None) => Err(not_found()),
        Err(e) => {
            tracing::error!(error = %e, "verification failed internally");
            Err(not_found())
        }
    }
}

/// The one 404 the public endpoint ever produces
fn not_found() -> ApiError {
    ApiError::NotFound("credential not found".to_string())
}

/// Upload response
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub credential: CredentialResponse,
    /// Public verification key; embed in the shared QR code
    pub qr_token: String,
}

/// Upload a credential file plus its claim metadata (multipart form).
///
/// Fields: `file` (required), `title` (required), `description`,
/// `credential_type`, `category`, `issuer_id`, `issued_date`,
/// `expiry_date` (ISO dates), `visibility`.
#[utoipa::path(
    post,
    path = "/api/v1/credentials",
    responses(
        (status = 201, description = "Credential created", body = UploadResponse),
        (status = 400, description = "Malformed form field"),
        (status = 422, description = "Missing title or file")
    ),
    security(("jwt" = []))
)]
pub async fn upload_credential(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let holder_id = claims.user_id()?;
    let new = parse_upload(holder_id, multipart).await?;

    let credential = state.intake().upload(new).await?;
    let qr_token = credential.qr_token.as_str().to_string();

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            credential: CredentialResponse::from(&credential),
            qr_token,
        }),
    ))
}

async fn parse_upload(holder_id: Uuid, mut multipart: Multipart) -> ApiResult<NewCredential> {
    let mut new = NewCredential {
        holder_id,
        title: String::new(),
        description: None,
        credential_type: None,
        category: None,
        issuer_id: None,
        issued_date: None,
        expiry_date: None,
        visibility: None,
        file_name: String::new(),
        bytes: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                new.file_name = field.file_name().unwrap_or("upload.bin").to_string();
                new.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read file: {e}")))?
                    .to_vec();
            }
            "title" => new.title = text(field).await?,
            "description" => new.description = Some(text(field).await?),
            "credential_type" => new.credential_type = Some(text(field).await?),
            "category" => new.category = Some(text(field).await?),
            "issuer_id" => {
                let raw = text(field).await?;
                new.issuer_id = Some(Uuid::parse_str(&raw).map_err(|_| {
                    ApiError::BadRequest(format!("issuer_id is not a valid uuid: {raw}"))
                })?);
            }
            "issued_date" => new.issued_date = Some(date(&name, field).await?),
            "expiry_date" => new.expiry_date = Some(date(&name, field).await?),
            "visibility" => {
                let raw = text(field).await?;
                new.visibility = Some(Visibility::parse(&raw).ok_or_else(|| {
                    ApiError::BadRequest(format!("unknown visibility: {raw}"))
                })?);
            }
            other => {
                tracing::debug!(field = %other, "ignoring unknown upload field");
            }
        }
    }

    Ok(new)
}

async fn text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read field: {e}")))
}

async fn date(name: &str, field: axum::extract::multipart::Field<'_>) -> ApiResult<NaiveDate> {
    let raw = text(field).await?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{name} must be YYYY-MM-DD, got {raw}")))
}

/// Anchor a credential on the configured chain.
#[utoipa::path(
    post,
    path = "/api/v1/credentials/{id}/anchor",
    params(("id" = Uuid, Path, description = "Credential ID")),
    responses(
        (status = 200, description = "Anchor outcome"),
        (status = 403, description = "Not the holder"),
        (status = 404, description = "Credential not found"),
        (status = 409, description = "Registry rejected the transaction")
    ),
    security(("jwt" = []))
)]
pub async fn anchor_credential(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnchorOutcome>> {
    let credential = load_owned(&state, &claims, id).await?;
    let outcome = state.anchorer().anchor(credential.id).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RevokeRequest {
    pub reason: Option<String>,
}

/// Revoke a credential. Holders can revoke their own; issuers and admins
/// can revoke any.
#[utoipa::path(
    post,
    path = "/api/v1/credentials/{id}/revoke",
    params(("id" = Uuid, Path, description = "Credential ID")),
    request_body = RevokeRequest,
    responses(
        (status = 200, description = "Credential revoked", body = CredentialResponse),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Credential not found")
    ),
    security(("jwt" = []))
)]
pub async fn revoke_credential(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RevokeRequest>,
) -> ApiResult<Json<CredentialResponse>> {
    let actor = claims.user_id()?;
    let actor_role = ActorRole::parse(&claims.role)
        .ok_or_else(|| ApiError::Forbidden(format!("unknown role: {}", claims.role)))?;

    if actor_role == ActorRole::Holder {
        // Holders may only revoke what they own
        load_owned(&state, &claims, id).await?;
    }

    let (credential, _event) = state
        .ledger()
        .revoke(id, actor, actor_role, req.reason)
        .await?;

    Ok(Json(CredentialResponse::from(&credential)))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TrustRequest {
    pub trust_level: TrustLevel,
}

/// Move a credential's trust level (reviewer operation).
#[utoipa::path(
    patch,
    path = "/api/v1/credentials/{id}/trust",
    params(("id" = Uuid, Path, description = "Credential ID")),
    request_body = TrustRequest,
    responses(
        (status = 200, description = "Trust level updated", body = CredentialResponse),
        (status = 403, description = "Reviewer access required"),
        (status = 404, description = "Credential not found")
    ),
    security(("jwt" = []))
)]
pub async fn set_trust_level(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TrustRequest>,
) -> ApiResult<Json<CredentialResponse>> {
    if !claims.has_role("admin") {
        return Err(ApiError::Forbidden("Reviewer access required".to_string()));
    }

    let credential = state
        .intake()
        .set_trust_level(id, req.trust_level, true)
        .await?;

    Ok(Json(CredentialResponse::from(&credential)))
}

/// Load a credential and enforce holder ownership (admins bypass)
async fn load_owned(state: &AppState, claims: &Claims, id: Uuid) -> ApiResult<Credential> {
    let credential = state
        .storage()
        .credentials()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("credential {id}")))?;

    if !claims.has_role("admin") && credential.holder_id != claims.user_id()? {
        return Err(ApiError::Forbidden(
            "credential belongs to another holder".to_string(),
        ));
    }

    Ok(credential)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        verify_credential,
        upload_credential,
        anchor_credential,
        revoke_credential,
        set_trust_level,
    ),
    components(
        schemas(
            HealthResponse,
            VerifyResponse,
            CredentialResponse,
            UploadResponse,
            RevokeRequest,
            TrustRequest,
            PublicCredential,
            VerificationReport,
            cachet_core::IssuerSummary,
            cachet_core::VerificationOutcome,
            CredentialStatus,
            TrustLevel,
            Visibility,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

/// Build the API router
pub fn api_router(state: AppState) -> Router {
    use utoipa_swagger_ui::SwaggerUi;

    // Pin the uptime baseline to router construction, not the first probe
    std::sync::LazyLock::force(&STARTED);

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public endpoints
        .route("/health", get(health))
        .route("/api/v1/verify", get(verify_credential))
        // Authenticated credential lifecycle
        .route("/api/v1/credentials", post(upload_credential))
        .route("/api/v1/credentials/{id}/anchor", post(anchor_credential))
        .route("/api/v1/credentials/{id}/revoke", post(revoke_credential))
        .route("/api/v1/credentials/{id}/trust", patch(set_trust_level))
        .with_state(state)
}

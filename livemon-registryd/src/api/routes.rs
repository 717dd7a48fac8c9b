use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use shared::protocol::{
    DnsQueryRequest, DnsUpsertRequest, RegisterRequest, StatusEntry, StatusQuery, UpsertResponse,
    API_DNS_ADD, API_DNS_DELETE, API_DNS_GET, API_DNS_UPDATE, API_SRV_REG, API_SRV_RENEW,
};
use shared::types::{RegisteredService, ServiceStatus};

use crate::api::error::ApiError;
use crate::config::{Config, ZoneBinding};
use crate::dns::cloudflare::CloudflareApi;
use crate::dns::failover;
use crate::store::table::RegisterOutcome;
use crate::store_manager::StoreHandle;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    pub dns: CloudflareApi,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status_query).post(status_report))
        .route(API_SRV_REG, post(register_service))
        .route(API_SRV_RENEW, post(register_service))
        .route(API_DNS_UPDATE, post(upsert_dns_record))
        .route(API_DNS_ADD, post(upsert_dns_record))
        .route(API_DNS_GET, get(get_dns_records_query).post(get_dns_records_body))
        .route(
            API_DNS_DELETE,
            get(delete_dns_record_query).post(delete_dns_record_body),
        )
        .with_state(state)
}

impl AppState {
    fn token_valid(&self, token: Option<&str>) -> bool {
        token == Some(self.config.auth.access_token.as_str())
    }

    fn require_token(&self, token: Option<&str>) -> Result<(), ApiError> {
        if self.token_valid(token) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    fn zone(&self, domain: &str) -> Result<&ZoneBinding, ApiError> {
        self.config.zone_for(domain).ok_or(ApiError::ZoneNotFound)
    }
}

async fn register_service(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<Value>, ApiError> {
    state.require_token(Some(req.token.as_str()))?;

    let outcome = state
        .store
        .register(req.name, req.service_type, req.valid, req.description, req.data)
        .await
        .map_err(ApiError::Store)?;

    let result = match outcome {
        RegisterOutcome::Registered => "registered",
        RegisterOutcome::Renewed => "renewed",
        RegisterOutcome::Updated => "updated",
        RegisterOutcome::TypeConflict => return Err(ApiError::TypeConflict),
    };
    Ok(Json(json!({ "result": result })))
}

async fn status_query(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<BTreeMap<String, StatusEntry>>, ApiError> {
    service_status(state, query).await
}

async fn status_report(
    State(state): State<AppState>,
    Json(query): Json<StatusQuery>,
) -> Result<Json<BTreeMap<String, StatusEntry>>, ApiError> {
    service_status(state, query).await
}

/// Status map over all known services. An invalid or absent token yields the
/// reduced view rather than an error.
async fn service_status(
    state: AppState,
    query: StatusQuery,
) -> Result<Json<BTreeMap<String, StatusEntry>>, ApiError> {
    let authenticated = state.token_valid(query.token.as_deref());
    let now = chrono::Utc::now().timestamp();

    let snapshot = state.store.snapshot().await.map_err(ApiError::Store)?;
    let entries = snapshot
        .into_iter()
        .map(|srv| {
            let name = srv.name.clone();
            (name, status_entry(srv, now, authenticated))
        })
        .collect();

    Ok(Json(entries))
}

fn status_entry(srv: RegisteredService, now: i64, authenticated: bool) -> StatusEntry {
    let status = ServiceStatus::derive(srv.valid, srv.valid_until, now);
    let create_time = authenticated.then(|| srv.create_time_display());
    StatusEntry {
        service_type: srv.service_type,
        description: srv.description,
        status: status.as_str().to_string(),
        create_time,
        data: authenticated.then_some(srv.data),
    }
}

async fn upsert_dns_record(
    State(state): State<AppState>,
    Json(req): Json<DnsUpsertRequest>,
) -> Result<Json<UpsertResponse>, ApiError> {
    state.require_token(Some(req.token.as_str()))?;
    let zone = state.zone(&req.domain)?;
    if failover::require_edit(zone).is_err() {
        return Err(ApiError::EditForbidden);
    }
    let ttl = failover::validate_ttl(req.ttl).map_err(ApiError::InvalidTtl)?;

    let response = failover::upsert_record(&state.dns, zone, &req, ttl)
        .await
        .map_err(ApiError::Provider)?;

    tracing::info!(
        domain = %req.domain,
        kind = ?response.kind,
        "DNS record reconciled"
    );
    Ok(Json(response))
}

async fn get_dns_records_query(
    State(state): State<AppState>,
    Query(req): Query<DnsQueryRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
    get_dns_records(state, req).await
}

async fn get_dns_records_body(
    State(state): State<AppState>,
    Json(req): Json<DnsQueryRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
    get_dns_records(state, req).await
}

async fn get_dns_records(
    state: AppState,
    req: DnsQueryRequest,
) -> Result<Json<Vec<Value>>, ApiError> {
    state.require_token(req.token.as_deref())?;
    let zone = state.zone(&req.domain)?;

    let records = state
        .dns
        .list_records(zone)
        .await
        .map_err(ApiError::Provider)?;
    Ok(Json(records))
}

async fn delete_dns_record_query(
    State(state): State<AppState>,
    Query(req): Query<DnsQueryRequest>,
) -> Result<Json<Value>, ApiError> {
    delete_dns_record(state, req).await
}

async fn delete_dns_record_body(
    State(state): State<AppState>,
    Json(req): Json<DnsQueryRequest>,
) -> Result<Json<Value>, ApiError> {
    delete_dns_record(state, req).await
}

async fn delete_dns_record(
    state: AppState,
    req: DnsQueryRequest,
) -> Result<Json<Value>, ApiError> {
    state.require_token(req.token.as_deref())?;
    let zone = state.zone(&req.domain)?;
    if failover::require_edit(zone).is_err() {
        return Err(ApiError::EditForbidden);
    }

    let result = failover::delete_record(&state.dns, zone, &req.domain)
        .await
        .map_err(ApiError::Provider)?
        .ok_or(ApiError::RecordNotFound)?;

    tracing::info!(domain = %req.domain, "DNS record deleted");
    Ok(Json(result))
}

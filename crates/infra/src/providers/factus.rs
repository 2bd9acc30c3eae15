//! Factus electronic invoicing provider
//!
//! Authenticates with the OAuth password grant and caches one token per
//! credential set, refreshing it shortly before it expires. Cache reads never
//! wait on the network; a refresh holds only its own credential set's lock,
//! so concurrent callers with the same credentials share one token request. Invoice issuance is driven by the invoicing fabric through
//! [`InvoiceIssuer`]; every HTTP exchange is captured for the audit trail.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use integrahub_core::{
    IntegrationProvider, InvoiceIssuer, IssueContext, IssueFailure, IssueOutcome, IssuedInvoice,
};
use integrahub_domain::constants::invoice_error_codes;
use integrahub_domain::{AuditRecord, CredentialMap, HubError, InvoiceRequest, JsonMap, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::http::{HttpClient, HttpExchange};

pub const PROVIDER_KEY: &str = "factus";
pub const DEFAULT_BASE_URL: &str = "https://api-sandbox.factus.com.co";

const TOKEN_PATH: &str = "/oauth/token";
const BILLS_PATH: &str = "/v1/bills/validate";
const TOKEN_REFRESH_SKEW: Duration = Duration::from_secs(60);
const REQUIRED_CREDENTIALS: &[&str] = &["client_id", "client_secret", "username", "password"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FactusCredentials {
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
}

impl FactusCredentials {
    fn from_map(credentials: &CredentialMap) -> std::result::Result<Self, String> {
        let field = |name: &str| {
            credentials
                .get(name)
                .and_then(Value::as_str)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(|| format!("credential '{name}' is required"))
        };
        Ok(Self {
            client_id: field("client_id")?,
            client_secret: field("client_secret")?,
            username: field("username")?,
            password: field("password")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Token request outcome; `exchange` is `None` when served from cache.
struct TokenGrant {
    access_token: String,
    exchange: Option<HttpExchange>,
}

struct TokenFailure {
    failure: IssueFailure,
    audit: Option<AuditRecord>,
}

type TokenKey = (String, FactusCredentials);

pub struct FactusProvider {
    http: HttpClient,
    default_base_url: String,
    tokens: Mutex<HashMap<TokenKey, CachedToken>>,
    refresh_locks: Mutex<HashMap<TokenKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl FactusProvider {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    /// Use `base_url` when neither the integration nor its type name one.
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            default_base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: Mutex::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    fn resolve_base_url<'a>(&'a self, configured: Option<&'a str>) -> &'a str {
        configured
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.default_base_url)
    }

    /// Cached bearer token for `credentials`, fetching a fresh one when absent
    /// or within the refresh skew of expiry.
    async fn access_token(
        &self,
        base_url: &str,
        credentials: &FactusCredentials,
    ) -> std::result::Result<TokenGrant, TokenFailure> {
        let key = (base_url.to_string(), credentials.clone());
        if let Some(grant) = self.cached_token(&key) {
            return Ok(grant);
        }

        let refresh_lock = Arc::clone(self.refresh_locks.lock().entry(key.clone()).or_default());
        let _refreshing = refresh_lock.lock().await;
        // A concurrent caller may have refreshed while we waited.
        if let Some(grant) = self.cached_token(&key) {
            return Ok(grant);
        }

        let url = format!("{base_url}{TOKEN_PATH}");
        let form = [
            ("grant_type", "password"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let builder = self
            .http
            .request(Method::POST, &url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form);
        let audited_payload =
            json!({ "grant_type": "password", "client_id": credentials.client_id, "username": credentials.username })
                .to_string();

        let exchange = self.http.capture(builder, audited_payload).await.map_err(|err| TokenFailure {
            failure: IssueFailure::new(invoice_error_codes::PROVIDER_UNAVAILABLE, err.to_string()),
            audit: None,
        })?;

        if !exchange.is_success() {
            return Err(TokenFailure {
                failure: failure_for_status(exchange.status, &exchange.body, "token request"),
                audit: Some(exchange.audit),
            });
        }

        let token: TokenResponse = exchange.json().map_err(|err| TokenFailure {
            failure: IssueFailure::new(invoice_error_codes::PROVIDER_UNAVAILABLE, err.to_string()),
            audit: Some(exchange.audit.clone()),
        })?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        self.tokens.lock().insert(
            key,
            CachedToken {
                access_token: token.access_token.clone(),
                refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_SKEW),
            },
        );
        debug!(client_id = %credentials.client_id, "factus token refreshed");

        Ok(TokenGrant { access_token: token.access_token, exchange: Some(exchange) })
    }

    fn cached_token(&self, key: &TokenKey) -> Option<TokenGrant> {
        self.tokens
            .lock()
            .get(key)
            .filter(|cached| Instant::now() < cached.refresh_at)
            .map(|cached| TokenGrant { access_token: cached.access_token.clone(), exchange: None })
    }

    fn forget_token(&self, base_url: &str, credentials: &FactusCredentials) {
        self.tokens.lock().remove(&(base_url.to_string(), credentials.clone()));
    }
}

impl std::fmt::Debug for FactusProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactusProvider").field("default_base_url", &self.default_base_url).finish()
    }
}

/// Vendor payload for one bill.
fn bill_payload(request: &InvoiceRequest, config: &JsonMap) -> Value {
    let data = &request.invoice_data;
    let items: Vec<Value> = data
        .items
        .iter()
        .map(|item| {
            json!({
                "code_reference": item.sku,
                "name": item.name,
                "quantity": item.quantity,
                "price": item.unit_price,
                "discount": item.discount,
                "tax_rate": item.tax_rate.unwrap_or(0.0),
            })
        })
        .collect();

    json!({
        "reference_code": data.order_id,
        "numbering_range_id": config.get("numbering_range_id").cloned().unwrap_or(Value::Null),
        "observation": config.get("observation").cloned().unwrap_or(Value::Null),
        "customer": {
            "identification": data.customer.dni,
            "names": data.customer.name,
            "email": data.customer.email,
            "phone": data.customer.phone,
            "address": data.customer.address,
        },
        "items": items,
        "currency": data.currency,
        "shipping_cost": data.shipping_cost,
    })
}

fn vendor_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn failure_for_status(status: u16, body: &str, what: &str) -> IssueFailure {
    let detail = vendor_message(body).unwrap_or_else(|| format!("{what} returned HTTP {status}"));
    let code = match status {
        401 | 403 => invoice_error_codes::AUTHENTICATION_FAILED,
        400..=499 => invoice_error_codes::PROVIDER_REJECTED,
        _ => invoice_error_codes::PROVIDER_UNAVAILABLE,
    };
    IssueFailure::new(code, detail)
}

fn issued_from(body: &Value) -> Option<IssuedInvoice> {
    let bill = body.pointer("/data/bill")?;
    let invoice_number = bill.get("number").and_then(Value::as_str)?.to_string();
    Some(IssuedInvoice {
        invoice_number,
        external_id: bill.get("cufe").and_then(Value::as_str).map(str::to_string),
        issued_at: Utc::now(),
    })
}

#[async_trait]
impl IntegrationProvider for FactusProvider {
    fn name(&self) -> &str {
        PROVIDER_KEY
    }

    #[instrument(skip_all, fields(provider = PROVIDER_KEY))]
    async fn test_connection(&self, config: &JsonMap, credentials: &CredentialMap) -> Result<()> {
        let credentials = FactusCredentials::from_map(credentials).map_err(HubError::Validation)?;
        let base_url = self.resolve_base_url(config.get("base_url").and_then(Value::as_str));

        match self.access_token(base_url, &credentials).await {
            Ok(_) => Ok(()),
            Err(TokenFailure { failure, .. }) => {
                if failure.error_code == invoice_error_codes::PROVIDER_UNAVAILABLE {
                    Err(HubError::Network(failure.message))
                } else {
                    Err(HubError::TestFailed(failure.message))
                }
            }
        }
    }
}

#[async_trait]
impl InvoiceIssuer for FactusProvider {
    fn provider(&self) -> &str {
        PROVIDER_KEY
    }

    fn required_credentials(&self) -> &[&str] {
        REQUIRED_CREDENTIALS
    }

    #[instrument(skip_all, fields(provider = PROVIDER_KEY, invoice_id = context.request.invoice_id))]
    async fn issue(&self, context: &IssueContext) -> IssueOutcome {
        let credentials = match FactusCredentials::from_map(&context.credentials) {
            Ok(credentials) => credentials,
            Err(message) => {
                return IssueOutcome {
                    result: Err(IssueFailure::new(invoice_error_codes::MISSING_CREDENTIALS, message)),
                    audit: None,
                }
            }
        };
        let base_url = self.resolve_base_url(context.base_url()).to_string();

        let grant = match self.access_token(&base_url, &credentials).await {
            Ok(grant) => grant,
            Err(TokenFailure { failure, audit }) => {
                warn!(error_code = %failure.error_code, "factus authentication failed");
                return IssueOutcome { result: Err(failure), audit };
            }
        };
        let token_audit = grant.exchange.map(|exchange| exchange.audit);

        let payload = bill_payload(&context.request, &context.config);
        let builder = self
            .http
            .request(Method::POST, format!("{base_url}{BILLS_PATH}"))
            .bearer_auth(&grant.access_token)
            .header(reqwest::header::ACCEPT, "application/json");

        let exchange = match self.http.exchange(builder, Some(&payload)).await {
            Ok(exchange) => exchange,
            Err(err) => {
                warn!(error = %err, "factus bill request failed");
                return IssueOutcome {
                    result: Err(IssueFailure::new(
                        invoice_error_codes::PROVIDER_UNAVAILABLE,
                        err.to_string(),
                    )),
                    audit: token_audit,
                };
            }
        };

        if exchange.status == 401 {
            self.forget_token(&base_url, &credentials);
        }

        let result = if exchange.is_success() {
            exchange
                .json::<Value>()
                .ok()
                .as_ref()
                .and_then(issued_from)
                .ok_or_else(|| {
                    IssueFailure::new(
                        invoice_error_codes::PROVIDER_REJECTED,
                        "bill response carries no invoice number",
                    )
                })
        } else {
            Err(failure_for_status(exchange.status, &exchange.body, "bill request"))
        };

        match &result {
            Ok(issued) => info!(invoice_number = %issued.invoice_number, "factus invoice issued"),
            Err(failure) => warn!(error_code = %failure.error_code, status = exchange.status, "factus rejected invoice"),
        }

        IssueOutcome { result, audit: Some(exchange.audit) }
    }
}

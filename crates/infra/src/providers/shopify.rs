//! Shopify e-commerce provider
//!
//! Talks to the Admin REST API of the integration's shop with the tenant's
//! `access_token`. Webhook registration is idempotent per callback URL:
//! existing subscriptions pointing at exactly that URL are removed before
//! the topics are subscribed again.

use std::sync::Arc;

use async_trait::async_trait;
use integrahub_core::{IntegrationLookup, IntegrationProvider};
use integrahub_domain::constants::ACCESS_TOKEN_FIELD;
use integrahub_domain::{
    CredentialMap, HubError, Integration, IntegrationId, JsonMap, RemoteWebhook,
    Result, WebhookInfo,
};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::errors::status_to_error;
use crate::http::HttpClient;

pub const PROVIDER_KEY: &str = "shopify";
pub const DEFAULT_API_VERSION: &str = "2024-10";
const TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Order and lifecycle topics the hub subscribes to.
pub const WEBHOOK_TOPICS: &[&str] =
    &["orders/create", "orders/updated", "orders/paid", "orders/cancelled", "app/uninstalled"];

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    webhook: ShopifyWebhook,
}

#[derive(Debug, Deserialize)]
struct WebhookList {
    #[serde(default)]
    webhooks: Vec<ShopifyWebhook>,
}

#[derive(Debug, Deserialize)]
struct ShopifyWebhook {
    id: u64,
    address: String,
    topic: String,
}

impl From<ShopifyWebhook> for RemoteWebhook {
    fn from(hook: ShopifyWebhook) -> Self {
        // Shopify keeps one subscription per topic.
        RemoteWebhook { id: hook.id.to_string(), url: hook.address, events: vec![hook.topic] }
    }
}

/// Callback URL for one integration under `base_url`.
pub fn callback_url(base_url: &str, integration_id: IntegrationId) -> String {
    format!("{}/integrations/shopify/webhook/{integration_id}", base_url.trim_end_matches('/'))
}

/// Admin API root for a shop. Values with a scheme are used verbatim.
fn admin_root(shop: &str, api_version: &str) -> String {
    let shop = shop.trim().trim_end_matches('/');
    let origin = if shop.starts_with("http://") || shop.starts_with("https://") {
        shop.to_string()
    } else {
        format!("https://{shop}")
    };
    format!("{origin}/admin/api/{api_version}")
}

struct ShopSession {
    root: String,
    access_token: String,
}

pub struct ShopifyProvider {
    http: HttpClient,
    lookup: Arc<dyn IntegrationLookup>,
}

impl ShopifyProvider {
    pub fn new(http: HttpClient, lookup: Arc<dyn IntegrationLookup>) -> Self {
        Self { http, lookup }
    }

    fn session_from(
        config: &JsonMap,
        store_id: Option<&str>,
        credentials: &CredentialMap,
    ) -> Result<ShopSession> {
        let shop = config
            .get("shop_domain")
            .and_then(Value::as_str)
            .or(store_id)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| HubError::Validation("shop_domain is required".into()))?;
        let api_version =
            config.get("api_version").and_then(Value::as_str).unwrap_or(DEFAULT_API_VERSION);
        let access_token = credentials
            .get(ACCESS_TOKEN_FIELD)
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                HubError::AccessTokenNotFound(format!("credentials have no '{ACCESS_TOKEN_FIELD}'"))
            })?;

        Ok(ShopSession { root: admin_root(shop, api_version), access_token: access_token.to_string() })
    }

    async fn session(&self, integration_id: IntegrationId) -> Result<ShopSession> {
        let integration: Integration = self.lookup.integration(integration_id).await?;
        let credentials = self.lookup.credentials(integration_id).await?;
        Self::session_from(&integration.config, integration.store_id.as_deref(), &credentials)
    }

    fn request(&self, session: &ShopSession, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", session.root))
            .header(TOKEN_HEADER, &session.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn fetch_webhooks(&self, session: &ShopSession) -> Result<Vec<RemoteWebhook>> {
        let exchange = self
            .http
            .exchange::<Value>(self.request(session, Method::GET, "/webhooks.json"), None)
            .await?;
        if !exchange.is_success() {
            return Err(status_to_error(exchange.status, "listing shopify webhooks"));
        }
        let list: WebhookList = exchange.json()?;
        Ok(list.webhooks.into_iter().map(RemoteWebhook::from).collect())
    }

    async fn remove_webhook(&self, session: &ShopSession, webhook_id: &str) -> Result<()> {
        let path = format!("/webhooks/{webhook_id}.json");
        let exchange =
            self.http.exchange::<Value>(self.request(session, Method::DELETE, &path), None).await?;
        if !exchange.is_success() {
            return Err(status_to_error(exchange.status, &format!("deleting shopify webhook {webhook_id}")));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ShopifyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl IntegrationProvider for ShopifyProvider {
    fn name(&self) -> &str {
        PROVIDER_KEY
    }

    #[instrument(skip_all, fields(provider = PROVIDER_KEY))]
    async fn test_connection(&self, config: &JsonMap, credentials: &CredentialMap) -> Result<()> {
        let store_id = config.get("store_id").and_then(Value::as_str);
        let session = Self::session_from(config, store_id, credentials)?;
        let exchange =
            self.http.exchange::<Value>(self.request(&session, Method::GET, "/shop.json"), None).await?;

        if exchange.is_success() {
            debug!(root = %session.root, "shopify shop reachable");
            return Ok(());
        }
        match exchange.status {
            401 | 403 => Err(HubError::TestFailed("shopify rejected the access token".into())),
            404 => Err(HubError::TestFailed(format!("shop not found at {}", session.root))),
            status => Err(status_to_error(status, "shopify shop.json")),
        }
    }

    async fn get_webhook_url(&self, base_url: &str, integration_id: IntegrationId) -> Result<WebhookInfo> {
        Ok(WebhookInfo {
            url: callback_url(base_url, integration_id),
            method: "POST".into(),
            description: "Shopify order and app lifecycle notifications".into(),
            events: WEBHOOK_TOPICS.iter().map(|t| (*t).to_string()).collect(),
        })
    }

    #[instrument(skip(self), fields(provider = PROVIDER_KEY))]
    async fn list_webhooks(&self, integration_id: IntegrationId) -> Result<Vec<RemoteWebhook>> {
        let session = self.session(integration_id).await?;
        self.fetch_webhooks(&session).await
    }

    #[instrument(skip(self), fields(provider = PROVIDER_KEY))]
    async fn create_webhook(&self, integration_id: IntegrationId, base_url: &str) -> Result<Value> {
        let session = self.session(integration_id).await?;
        let url = callback_url(base_url, integration_id);

        let stale: Vec<RemoteWebhook> = self
            .fetch_webhooks(&session)
            .await?
            .into_iter()
            .filter(|hook| hook.url == url)
            .collect();
        for hook in &stale {
            self.remove_webhook(&session, &hook.id).await?;
        }
        if !stale.is_empty() {
            info!(integration_id, removed = stale.len(), "replaced existing shopify webhooks");
        }

        let mut created = Vec::with_capacity(WEBHOOK_TOPICS.len());
        for topic in WEBHOOK_TOPICS {
            let payload = json!({ "webhook": { "topic": topic, "address": url, "format": "json" } });
            let exchange = self
                .http
                .exchange(self.request(&session, Method::POST, "/webhooks.json"), Some(&payload))
                .await?;
            if !exchange.is_success() {
                warn!(integration_id, topic, status = exchange.status, "shopify webhook subscription failed");
                return Err(status_to_error(exchange.status, &format!("subscribing {topic}")));
            }
            let envelope: WebhookEnvelope = exchange.json()?;
            created.push(json!({
                "id": envelope.webhook.id.to_string(),
                "topic": envelope.webhook.topic,
                "address": envelope.webhook.address,
            }));
        }

        Ok(json!({ "url": url, "deleted": stale.len(), "created": created }))
    }

    #[instrument(skip(self), fields(provider = PROVIDER_KEY))]
    async fn delete_webhook(&self, integration_id: IntegrationId, webhook_id: &str) -> Result<()> {
        let session = self.session(integration_id).await?;
        self.remove_webhook(&session, webhook_id).await
    }

    async fn verify_webhooks_by_url(
        &self,
        integration_id: IntegrationId,
        base_url: &str,
    ) -> Result<Vec<RemoteWebhook>> {
        let session = self.session(integration_id).await?;
        let prefix = base_url.trim_end_matches('/');
        Ok(self
            .fetch_webhooks(&session)
            .await?
            .into_iter()
            .filter(|hook| hook.url.starts_with(prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_root_adds_scheme_only_when_missing() {
        assert_eq!(admin_root("acme.myshopify.com", "2024-10"), "https://acme.myshopify.com/admin/api/2024-10");
        assert_eq!(admin_root("http://127.0.0.1:9000/", "2024-10"), "http://127.0.0.1:9000/admin/api/2024-10");
    }

    #[test]
    fn callback_url_trims_trailing_slash() {
        assert_eq!(callback_url("https://hub.example/", 9), "https://hub.example/integrations/shopify/webhook/9");
    }

    #[test]
    fn session_requires_shop_and_token() {
        let empty = JsonMap::new();
        let token = json!({ "access_token": "shpat" }).as_object().cloned().unwrap();
        assert!(matches!(ShopifyProvider::session_from(&empty, None, &token), Err(HubError::Validation(_))));

        let config = json!({ "shop_domain": "acme.myshopify.com" }).as_object().cloned().unwrap();
        assert!(matches!(
            ShopifyProvider::session_from(&config, None, &CredentialMap::new()),
            Err(HubError::AccessTokenNotFound(_))
        ));
        let session = ShopifyProvider::session_from(&empty, Some("acme.myshopify.com"), &token).unwrap();
        assert_eq!(session.access_token, "shpat");
    }
}

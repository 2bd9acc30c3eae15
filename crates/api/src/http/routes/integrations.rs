//! `/integrations` handlers

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use integrahub_domain::{
    BusinessId, CreateIntegrationRequest, Integration, IntegrationFilters, IntegrationId,
    TestConnectionRequest, UpdateIntegrationRequest,
};
use serde::Deserialize;
use tracing::info;

use crate::context::AppContext;
use crate::http::caller::Caller;
use crate::http::envelope::{acknowledge, respond, ApiJson, ApiPath, ApiQuery};
use crate::http::error::ApiResult;

type Ctx = State<Arc<AppContext>>;

#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    #[serde(default)]
    pub business_id: Option<BusinessId>,
}

/// Load an integration and check the caller may touch it.
async fn authorize(
    ctx: &AppContext,
    caller: &Caller,
    id: IntegrationId,
    write: bool,
) -> ApiResult<Integration> {
    let integration = ctx.integrations.get_integration_by_id(id).await?;
    if write {
        caller.ensure_can_write(&integration)?;
    } else {
        caller.ensure_can_read(&integration)?;
    }
    Ok(integration)
}

pub async fn list(
    State(ctx): Ctx,
    caller: Caller,
    ApiQuery(mut filters): ApiQuery<IntegrationFilters>,
) -> ApiResult {
    filters.business_id = caller.scope(filters.business_id)?;
    let page = ctx.integrations.list_integrations(&filters).await?;
    Ok(respond(StatusCode::OK, "Integrations retrieved", page))
}

pub async fn list_simple(
    State(ctx): Ctx,
    caller: Caller,
    ApiQuery(query): ApiQuery<TenantQuery>,
) -> ApiResult {
    let business_id = caller.scope(query.business_id)?;
    let items = ctx.integrations.list_integrations_simple(business_id).await?;
    Ok(respond(StatusCode::OK, "Integrations retrieved", items))
}

pub async fn get(State(ctx): Ctx, caller: Caller, ApiPath(id): ApiPath<IntegrationId>) -> ApiResult {
    let integration = authorize(&ctx, &caller, id, false).await?;
    Ok(respond(StatusCode::OK, "Integration retrieved", integration))
}

pub async fn get_by_type(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(type_code): ApiPath<String>,
    ApiQuery(query): ApiQuery<TenantQuery>,
) -> ApiResult {
    let business_id = caller.scope(query.business_id)?;
    let integration = ctx.integrations.get_integration_by_type(&type_code, business_id).await?;
    Ok(respond(StatusCode::OK, "Integration retrieved", integration))
}

pub async fn create(
    State(ctx): Ctx,
    caller: Caller,
    ApiJson(mut request): ApiJson<CreateIntegrationRequest>,
) -> ApiResult {
    request.business_id = Some(caller.tenant_for_create(request.business_id)?);
    request.created_by = Some(caller.user_id);

    let integration = ctx.integrations.create_integration(request).await?;
    info!(integration_id = integration.id, user_id = caller.user_id, "integration created via api");
    Ok(respond(StatusCode::CREATED, "Integration created", integration))
}

pub async fn update(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationId>,
    ApiJson(mut request): ApiJson<UpdateIntegrationRequest>,
) -> ApiResult {
    authorize(&ctx, &caller, id, true).await?;
    request.updated_by = caller.user_id;
    let integration = ctx.integrations.update_integration(id, request).await?;
    Ok(respond(StatusCode::OK, "Integration updated", integration))
}

pub async fn delete(State(ctx): Ctx, caller: Caller, ApiPath(id): ApiPath<IntegrationId>) -> ApiResult {
    authorize(&ctx, &caller, id, true).await?;
    ctx.integrations.delete_integration(id).await?;
    info!(integration_id = id, user_id = caller.user_id, "integration deleted via api");
    Ok(acknowledge("Integration deleted"))
}

pub async fn test_raw(
    State(ctx): Ctx,
    _caller: Caller,
    ApiJson(request): ApiJson<TestConnectionRequest>,
) -> ApiResult {
    ctx.integrations.test_connection_raw(&request).await?;
    Ok(acknowledge("Connection successful"))
}

pub async fn test_stored(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationId>,
) -> ApiResult {
    authorize(&ctx, &caller, id, false).await?;
    ctx.integrations.test_connection(id).await?;
    Ok(acknowledge("Connection successful"))
}

pub async fn activate(State(ctx): Ctx, caller: Caller, ApiPath(id): ApiPath<IntegrationId>) -> ApiResult {
    authorize(&ctx, &caller, id, true).await?;
    let integration = ctx.integrations.activate_integration(id).await?;
    Ok(respond(StatusCode::OK, "Integration activated", integration))
}

pub async fn deactivate(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationId>,
) -> ApiResult {
    authorize(&ctx, &caller, id, true).await?;
    let integration = ctx.integrations.deactivate_integration(id).await?;
    Ok(respond(StatusCode::OK, "Integration deactivated", integration))
}

pub async fn set_default(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationId>,
) -> ApiResult {
    authorize(&ctx, &caller, id, true).await?;
    let integration = ctx.integrations.set_integration_as_default(id).await?;
    Ok(respond(StatusCode::OK, "Integration set as default", integration))
}

pub async fn webhook_url(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationId>,
) -> ApiResult {
    authorize(&ctx, &caller, id, false).await?;
    let info = ctx.integrations.get_webhook_url(id).await?;
    Ok(respond(StatusCode::OK, "Webhook URL retrieved", info))
}

pub async fn list_webhooks(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationId>,
) -> ApiResult {
    authorize(&ctx, &caller, id, false).await?;
    let hooks = ctx.integrations.list_webhooks(id).await?;
    Ok(respond(StatusCode::OK, "Webhooks retrieved", hooks))
}

pub async fn verify_webhooks(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationId>,
) -> ApiResult {
    authorize(&ctx, &caller, id, false).await?;
    let hooks = ctx.integrations.verify_webhooks(id).await?;
    Ok(respond(StatusCode::OK, "Webhooks verified", hooks))
}

pub async fn create_webhook(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationId>,
) -> ApiResult {
    authorize(&ctx, &caller, id, true).await?;
    let created = ctx.integrations.create_webhook(id).await?;
    Ok(respond(StatusCode::CREATED, "Webhooks created", created))
}

pub async fn delete_webhook(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath((id, webhook_id)): ApiPath<(IntegrationId, String)>,
) -> ApiResult {
    authorize(&ctx, &caller, id, true).await?;
    ctx.integrations.delete_webhook(id, &webhook_id).await?;
    Ok(acknowledge("Webhook deleted"))
}

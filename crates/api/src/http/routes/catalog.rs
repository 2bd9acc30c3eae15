//! `/integration-types` and `/integration-categories` handlers
//!
//! Reads are open to every caller; writes need the super-admin role.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use integrahub_domain::{
    CreateIntegrationTypeRequest, IntegrationTypeFilters, IntegrationTypeId,
    UpdateIntegrationTypeRequest,
};

use crate::context::AppContext;
use crate::http::caller::Caller;
use crate::http::envelope::{acknowledge, respond, ApiJson, ApiPath, ApiQuery};
use crate::http::error::ApiResult;

type Ctx = State<Arc<AppContext>>;

pub async fn list_types(
    State(ctx): Ctx,
    _caller: Caller,
    ApiQuery(filters): ApiQuery<IntegrationTypeFilters>,
) -> ApiResult {
    let types = ctx.types.list_integration_types(&filters).await?;
    Ok(respond(StatusCode::OK, "Integration types retrieved", types))
}

pub async fn list_active_types(State(ctx): Ctx, _caller: Caller) -> ApiResult {
    let types = ctx.types.list_active_integration_types().await?;
    Ok(respond(StatusCode::OK, "Integration types retrieved", types))
}

pub async fn get_type(
    State(ctx): Ctx,
    _caller: Caller,
    ApiPath(id): ApiPath<IntegrationTypeId>,
) -> ApiResult {
    let integration_type = ctx.types.get_integration_type_by_id(id).await?;
    Ok(respond(StatusCode::OK, "Integration type retrieved", integration_type))
}

pub async fn get_type_by_code(
    State(ctx): Ctx,
    _caller: Caller,
    ApiPath(code): ApiPath<String>,
) -> ApiResult {
    let integration_type = ctx.types.get_integration_type_by_code(&code).await?;
    Ok(respond(StatusCode::OK, "Integration type retrieved", integration_type))
}

pub async fn create_type(
    State(ctx): Ctx,
    caller: Caller,
    ApiJson(request): ApiJson<CreateIntegrationTypeRequest>,
) -> ApiResult {
    caller.require_super_admin()?;
    let integration_type = ctx.types.create_integration_type(request).await?;
    Ok(respond(StatusCode::CREATED, "Integration type created", integration_type))
}

pub async fn update_type(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationTypeId>,
    ApiJson(request): ApiJson<UpdateIntegrationTypeRequest>,
) -> ApiResult {
    caller.require_super_admin()?;
    let integration_type = ctx.types.update_integration_type(id, request).await?;
    Ok(respond(StatusCode::OK, "Integration type updated", integration_type))
}

pub async fn delete_type(
    State(ctx): Ctx,
    caller: Caller,
    ApiPath(id): ApiPath<IntegrationTypeId>,
) -> ApiResult {
    caller.require_super_admin()?;
    ctx.types.delete_integration_type(id).await?;
    Ok(acknowledge("Integration type deleted"))
}

pub async fn list_categories(State(ctx): Ctx, _caller: Caller) -> ApiResult {
    let categories = ctx.types.list_active_categories().await?;
    Ok(respond(StatusCode::OK, "Integration categories retrieved", categories))
}

//! SQLite implementation of the integration type store.
//!
//! Deletion is soft: `deleted_at` is stamped and every read filters on it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use integrahub_core::IntegrationTypeRepository;
use integrahub_domain::{
    HubError, IntegrationType, IntegrationTypeFilters, IntegrationTypeId, Result,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::task;

use super::category_repository::find_category;
use super::columns::{from_millis, from_opt_json, millis, to_opt_json};
use super::manager::{map_sql_error, DbManager};
use crate::errors::map_join_error;

pub struct SqliteTypeRepository {
    db: Arc<DbManager>,
}

impl SqliteTypeRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            op(&conn)
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Live (not soft-deleted) type with its category preloaded.
pub(crate) fn find_type(conn: &Connection, id: IntegrationTypeId) -> Result<Option<IntegrationType>> {
    let found = conn
        .query_row(
            &format!("{TYPE_SELECT_SQL} WHERE id = ?1 AND deleted_at IS NULL"),
            params![id],
            map_type_row,
        )
        .optional()
        .map_err(map_sql_error)?;
    found.map(|t| with_category(conn, t)).transpose()
}

fn with_category(conn: &Connection, mut integration_type: IntegrationType) -> Result<IntegrationType> {
    integration_type.category = find_category(conn, integration_type.category_id)?;
    Ok(integration_type)
}

#[async_trait]
impl IntegrationTypeRepository for SqliteTypeRepository {
    async fn create_integration_type(
        &self,
        integration_type: &IntegrationType,
    ) -> Result<IntegrationType> {
        let integration_type = integration_type.clone();
        self.run(move |conn| {
            let requested_id = (integration_type.id != 0).then_some(integration_type.id);
            conn.execute(
                TYPE_INSERT_SQL,
                params![
                    requested_id,
                    integration_type.code,
                    integration_type.name,
                    integration_type.description,
                    integration_type.icon_url,
                    integration_type.category_id,
                    integration_type.is_active,
                    integration_type.in_development,
                    to_opt_json(integration_type.config_schema.as_ref())?,
                    to_opt_json(integration_type.credentials_schema.as_ref())?,
                    integration_type.base_url,
                    integration_type.base_url_test,
                    to_opt_json(integration_type.platform_credentials.as_ref())?,
                    millis(integration_type.created_at),
                    millis(integration_type.updated_at),
                ],
            )
            .map_err(|e| map_sql_error(e).with_context(format!("integration type '{}'", integration_type.code)))?;

            let id = u64::try_from(conn.last_insert_rowid())
                .map_err(|_| HubError::Store("negative integration type id".into()))?;
            find_type(conn, id)?.ok_or_else(|| HubError::not_found("integration type", id))
        })
        .await
    }

    async fn update_integration_type(&self, integration_type: &IntegrationType) -> Result<()> {
        let integration_type = integration_type.clone();
        self.run(move |conn| {
            let changed = conn
                .execute(
                    TYPE_UPDATE_SQL,
                    params![
                        integration_type.name,
                        integration_type.description,
                        integration_type.icon_url,
                        integration_type.category_id,
                        integration_type.is_active,
                        integration_type.in_development,
                        to_opt_json(integration_type.config_schema.as_ref())?,
                        to_opt_json(integration_type.credentials_schema.as_ref())?,
                        integration_type.base_url,
                        integration_type.base_url_test,
                        to_opt_json(integration_type.platform_credentials.as_ref())?,
                        millis(integration_type.updated_at),
                        integration_type.id,
                    ],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(HubError::not_found("integration type", integration_type.id));
            }
            Ok(())
        })
        .await
    }

    async fn get_integration_type_by_id(&self, id: IntegrationTypeId) -> Result<IntegrationType> {
        self.run(move |conn| {
            find_type(conn, id)?.ok_or_else(|| HubError::not_found("integration type", id))
        })
        .await
    }

    async fn get_integration_type_by_code(&self, code: &str) -> Result<IntegrationType> {
        let code = code.to_string();
        self.run(move |conn| {
            let found = conn
                .query_row(
                    &format!("{TYPE_SELECT_SQL} WHERE code = ?1 AND deleted_at IS NULL"),
                    params![code],
                    map_type_row,
                )
                .optional()
                .map_err(map_sql_error)?
                .ok_or_else(|| HubError::not_found("integration type", &code))?;
            with_category(conn, found)
        })
        .await
    }

    async fn list_integration_types(
        &self,
        filters: &IntegrationTypeFilters,
    ) -> Result<Vec<IntegrationType>> {
        let filters = filters.clone();
        self.run(move |conn| {
            let mut sql = format!("{TYPE_SELECT_SQL} WHERE deleted_at IS NULL");
            let mut args: Vec<SqlValue> = Vec::new();
            if filters.active_only {
                sql.push_str(" AND is_active = 1");
            }
            if let Some(category_id) = filters.category_id {
                args.push(SqlValue::Integer(i64::try_from(category_id).unwrap_or(i64::MAX)));
                sql.push_str(&format!(" AND category_id = ?{}", args.len()));
            }
            sql.push_str(" ORDER BY id ASC");

            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params_from_iter(args), map_type_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            rows.into_iter().map(|t| with_category(conn, t)).collect()
        })
        .await
    }

    async fn exists_integration_type_by_code(&self, code: &str) -> Result<bool> {
        let code = code.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM integration_types WHERE code = ?1 AND deleted_at IS NULL)",
                params![code],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
    }

    async fn delete_integration_type(&self, id: IntegrationTypeId) -> Result<()> {
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE integration_types SET deleted_at = ?1, is_active = 0
                     WHERE id = ?2 AND deleted_at IS NULL",
                    params![millis(Utc::now()), id],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(HubError::not_found("integration type", id));
            }
            Ok(())
        })
        .await
    }
}

const TYPE_SELECT_SQL: &str = "SELECT id, code, name, description, icon_url, category_id,
        is_active, in_development, config_schema, credentials_schema, base_url, base_url_test,
        platform_credentials, created_at, updated_at
    FROM integration_types";

const TYPE_INSERT_SQL: &str = "INSERT INTO integration_types (
        id, code, name, description, icon_url, category_id, is_active, in_development,
        config_schema, credentials_schema, base_url, base_url_test, platform_credentials,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

const TYPE_UPDATE_SQL: &str = "UPDATE integration_types SET
        name = ?1, description = ?2, icon_url = ?3, category_id = ?4, is_active = ?5,
        in_development = ?6, config_schema = ?7, credentials_schema = ?8, base_url = ?9,
        base_url_test = ?10, platform_credentials = ?11, updated_at = ?12
    WHERE id = ?13 AND deleted_at IS NULL";

fn map_type_row(row: &Row<'_>) -> rusqlite::Result<IntegrationType> {
    Ok(IntegrationType {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        icon_url: row.get(4)?,
        category_id: row.get(5)?,
        category: None,
        is_active: row.get(6)?,
        in_development: row.get(7)?,
        config_schema: from_opt_json(8, row.get(8)?)?,
        credentials_schema: from_opt_json(9, row.get(9)?)?,
        base_url: row.get(10)?,
        base_url_test: row.get(11)?,
        platform_credentials: from_opt_json(12, row.get(12)?)?,
        created_at: from_millis(13, row.get(13)?)?,
        updated_at: from_millis(14, row.get(14)?)?,
    })
}

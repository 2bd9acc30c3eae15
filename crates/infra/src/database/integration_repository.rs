//! SQLite implementation of the integration store.
//!
//! Code uniqueness is scoped by tenant (`idx_integrations_code_scope`);
//! global rows share the NULL scope. Tenant comparisons use `IS` so a NULL
//! tenant matches global rows only.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use integrahub_core::IntegrationRepository;
use integrahub_domain::{
    BusinessId, HubError, Integration, IntegrationFilters, IntegrationId, IntegrationSimple,
    IntegrationType, IntegrationTypeId, NewIntegration, Page, Result,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::debug;

use super::columns::{from_json, from_millis, from_opt_millis, millis, to_json};
use super::manager::{map_sql_error, DbManager};
use super::type_repository::find_type;
use crate::errors::map_join_error;

pub struct SqliteIntegrationRepository {
    db: Arc<DbManager>,
}

impl SqliteIntegrationRepository {
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

fn not_found(id: impl std::fmt::Display) -> HubError {
    HubError::not_found("integration", id)
}

/// Preloads integration types, loading each id at most once.
struct TypeLoader<'c> {
    conn: &'c Connection,
    loaded: HashMap<IntegrationTypeId, Option<IntegrationType>>,
}

impl<'c> TypeLoader<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self { conn, loaded: HashMap::new() }
    }

    fn attach(&mut self, mut integration: Integration) -> Result<Integration> {
        let type_id = integration.integration_type_id;
        if !self.loaded.contains_key(&type_id) {
            let found = find_type(self.conn, type_id)?;
            self.loaded.insert(type_id, found);
        }
        integration.integration_type = self.loaded.get(&type_id).cloned().flatten();
        Ok(integration)
    }

    fn attach_all(&mut self, rows: Vec<Integration>) -> Result<Vec<Integration>> {
        rows.into_iter().map(|row| self.attach(row)).collect()
    }
}

fn find_integration(conn: &Connection, id: IntegrationId) -> Result<Option<Integration>> {
    let found = conn
        .query_row(&format!("{INTEGRATION_SELECT_SQL} WHERE i.id = ?1"), params![id], map_integration_row)
        .optional()
        .map_err(map_sql_error)?;
    found.map(|row| TypeLoader::new(conn).attach(row)).transpose()
}

fn query_integrations(
    conn: &Connection,
    sql: &str,
    args: Vec<SqlValue>,
) -> Result<Vec<Integration>> {
    let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(params_from_iter(args), map_integration_row)
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;
    TypeLoader::new(conn).attach_all(rows)
}

fn sql_int(value: u64) -> SqlValue {
    SqlValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

/// Active record for `(type, tenant)`, default first, then oldest.
fn find_active_by_type(
    conn: &Connection,
    type_id: IntegrationTypeId,
    business_id: Option<BusinessId>,
) -> Result<Option<Integration>> {
    let found = conn
        .query_row(
            &format!(
                "{INTEGRATION_SELECT_SQL}
                 WHERE i.integration_type_id = ?1 AND i.business_id IS ?2 AND i.is_active = 1
                 ORDER BY i.is_default DESC, i.id ASC LIMIT 1"
            ),
            params![type_id, business_id],
            map_integration_row,
        )
        .optional()
        .map_err(map_sql_error)?;
    found.map(|row| TypeLoader::new(conn).attach(row)).transpose()
}

/// WHERE clause and arguments for a filtered listing.
fn listing_clause(filters: &IntegrationFilters) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut args = Vec::new();

    let mut push = |clause: &str, value: SqlValue, args: &mut Vec<SqlValue>| {
        args.push(value);
        clauses.push(clause.replace('?', &format!("?{}", args.len())));
    };

    if let Some(type_id) = filters.integration_type_id {
        push("i.integration_type_id = ?", sql_int(type_id), &mut args);
    }
    if let Some(code) = filters.integration_type_code.as_deref().filter(|c| !c.is_empty()) {
        push("t.code = ?", SqlValue::Text(code.to_string()), &mut args);
    }
    if let Some(category) = filters.category.as_deref().filter(|c| !c.is_empty()) {
        push("c.code = ?", SqlValue::Text(category.to_string()), &mut args);
    }
    if let Some(business_id) = filters.business_id {
        push("i.business_id = ?", sql_int(business_id), &mut args);
    }
    if let Some(is_active) = filters.is_active {
        push("i.is_active = ?", SqlValue::Integer(i64::from(is_active)), &mut args);
    }
    if let Some(store_id) = filters.store_id.as_deref().filter(|s| !s.is_empty()) {
        push("i.store_id = ?", SqlValue::Text(store_id.to_string()), &mut args);
    }
    if let Some(term) = filters.search_term() {
        args.push(SqlValue::Text(format!("%{term}%")));
        let n = args.len();
        clauses.push(format!("(i.name LIKE ?{n} OR i.code LIKE ?{n})"));
    }

    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), args)
    }
}

#[async_trait]
impl IntegrationRepository for SqliteIntegrationRepository {
    async fn create_integration(&self, integration: NewIntegration) -> Result<Integration> {
        self.run(move |conn| {
            let now = millis(Utc::now());
            conn.execute(
                INTEGRATION_INSERT_SQL,
                params![
                    integration.business_id,
                    integration.integration_type_id,
                    integration.code,
                    integration.name,
                    integration.store_id,
                    to_json(&integration.config)?,
                    integration.credentials,
                    integration.is_active,
                    integration.is_default,
                    integration.is_testing,
                    integration.created_by,
                    now,
                    now,
                ],
            )
            .map_err(|e| match map_sql_error(e) {
                HubError::DuplicateCode(_) => HubError::DuplicateCode(integration.code.clone()),
                other => other,
            })?;

            let id = u64::try_from(conn.last_insert_rowid())
                .map_err(|_| HubError::Store("negative integration id".into()))?;
            debug!(integration_id = id, "integration row inserted");
            find_integration(conn, id)?.ok_or_else(|| not_found(id))
        })
        .await
    }

    async fn update_integration(&self, integration: &Integration) -> Result<()> {
        let integration = integration.clone();
        self.run(move |conn| {
            let changed = conn
                .execute(
                    INTEGRATION_UPDATE_SQL,
                    params![
                        integration.code,
                        integration.name,
                        integration.store_id,
                        to_json(&integration.config)?,
                        integration.credentials,
                        integration.is_active,
                        integration.is_testing,
                        integration.last_sync_at.map(millis),
                        integration.updated_by,
                        millis(integration.updated_at),
                        integration.id,
                    ],
                )
                .map_err(|e| match map_sql_error(e) {
                    HubError::DuplicateCode(_) => HubError::DuplicateCode(integration.code.clone()),
                    other => other,
                })?;
            if changed == 0 {
                return Err(not_found(integration.id));
            }
            Ok(())
        })
        .await
    }

    async fn get_integration_by_id(&self, id: IntegrationId) -> Result<Integration> {
        self.run(move |conn| find_integration(conn, id)?.ok_or_else(|| not_found(id))).await
    }

    async fn get_integration_by_code(
        &self,
        code: &str,
        business_id: Option<BusinessId>,
    ) -> Result<Integration> {
        let code = code.to_string();
        self.run(move |conn| {
            let found = conn
                .query_row(
                    &format!("{INTEGRATION_SELECT_SQL} WHERE i.code = ?1 AND i.business_id IS ?2"),
                    params![code, business_id],
                    map_integration_row,
                )
                .optional()
                .map_err(map_sql_error)?
                .ok_or_else(|| not_found(&code))?;
            TypeLoader::new(conn).attach(found)
        })
        .await
    }

    async fn list_integrations(&self, filters: &IntegrationFilters) -> Result<Page<Integration>> {
        let filters = filters.clone();
        self.run(move |conn| {
            let (where_clause, mut args) = listing_clause(&filters);

            let total: u64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) {INTEGRATION_FROM_SQL}{where_clause}"),
                    params_from_iter(args.iter()),
                    |row| row.get(0),
                )
                .map_err(map_sql_error)?;

            let page_size = filters.effective_page_size();
            args.push(SqlValue::Integer(i64::from(page_size)));
            args.push(sql_int(filters.offset()));
            let n = args.len();
            let sql = format!(
                "{INTEGRATION_SELECT_SQL}{where_clause} ORDER BY i.id ASC LIMIT ?{} OFFSET ?{n}",
                n - 1
            );

            let items = query_integrations(conn, &sql, args)?;
            Ok(Page::new(items, total, filters.effective_page(), page_size))
        })
        .await
    }

    async fn list_integrations_simple(
        &self,
        business_id: Option<BusinessId>,
        limit: u32,
    ) -> Result<Vec<IntegrationSimple>> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, code, integration_type_id, business_id, is_active
                     FROM integrations
                     WHERE (?1 IS NULL OR business_id = ?1)
                     ORDER BY id ASC LIMIT ?2",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![business_id, limit], |row| {
                    Ok(IntegrationSimple {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        code: row.get(2)?,
                        integration_type_id: row.get(3)?,
                        business_id: row.get(4)?,
                        is_active: row.get(5)?,
                    })
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
    }

    async fn list_active_integrations(&self, offset: u64, limit: u32) -> Result<Vec<Integration>> {
        self.run(move |conn| {
            query_integrations(
                conn,
                &format!(
                    "{INTEGRATION_SELECT_SQL} WHERE i.is_active = 1 ORDER BY i.id ASC LIMIT ?1 OFFSET ?2"
                ),
                vec![SqlValue::Integer(i64::from(limit)), sql_int(offset)],
            )
        })
        .await
    }

    async fn list_active_integrations_by_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Integration>> {
        self.run(move |conn| {
            query_integrations(
                conn,
                &format!(
                    "{INTEGRATION_SELECT_SQL} WHERE i.is_active = 1 AND i.business_id = ?1 ORDER BY i.id ASC"
                ),
                vec![sql_int(business_id)],
            )
        })
        .await
    }

    async fn list_integration_ids_by_type(
        &self,
        type_id: IntegrationTypeId,
    ) -> Result<Vec<IntegrationId>> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare("SELECT id FROM integrations WHERE integration_type_id = ?1 ORDER BY id")
                .map_err(map_sql_error)?;
            let ids = stmt.query_map(params![type_id], |row| row.get(0)).map_err(map_sql_error)?;
            ids.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
    }

    async fn get_active_integration_by_type_id(
        &self,
        type_id: IntegrationTypeId,
        business_id: Option<BusinessId>,
    ) -> Result<Integration> {
        self.run(move |conn| {
            if business_id.is_some() {
                if let Some(found) = find_active_by_type(conn, type_id, business_id)? {
                    return Ok(found);
                }
            }
            find_active_by_type(conn, type_id, None)?.ok_or_else(|| {
                HubError::NotFound(format!(
                    "no active integration of type {type_id} for business {business_id:?}"
                ))
            })
        })
        .await
    }

    async fn set_integration_as_default(&self, id: IntegrationId) -> Result<Vec<IntegrationId>> {
        self.run(move |conn| {
            let tx = conn.unchecked_transaction().map_err(map_sql_error)?;

            let (type_id, business_id): (IntegrationTypeId, Option<BusinessId>) = tx
                .query_row(
                    "SELECT integration_type_id, business_id FROM integrations WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(map_sql_error)?
                .ok_or_else(|| not_found(id))?;

            let cleared = {
                let mut stmt = tx
                    .prepare(
                        "SELECT id FROM integrations
                         WHERE integration_type_id = ?1 AND business_id IS ?2
                           AND is_default = 1 AND id != ?3",
                    )
                    .map_err(map_sql_error)?;
                let ids = stmt
                    .query_map(params![type_id, business_id, id], |row| row.get(0))
                    .map_err(map_sql_error)?;
                ids.collect::<rusqlite::Result<Vec<IntegrationId>>>().map_err(map_sql_error)?
            };

            let now = millis(Utc::now());
            tx.execute(
                "UPDATE integrations SET is_default = 0, updated_at = ?1
                 WHERE integration_type_id = ?2 AND business_id IS ?3 AND is_default = 1 AND id != ?4",
                params![now, type_id, business_id, id],
            )
            .map_err(map_sql_error)?;
            tx.execute(
                "UPDATE integrations SET is_default = 1, updated_at = ?1 WHERE id = ?2",
                params![now, id],
            )
            .map_err(map_sql_error)?;

            tx.commit().map_err(map_sql_error)?;
            Ok(cleared)
        })
        .await
    }

    async fn clear_integration_default(&self, id: IntegrationId) -> Result<()> {
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE integrations SET is_default = 0, updated_at = ?1 WHERE id = ?2",
                    params![millis(Utc::now()), id],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(not_found(id));
            }
            Ok(())
        })
        .await
    }

    async fn exists_integration_by_code(
        &self,
        code: &str,
        business_id: Option<BusinessId>,
    ) -> Result<bool> {
        let code = code.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM integrations WHERE code = ?1 AND business_id IS ?2)",
                params![code, business_id],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
    }

    async fn update_last_sync(&self, id: IntegrationId, at: DateTime<Utc>) -> Result<()> {
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE integrations SET last_sync_at = ?1 WHERE id = ?2",
                    params![millis(at), id],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(not_found(id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_integration(&self, id: IntegrationId) -> Result<()> {
        self.run(move |conn| {
            let deleted = conn
                .execute("DELETE FROM integrations WHERE id = ?1", params![id])
                .map_err(map_sql_error)?;
            if deleted == 0 {
                return Err(not_found(id));
            }
            Ok(())
        })
        .await
    }

    async fn count_active_integrations_by_type(&self, type_id: IntegrationTypeId) -> Result<u64> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM integrations WHERE integration_type_id = ?1 AND is_active = 1",
                params![type_id],
                |row| row.get(0),
            )
            .map_err(map_sql_error)
        })
        .await
    }
}

const INTEGRATION_FROM_SQL: &str = "FROM integrations i
    LEFT JOIN integration_types t ON t.id = i.integration_type_id
    LEFT JOIN integration_categories c ON c.id = t.category_id";

const INTEGRATION_SELECT_SQL: &str = "SELECT i.id, i.business_id, i.integration_type_id, i.code,
        i.name, i.store_id, i.config, i.credentials, i.is_active, i.is_default, i.is_testing,
        i.last_sync_at, i.created_by, i.updated_by, i.created_at, i.updated_at
    FROM integrations i
    LEFT JOIN integration_types t ON t.id = i.integration_type_id
    LEFT JOIN integration_categories c ON c.id = t.category_id";

const INTEGRATION_INSERT_SQL: &str = "INSERT INTO integrations (
        business_id, integration_type_id, code, name, store_id, config, credentials, is_active,
        is_default, is_testing, created_by, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

// `is_default` is owned by `set_integration_as_default` and
// `clear_integration_default`; a full-row update never writes it.
const INTEGRATION_UPDATE_SQL: &str = "UPDATE integrations SET
        code = ?1, name = ?2, store_id = ?3, config = ?4, credentials = ?5, is_active = ?6,
        is_testing = ?7, last_sync_at = ?8, updated_by = ?9, updated_at = ?10
    WHERE id = ?11";

fn map_integration_row(row: &Row<'_>) -> rusqlite::Result<Integration> {
    let config: String = row.get(6)?;
    Ok(Integration {
        id: row.get(0)?,
        business_id: row.get(1)?,
        integration_type_id: row.get(2)?,
        integration_type: None,
        code: row.get(3)?,
        name: row.get(4)?,
        store_id: row.get(5)?,
        config: from_json(6, &config)?,
        credentials: row.get(7)?,
        is_active: row.get(8)?,
        is_default: row.get(9)?,
        is_testing: row.get(10)?,
        last_sync_at: from_opt_millis(11, row.get(11)?)?,
        created_by: row.get(12)?,
        updated_by: row.get(13)?,
        created_at: from_millis(14, row.get(14)?)?,
        updated_at: from_millis(15, row.get(15)?)?,
    })
}

//! SQLite implementation of the integration category store.

use std::sync::Arc;

use async_trait::async_trait;
use integrahub_core::IntegrationCategoryRepository;
use integrahub_domain::{HubError, IntegrationCategory, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;

use super::columns::{from_millis, millis};
use super::manager::{map_sql_error, DbManager};
use crate::errors::map_join_error;

pub struct SqliteCategoryRepository {
    db: Arc<DbManager>,
}

impl SqliteCategoryRepository {
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

pub(crate) fn find_category(conn: &Connection, id: u64) -> Result<Option<IntegrationCategory>> {
    conn.query_row(&format!("{CATEGORY_SELECT_SQL} WHERE id = ?1"), params![id], map_category_row)
        .optional()
        .map_err(map_sql_error)
}

#[async_trait]
impl IntegrationCategoryRepository for SqliteCategoryRepository {
    async fn create_category(&self, category: &IntegrationCategory) -> Result<IntegrationCategory> {
        let category = category.clone();
        self.run(move |conn| {
            conn.execute(
                CATEGORY_INSERT_SQL,
                params![
                    category.code,
                    category.name,
                    category.description,
                    category.parent_category_id,
                    category.is_active,
                    category.is_visible,
                    category.display_order,
                    millis(category.created_at),
                    millis(category.updated_at),
                ],
            )
            .map_err(map_sql_error)?;
            let id = u64::try_from(conn.last_insert_rowid())
                .map_err(|_| HubError::Store("negative category id".into()))?;
            Ok(IntegrationCategory { id, ..category })
        })
        .await
    }

    async fn update_category(&self, category: &IntegrationCategory) -> Result<()> {
        let category = category.clone();
        self.run(move |conn| {
            let changed = conn
                .execute(
                    CATEGORY_UPDATE_SQL,
                    params![
                        category.name,
                        category.description,
                        category.parent_category_id,
                        category.is_active,
                        category.is_visible,
                        category.display_order,
                        millis(category.updated_at),
                        category.id,
                    ],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(HubError::not_found("category", category.id));
            }
            Ok(())
        })
        .await
    }

    async fn get_category_by_id(&self, id: u64) -> Result<IntegrationCategory> {
        self.run(move |conn| find_category(conn, id)?.ok_or_else(|| HubError::not_found("category", id)))
            .await
    }

    async fn get_category_by_code(&self, code: &str) -> Result<IntegrationCategory> {
        let code = code.to_string();
        self.run(move |conn| {
            conn.query_row(
                &format!("{CATEGORY_SELECT_SQL} WHERE code = ?1"),
                params![code],
                map_category_row,
            )
            .optional()
            .map_err(map_sql_error)?
            .ok_or_else(|| HubError::not_found("category", code))
        })
        .await
    }

    async fn list_active_categories(&self) -> Result<Vec<IntegrationCategory>> {
        self.run(|conn| {
            query_categories(
                conn,
                &format!(
                    "{CATEGORY_SELECT_SQL} WHERE is_active = 1 AND is_visible = 1
                     ORDER BY display_order ASC, id ASC"
                ),
            )
        })
        .await
    }

    async fn list_categories(&self) -> Result<Vec<IntegrationCategory>> {
        self.run(|conn| {
            query_categories(conn, &format!("{CATEGORY_SELECT_SQL} ORDER BY display_order ASC, id ASC"))
        })
        .await
    }

    async fn delete_category(&self, id: u64) -> Result<()> {
        self.run(move |conn| {
            let types: u64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM integration_types WHERE category_id = ?1 AND deleted_at IS NULL",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(map_sql_error)?;
            if types > 0 {
                return Err(HubError::HasIntegrations(format!(
                    "category {id} is referenced by {types} integration type(s)"
                )));
            }
            let deleted = conn
                .execute("DELETE FROM integration_categories WHERE id = ?1", params![id])
                .map_err(map_sql_error)?;
            if deleted == 0 {
                return Err(HubError::not_found("category", id));
            }
            Ok(())
        })
        .await
    }
}

fn query_categories(conn: &Connection, sql: &str) -> Result<Vec<IntegrationCategory>> {
    let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
    let rows = stmt.query_map([], map_category_row).map_err(map_sql_error)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
}

const CATEGORY_SELECT_SQL: &str = "SELECT id, code, name, description, parent_category_id,
        is_active, is_visible, display_order, created_at, updated_at
    FROM integration_categories";

const CATEGORY_INSERT_SQL: &str = "INSERT INTO integration_categories (
        code, name, description, parent_category_id, is_active, is_visible, display_order,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const CATEGORY_UPDATE_SQL: &str = "UPDATE integration_categories SET
        name = ?1, description = ?2, parent_category_id = ?3, is_active = ?4, is_visible = ?5,
        display_order = ?6, updated_at = ?7
    WHERE id = ?8";

pub(crate) fn map_category_row(row: &Row<'_>) -> rusqlite::Result<IntegrationCategory> {
    Ok(IntegrationCategory {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        parent_category_id: row.get(4)?,
        is_active: row.get(5)?,
        is_visible: row.get(6)?,
        display_order: row.get(7)?,
        created_at: from_millis(8, row.get(8)?)?,
        updated_at: from_millis(9, row.get(9)?)?,
    })
}

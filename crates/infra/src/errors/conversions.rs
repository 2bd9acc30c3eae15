//! Conversions from external infrastructure errors into domain errors.

use integrahub_domain::HubError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub HubError);

impl From<InfraError> for HubError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<HubError> for InfraError {
    fn from(value: HubError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoHubError {
    fn into_hub(self) -> HubError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → HubError */
/* -------------------------------------------------------------------------- */

impl IntoHubError for SqlError {
    fn into_hub(self) -> HubError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => HubError::Store("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => HubError::Store("database is locked".into()),
                    // SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        HubError::DuplicateCode(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        HubError::Validation(format!("foreign key constraint violation: {message}"))
                    }
                    _ => HubError::Store(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => HubError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                HubError::Store(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                HubError::Store(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => HubError::Store("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidPath(path) => {
                HubError::Config(format!("invalid database path: {}", path.to_string_lossy()))
            }
            other => HubError::Store(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_hub())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → HubError */
/* -------------------------------------------------------------------------- */

impl IntoHubError for r2d2::Error {
    fn into_hub(self) -> HubError {
        HubError::Store(format!("connection pool exhausted or unavailable: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_hub())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → HubError */
/* -------------------------------------------------------------------------- */

impl IntoHubError for HttpError {
    fn into_hub(self) -> HubError {
        if self.is_timeout() {
            return HubError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return HubError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_to_error(status.as_u16(), status.canonical_reason().unwrap_or(""));
        }

        if self.is_decode() {
            return HubError::Network(format!("invalid response body: {self}"));
        }

        HubError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_hub())
    }
}

/// Map a vendor HTTP status to the hub taxonomy.
pub fn status_to_error(code: u16, detail: &str) -> HubError {
    let message = if detail.is_empty() {
        format!("HTTP {code}")
    } else {
        format!("HTTP {code}: {detail}")
    };

    match code {
        401 | 403 => HubError::Auth(message),
        404 => HubError::NotFound(message),
        408 | 429 => HubError::Network(message),
        400..=499 => HubError::Validation(message),
        _ => HubError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → HubError */
/* -------------------------------------------------------------------------- */

impl From<tokio::task::JoinError> for InfraError {
    fn from(value: tokio::task::JoinError) -> Self {
        InfraError(HubError::Internal(format!("blocking task failed: {value}")))
    }
}

/// `map_err` adapter for `spawn_blocking(...).await`.
pub fn map_join_error(err: tokio::task::JoinError) -> HubError {
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

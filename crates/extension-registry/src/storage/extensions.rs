//! Extension metadata table
//!
//! One row per extension id. Publishing upserts the row: the first publish
//! inserts it with `downloads = 0` and `created_at = updated_at`, later
//! publishes overwrite the display fields and `updated_at` only.
//! `updated_at` never moves before `created_at`, even if the clock does.

use super::{format_timestamp, parse_timestamp};
use crate::entities::{Extension, ExtensionId, ExtensionUpsert};
use crate::error::{RegistryError, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

pub(crate) const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS extensions (
        extension_id TEXT NOT NULL,
        name TEXT NOT NULL,
        authors TEXT NOT NULL,              -- JSON array of strings
        description TEXT NOT NULL,
        repository TEXT NOT NULL,
        downloads INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CONSTRAINT extensions_pk PRIMARY KEY (extension_id)
    )
"#;

const SELECT_COLUMNS: &str =
    "SELECT extension_id, name, authors, description, repository, downloads, created_at, updated_at FROM extensions";

/// Insert the extension, or refresh its display fields if it already exists
pub async fn upsert<'e, E>(executor: E, extension: &ExtensionUpsert) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let authors = serde_json::to_string(&extension.authors)?;
    let now = format_timestamp(extension.now)?;

    sqlx::query(
        r#"
        INSERT INTO extensions
        (extension_id, name, authors, description, repository, downloads, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?)
        ON CONFLICT (extension_id) DO UPDATE SET
            name = excluded.name,
            authors = excluded.authors,
            description = excluded.description,
            repository = excluded.repository,
            updated_at = CASE
                WHEN julianday(excluded.updated_at) < julianday(extensions.created_at)
                THEN extensions.created_at
                ELSE excluded.updated_at
            END
    "#,
    )
    .bind(extension.extension_id.as_ref())
    .bind(&extension.name)
    .bind(authors)
    .bind(&extension.description)
    .bind(&extension.repository)
    .bind(&now)
    .bind(&now)
    .execute(executor)
    .await
    .map_err(|e| RegistryError::Storage(format!("Failed to upsert extension: {}", e)))?;

    Ok(())
}

pub async fn list<'e, E>(executor: E) -> Result<Vec<Extension>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!("{} ORDER BY extension_id", SELECT_COLUMNS))
        .fetch_all(executor)
        .await
        .map_err(|e| RegistryError::Storage(format!("Failed to list extensions: {}", e)))?;

    rows.iter().map(from_row).collect()
}

pub async fn get<'e, E>(executor: E, id: &ExtensionId) -> Result<Option<Extension>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("{} WHERE extension_id = ?", SELECT_COLUMNS))
        .bind(id.as_ref())
        .fetch_optional(executor)
        .await
        .map_err(|e| RegistryError::Storage(format!("Failed to get extension: {}", e)))?;

    row.as_ref().map(from_row).transpose()
}

fn from_row(row: &SqliteRow) -> Result<Extension> {
    let authors_json: String = row.get("authors");
    let authors = serde_json::from_str(&authors_json).map_err(|e| {
        RegistryError::Storage(format!("Failed to deserialize authors: {}", e))
    })?;

    Ok(Extension {
        extension_id: ExtensionId(row.get("extension_id")),
        name: row.get("name"),
        authors,
        description: row.get("description"),
        repository: row.get("repository"),
        downloads: row.get("downloads"),
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

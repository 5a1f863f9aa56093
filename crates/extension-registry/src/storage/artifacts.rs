//! Artifact table
//!
//! Append-only: rows are inserted once per publish and never updated. The rank
//! columns are generated by SQLite from the version triples and cannot be
//! written directly.

use super::{format_timestamp, parse_timestamp};
use crate::entities::{Artifact, ArtifactId, ArtifactInfo, ExtensionId, NewArtifact};
use crate::error::{RegistryError, Result};
use crate::version::Version;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

pub(crate) const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS extension_artifacts (
        artifact_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
        extension_id TEXT NOT NULL,
        ver_major INTEGER NOT NULL,
        ver_minor INTEGER NOT NULL,
        ver_patch INTEGER NOT NULL,
        min_app_major INTEGER NOT NULL,
        min_app_minor INTEGER NOT NULL,
        min_app_patch INTEGER NOT NULL,
        published_at TEXT NOT NULL,
        artifact BLOB NOT NULL,
        ver_rank INTEGER GENERATED ALWAYS AS
            (ver_major * 1000000 + ver_minor * 1000 + ver_patch) VIRTUAL,
        min_app_rank INTEGER GENERATED ALWAYS AS
            (min_app_major * 1000000 + min_app_minor * 1000 + min_app_patch) VIRTUAL,
        CONSTRAINT extension_artifacts_extensions_fk FOREIGN KEY (extension_id)
            REFERENCES extensions(extension_id) ON DELETE CASCADE
    )
"#;

pub(crate) const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_artifacts_extension ON extension_artifacts(extension_id, ver_rank)";

const INFO_COLUMNS: &str = "artifact_id, extension_id, ver_major, ver_minor, ver_patch, \
     min_app_major, min_app_minor, min_app_patch, published_at";

/// Insert an artifact and return its generated id.
///
/// Fails with a foreign-key violation when the parent extension row does not
/// exist on the same connection.
pub async fn insert<'e, E>(executor: E, artifact: &NewArtifact) -> Result<ArtifactId>
where
    E: Executor<'e, Database = Sqlite>,
{
    let published_at = format_timestamp(artifact.published_at)?;

    let result = sqlx::query(
        r#"
        INSERT INTO extension_artifacts
        (extension_id, ver_major, ver_minor, ver_patch, min_app_major, min_app_minor, min_app_patch, published_at, artifact)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#,
    )
    .bind(artifact.extension_id.as_ref())
    .bind(i64::from(artifact.version.major))
    .bind(i64::from(artifact.version.minor))
    .bind(i64::from(artifact.version.patch))
    .bind(i64::from(artifact.min_app_version.major))
    .bind(i64::from(artifact.min_app_version.minor))
    .bind(i64::from(artifact.min_app_version.patch))
    .bind(published_at)
    .bind(artifact.payload.as_slice())
    .execute(executor)
    .await
    .map_err(|e| RegistryError::Storage(format!("Failed to insert artifact: {}", e)))?;

    Ok(ArtifactId(result.last_insert_rowid()))
}

pub async fn list<'e, E>(executor: E, extension_id: &ExtensionId) -> Result<Vec<ArtifactInfo>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(&format!(
        "SELECT {} FROM extension_artifacts WHERE extension_id = ? ORDER BY artifact_id",
        INFO_COLUMNS
    ))
    .bind(extension_id.as_ref())
    .fetch_all(executor)
    .await
    .map_err(|e| RegistryError::Storage(format!("Failed to list artifacts: {}", e)))?;

    rows.iter().map(info_from_row).collect()
}

pub async fn get<'e, E>(executor: E, id: ArtifactId) -> Result<Option<Artifact>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!(
        "SELECT {}, artifact FROM extension_artifacts WHERE artifact_id = ? LIMIT 1",
        INFO_COLUMNS
    ))
    .bind(id.0)
    .fetch_optional(executor)
    .await
    .map_err(|e| RegistryError::Storage(format!("Failed to get artifact: {}", e)))?;

    match row {
        Some(row) => Ok(Some(Artifact {
            info: info_from_row(&row)?,
            payload: row.get("artifact"),
        })),
        None => Ok(None),
    }
}

/// Highest `ver_rank` among artifacts whose `min_app_rank` does not exceed the app's rank.
/// Duplicate versions resolve to the most recently published artifact.
pub async fn latest_compatible<'e, E>(
    executor: E,
    extension_id: &ExtensionId,
    app_version: Version,
) -> Result<Option<ArtifactInfo>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!(
        r#"
        SELECT {} FROM extension_artifacts
        WHERE extension_id = ? AND min_app_rank <= ?
        ORDER BY ver_rank DESC, artifact_id DESC
        LIMIT 1
    "#,
        INFO_COLUMNS
    ))
    .bind(extension_id.as_ref())
    .bind(app_version.rank())
    .fetch_optional(executor)
    .await
    .map_err(|e| RegistryError::Storage(format!("Failed to find compatible artifact: {}", e)))?;

    row.as_ref().map(info_from_row).transpose()
}

fn component(row: &SqliteRow, column: &str) -> Result<u32> {
    let value: i64 = row.get(column);
    u32::try_from(value).map_err(|_| {
        RegistryError::Storage(format!("Column {} holds out-of-range value {}", column, value))
    })
}

fn info_from_row(row: &SqliteRow) -> Result<ArtifactInfo> {
    Ok(ArtifactInfo {
        artifact_id: ArtifactId(row.get("artifact_id")),
        extension_id: ExtensionId(row.get("extension_id")),
        version: Version::new(
            component(row, "ver_major")?,
            component(row, "ver_minor")?,
            component(row, "ver_patch")?,
        ),
        min_app_version: Version::new(
            component(row, "min_app_major")?,
            component(row, "min_app_minor")?,
            component(row, "min_app_patch")?,
        ),
        published_at: parse_timestamp(row.get("published_at"))?,
    })
}

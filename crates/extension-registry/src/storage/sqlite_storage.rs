//! SQLite registry storage implementation
//!
//! This module provides a SQLite-based implementation of the RegistryStorage trait.
//! Extension metadata and artifact blobs live in the same database file so a
//! publish can commit both in one transaction.

use super::{RegistryStorage, artifacts, extensions};
use crate::entities::*;
use crate::error::{RegistryError, Result};
use crate::version::Version;
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// How long a writer waits for a concurrent transaction before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based registry storage
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Connect to the database at `database_url` and create the schema if needed
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_parent_dir(database_url).await?;

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RegistryError::Storage(format!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| RegistryError::Storage(format!("Failed to connect to SQLite: {}", e)))?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    /// Create SQLite storage from environment variable
    ///
    /// Expects DATABASE_URL environment variable with SQLite connection string
    /// Example: sqlite:./data/registry.db
    pub async fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/registry.db".to_string());

        Self::new(&database_url).await
    }

    /// Private in-memory database.
    ///
    /// Every SQLite memory connection is its own database, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| RegistryError::Storage(format!("Invalid database path: {}", e)))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| RegistryError::Storage(format!("Failed to open in-memory SQLite: {}", e)))?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// SQLite creates the database file but not its directory
async fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }

    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| {
                RegistryError::Storage(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            }),
        _ => Ok(()),
    }
}

#[async_trait]
impl RegistryStorage for SqliteStorage {
    async fn migrate(&self) -> Result<()> {
        sqlx::query(extensions::CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RegistryError::Storage(format!("Failed to create extensions table: {}", e))
            })?;

        sqlx::query(artifacts::CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RegistryError::Storage(format!("Failed to create extension_artifacts table: {}", e))
            })?;

        sqlx::query(artifacts::CREATE_INDEX)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::Storage(format!("Failed to create artifact index: {}", e)))?;

        Ok(())
    }

    async fn publish(
        &self,
        extension: &ExtensionUpsert,
        artifact: &NewArtifact,
    ) -> Result<ArtifactId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RegistryError::Storage(format!("Failed to begin transaction: {}", e)))?;

        // Dropping `tx` on an early return rolls both writes back
        extensions::upsert(&mut *tx, extension).await?;
        let artifact_id = artifacts::insert(&mut *tx, artifact).await?;

        tx.commit()
            .await
            .map_err(|e| RegistryError::Storage(format!("Failed to commit publish: {}", e)))?;

        debug!(
            "Committed artifact {} for {} ({} bytes)",
            artifact_id,
            extension.extension_id,
            artifact.payload.len()
        );
        Ok(artifact_id)
    }

    async fn list_extensions(&self) -> Result<Vec<Extension>> {
        extensions::list(&self.pool).await
    }

    async fn get_extension(&self, id: &ExtensionId) -> Result<Option<Extension>> {
        extensions::get(&self.pool, id).await
    }

    async fn list_artifacts(&self, id: &ExtensionId) -> Result<Vec<ArtifactInfo>> {
        artifacts::list(&self.pool, id).await
    }

    async fn get_artifact(&self, id: ArtifactId) -> Result<Option<Artifact>> {
        artifacts::get(&self.pool, id).await
    }

    async fn latest_compatible_artifact(
        &self,
        id: &ExtensionId,
        app_version: Version,
    ) -> Result<Option<ArtifactInfo>> {
        artifacts::latest_compatible(&self.pool, id, app_version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use tempfile::tempdir;
    use time::OffsetDateTime;
    use time::macros::datetime;

    async fn create_test_storage() -> (SqliteStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_url = format!("sqlite:{}", temp_dir.path().join("test.db").display());
        (SqliteStorage::new(&db_url).await.unwrap(), temp_dir)
    }

    fn upsert(id: &str, name: &str, now: OffsetDateTime) -> ExtensionUpsert {
        ExtensionUpsert {
            extension_id: ExtensionId::from(id),
            name: name.to_string(),
            authors: vec!["alice".to_string()],
            description: "test extension".to_string(),
            repository: "https://example.com/repo".to_string(),
            now,
        }
    }

    fn new_artifact(id: &str, version: Version, min_app: Version, payload: &[u8]) -> NewArtifact {
        NewArtifact {
            extension_id: ExtensionId::from(id),
            version,
            min_app_version: min_app,
            published_at: datetime!(2024-05-01 12:00 UTC),
            payload: payload.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_publish_and_read_back() {
        let (storage, _dir) = create_test_storage().await;
        let now = datetime!(2024-05-01 12:00 UTC);

        let id = storage
            .publish(
                &upsert("foo.bar", "Foo", now),
                &new_artifact("foo.bar", Version::new(1, 2, 3), Version::new(0, 5, 0), &[0x1f, 0x8b, 0x08]),
            )
            .await
            .unwrap();

        let extension = storage
            .get_extension(&ExtensionId::from("foo.bar"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(extension.name, "Foo");
        assert_eq!(extension.authors, vec!["alice"]);
        assert_eq!(extension.downloads, 0);
        assert_eq!(extension.created_at, now);
        assert_eq!(extension.updated_at, now);

        let artifact = storage.get_artifact(id).await.unwrap().unwrap();
        assert_eq!(artifact.payload, vec![0x1f, 0x8b, 0x08]);
        assert_eq!(artifact.info.version, Version::new(1, 2, 3));
        assert_eq!(artifact.info.min_app_version, Version::new(0, 5, 0));
    }

    #[tokio::test]
    async fn test_generated_ranks_match_version_rank() {
        let (storage, _dir) = create_test_storage().await;
        let version = Version::new(3, 14, 159);
        let min_app = Version::new(2, 0, 7);

        let id = storage
            .publish(
                &upsert("ranked", "Ranked", OffsetDateTime::now_utc()),
                &new_artifact("ranked", version, min_app, b"x"),
            )
            .await
            .unwrap();

        let row = sqlx::query(
            "SELECT ver_rank, min_app_rank FROM extension_artifacts WHERE artifact_id = ?",
        )
        .bind(id.0)
        .fetch_one(storage.pool())
        .await
        .unwrap();

        assert_eq!(row.get::<i64, _>("ver_rank"), version.rank());
        assert_eq!(row.get::<i64, _>("min_app_rank"), min_app.rank());
    }

    #[tokio::test]
    async fn test_rank_columns_are_not_writable() {
        let (storage, _dir) = create_test_storage().await;
        storage
            .publish(
                &upsert("ro", "Ro", OffsetDateTime::now_utc()),
                &new_artifact("ro", Version::new(1, 0, 0), Version::new(1, 0, 0), b"x"),
            )
            .await
            .unwrap();

        let result = sqlx::query("UPDATE extension_artifacts SET ver_rank = 5")
            .execute(storage.pool())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_artifact_without_extension_is_rejected() {
        let (storage, _dir) = create_test_storage().await;

        let result = artifacts::insert(
            storage.pool(),
            &new_artifact("orphan", Version::new(1, 0, 0), Version::new(1, 0, 0), b"x"),
        )
        .await;

        assert!(matches!(result, Err(RegistryError::Storage(_))));
        assert!(
            storage
                .list_artifacts(&ExtensionId::from("orphan"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_failed_artifact_insert_rolls_back_upsert() {
        let (storage, _dir) = create_test_storage().await;

        sqlx::query(
            r#"
            CREATE TRIGGER reject_artifacts BEFORE INSERT ON extension_artifacts
            BEGIN SELECT RAISE(ABORT, 'rejected'); END
        "#,
        )
        .execute(storage.pool())
        .await
        .unwrap();

        let result = storage
            .publish(
                &upsert("foo.bar", "Foo", OffsetDateTime::now_utc()),
                &new_artifact("foo.bar", Version::new(1, 0, 0), Version::new(1, 0, 0), b"x"),
            )
            .await;

        assert!(matches!(result, Err(RegistryError::Storage(_))));
        assert!(storage.list_extensions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_republish_with_earlier_clock_keeps_updated_at_after_created_at() {
        let (storage, _dir) = create_test_storage().await;
        let first = datetime!(2024-06-01 00:00 UTC);

        storage
            .publish(
                &upsert("a", "First", first),
                &new_artifact("a", Version::new(1, 0, 0), Version::new(1, 0, 0), b"v1"),
            )
            .await
            .unwrap();
        storage
            .publish(
                &upsert("a", "Second", datetime!(2024-05-01 00:00 UTC)),
                &new_artifact("a", Version::new(1, 0, 1), Version::new(1, 0, 0), b"v2"),
            )
            .await
            .unwrap();

        let extension = storage
            .get_extension(&ExtensionId::from("a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(extension.name, "Second");
        assert_eq!(extension.created_at, first);
        assert_eq!(extension.updated_at, first);
        assert!(extension.created_at <= extension.updated_at);

        // A later clock still advances updated_at
        let later = datetime!(2024-07-01 09:15:30.5 UTC);
        storage
            .publish(
                &upsert("a", "Third", later),
                &new_artifact("a", Version::new(1, 0, 2), Version::new(1, 0, 0), b"v3"),
            )
            .await
            .unwrap();
        let extension = storage
            .get_extension(&ExtensionId::from("a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(extension.created_at, first);
        assert_eq!(extension.updated_at, later);
    }

    #[tokio::test]
    async fn test_republish_preserves_download_count() {
        let (storage, _dir) = create_test_storage().await;

        storage
            .publish(
                &upsert("foo.bar", "Foo", datetime!(2024-05-01 12:00 UTC)),
                &new_artifact("foo.bar", Version::new(1, 0, 0), Version::new(1, 0, 0), b"v1"),
            )
            .await
            .unwrap();
        sqlx::query("UPDATE extensions SET downloads = 7 WHERE extension_id = ?")
            .bind("foo.bar")
            .execute(storage.pool())
            .await
            .unwrap();

        storage
            .publish(
                &upsert("foo.bar", "Foo", datetime!(2024-06-01 12:00 UTC)),
                &new_artifact("foo.bar", Version::new(1, 1, 0), Version::new(1, 0, 0), b"v2"),
            )
            .await
            .unwrap();

        let extension = storage
            .get_extension(&ExtensionId::from("foo.bar"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(extension.downloads, 7);
    }

    #[tokio::test]
    async fn test_failed_republish_keeps_previous_metadata() {
        let (storage, _dir) = create_test_storage().await;
        let first = datetime!(2024-05-01 12:00 UTC);

        storage
            .publish(
                &upsert("foo.bar", "Old name", first),
                &new_artifact("foo.bar", Version::new(1, 0, 0), Version::new(1, 0, 0), b"v1"),
            )
            .await
            .unwrap();

        sqlx::query(
            "CREATE TRIGGER reject_artifacts BEFORE INSERT ON extension_artifacts \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(storage.pool())
        .await
        .unwrap();

        let result = storage
            .publish(
                &upsert("foo.bar", "New name", datetime!(2024-06-01 12:00 UTC)),
                &new_artifact("foo.bar", Version::new(2, 0, 0), Version::new(1, 0, 0), b"v2"),
            )
            .await;
        assert!(result.is_err());

        let extension = storage
            .get_extension(&ExtensionId::from("foo.bar"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(extension.name, "Old name");
        assert_eq!(extension.updated_at, first);
    }

    #[tokio::test]
    async fn test_latest_compatible_artifact() {
        let (storage, _dir) = create_test_storage().await;
        let ext = "compat";
        let now = OffsetDateTime::now_utc();

        for (version, min_app) in [
            (Version::new(1, 0, 0), Version::new(0, 1, 0)),
            (Version::new(1, 5, 0), Version::new(0, 9, 0)),
            (Version::new(2, 0, 0), Version::new(2, 0, 0)),
        ] {
            storage
                .publish(&upsert(ext, "Compat", now), &new_artifact(ext, version, min_app, b"x"))
                .await
                .unwrap();
        }

        assert_eq!(pick(&storage, Version::new(0, 0, 9)).await, None);
        assert_eq!(pick(&storage, Version::new(0, 9, 0)).await, Some(Version::new(1, 5, 0)));
        assert_eq!(pick(&storage, Version::new(1, 999, 999)).await, Some(Version::new(1, 5, 0)));
        assert_eq!(pick(&storage, Version::new(2, 0, 0)).await, Some(Version::new(2, 0, 0)));
    }

    async fn pick(storage: &SqliteStorage, app: Version) -> Option<Version> {
        storage
            .latest_compatible_artifact(&ExtensionId::from("compat"), app)
            .await
            .unwrap()
            .map(|artifact| artifact.version)
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let (storage, _dir) = create_test_storage().await;
        storage.migrate().await.unwrap();
        storage.migrate().await.unwrap();
        assert!(storage.list_extensions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_storage_persists_across_calls() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        storage
            .publish(
                &upsert("mem", "Mem", OffsetDateTime::now_utc()),
                &new_artifact("mem", Version::new(0, 1, 0), Version::new(0, 1, 0), b"x"),
            )
            .await
            .unwrap();

        assert_eq!(storage.list_extensions().await.unwrap().len(), 1);
    }
}

//! # Extension Registry
//!
//! A registry for versioned software extensions that provides:
//! - Mutable extension metadata, upserted on every publish
//! - Immutable, append-only artifacts (one per publish)
//! - Atomic publishing: the metadata upsert and artifact insert commit together
//! - Integer version ranks for compatibility queries
//!
//! ## Core Concepts
//!
//! - **Extensions** are identified by an externally chosen id such as `foo.bar`
//! - **Artifacts** are compressed archives stamped with a version and a minimum
//!   host application version, addressed by a generated integer id
//! - **Ranks** map `major.minor.patch` to `major·10⁶ + minor·10³ + patch`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use extension_registry::{Registry, SqliteStorage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = SqliteStorage::new("sqlite:./data/registry.db").await?;
//! let registry = Registry::new(storage);
//!
//! let metadata = r#"{
//!     "extensionId": "foo.bar", "name": "Foo", "authors": ["alice"],
//!     "description": "", "repository": "https://example.com/foo",
//!     "verMajor": 1, "verMinor": 2, "verPatch": 3,
//!     "minAppMajor": 0, "minAppMinor": 5, "minAppPatch": 0
//! }"#;
//! let receipt = registry
//!     .publish_json(metadata, vec![0x1f, 0x8b], time::OffsetDateTime::now_utc())
//!     .await?;
//!
//! let artifact = registry.download(receipt.artifact_id).await?;
//! assert_eq!(artifact.file_name(), "foo.bar-1-2-3.tar.gz");
//! # Ok(())
//! # }
//! ```

pub mod entities;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod storage;
pub mod version;

pub use entities::{Artifact, ArtifactId, ArtifactInfo, Extension, ExtensionId};
pub use error::{MetadataError, RegistryError, Result};
pub use metadata::PublishMetadata;
pub use registry::{PublishReceipt, Registry};
pub use storage::RegistryStorage;
pub use version::{Version, rank};

#[cfg(feature = "sqlite")]
pub use storage::SqliteStorage;

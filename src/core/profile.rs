//! Profile management.
//!
//! Each profile is a folder under the profiles root holding its own database, a
//! `config.json`, an `images/` folder, an optional `preview.png` and a `backups/` folder.
//! Profiles share nothing; the only global state is the last used profile name kept in
//! `<root>/profiles.toml`.

use crate::{
    config::database::open_database,
    core::{folder::copy_dir_all, password::EncryptedPhrase},
    entities::{Client, Product, Supplier, client, product, supplier},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, instrument, warn};

/// Profile configuration file name
pub const CONFIG_FILE: &str = "config.json";
/// Folder holding a profile's backups
pub const BACKUPS_DIR: &str = "backups";
/// Folder holding product and contact pictures
pub const IMAGES_DIR: &str = "images";
/// Optional profile picture
pub const PREVIEW_FILE: &str = "preview.png";
/// Index file at the profiles root
pub const INDEX_FILE: &str = "profiles.toml";

/// Contents of a profile's `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Profile name, equal to its folder name
    pub name: String,
    /// Password validation phrase; `None` for an unprotected profile
    #[serde(default)]
    pub encrypted_phrase: Option<EncryptedPhrase>,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
    /// When the profile was last opened
    #[serde(default)]
    pub last_opened: Option<DateTime<Utc>>,
}

impl ProfileConfig {
    fn new(name: String) -> Self {
        Self {
            name,
            encrypted_phrase: None,
            created_at: Utc::now(),
            last_opened: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileIndex {
    last_profile: Option<String>,
}

/// Creates, lists, copies and removes profile folders under one root.
#[derive(Debug, Clone)]
pub struct ProfileManager {
    root: PathBuf,
}

impl ProfileManager {
    /// Manager for profiles stored under `root`. The folder is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Profiles root folder
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder of profile `name`
    #[must_use]
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Database file of profile `name`
    #[must_use]
    pub fn database_path(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(format!("{name}.db"))
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(CONFIG_FILE)
    }

    /// Checks that `name` can be used as a profile folder name and returns it trimmed.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for blank names, hidden names and anything that is
    /// not a single plain path component.
    pub fn validate_profile_name(name: &str) -> Result<String> {
        let name = name.trim();
        let mut components = Path::new(name).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if name.is_empty() || !single || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(Error::Validation {
                message: format!("Invalid profile name: {name:?}"),
            });
        }
        Ok(name.to_string())
    }

    /// Whether a profile folder with a configuration exists
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.config_path(name).is_file()
    }

    fn require_existing(&self, name: &str) -> Result<String> {
        let name = Self::validate_profile_name(name)?;
        if !self.exists(&name) {
            return Err(Error::NotFound {
                entity: "profile",
                key: name,
            });
        }
        Ok(name)
    }

    fn require_free(&self, name: &str) -> Result<String> {
        let name = Self::validate_profile_name(name)?;
        if self.profile_dir(&name).exists() {
            return Err(Error::Conflict {
                entity: "profile",
                key: name,
            });
        }
        Ok(name)
    }

    /// Names of all profiles, sorted. Folders without a readable `config.json` are skipped.
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(Error::io_at(&self.root))? {
            let entry = entry.map_err(Error::io_at(&self.root))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            match self.load_config(&name) {
                Ok(_) => names.push(name),
                Err(e) => warn!("Skipping profile folder {name}: {e}"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Reads the configuration of profile `name`.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the profile has no `config.json`.
    pub fn load_config(&self, name: &str) -> Result<ProfileConfig> {
        let path = self.config_path(name);
        if !path.is_file() {
            return Err(Error::NotFound {
                entity: "profile",
                key: name.to_string(),
            });
        }
        let contents = fs::read_to_string(&path).map_err(Error::io_at(&path))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes `config` to its profile's `config.json`.
    pub fn save_config(&self, config: &ProfileConfig) -> Result<()> {
        let path = self.config_path(&config.name);
        let contents = serde_json::to_string_pretty(config)?;
        fs::write(&path, contents).map_err(Error::io_at(&path))
    }

    /// Creates an empty profile with a migrated database.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for a bad name and [`Error::Conflict`] if the folder
    /// already exists.
    #[instrument(skip(self))]
    pub async fn create_profile(&self, name: &str) -> Result<ProfileConfig> {
        let name = self.require_free(name)?;
        let dir = self.profile_dir(&name);

        match self.build_profile(&name).await {
            Ok(config) => {
                info!("Created profile {name}");
                Ok(config)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    warn!("Failed to remove partial profile {}: {cleanup}", dir.display());
                }
                Err(e)
            }
        }
    }

    async fn build_profile(&self, name: &str) -> Result<ProfileConfig> {
        let dir = self.profile_dir(name);
        for sub in [IMAGES_DIR, BACKUPS_DIR] {
            let path = dir.join(sub);
            fs::create_dir_all(&path).map_err(Error::io_at(&path))?;
        }

        let db = open_database(&self.database_path(name)).await?;
        db.close().await?;

        let config = ProfileConfig::new(name.to_string());
        self.save_config(&config)?;
        Ok(config)
    }

    /// Creates profile `dst` with a copy of `src`'s products, clients and suppliers,
    /// its images and its preview picture.
    ///
    /// Sales, imports and the password are not copied.
    #[instrument(skip(self))]
    pub async fn duplicate_profile(&self, src: &str, dst: &str) -> Result<ProfileConfig> {
        let src = self.require_existing(src)?;
        let config = self.create_profile(dst).await?;

        if let Err(e) = self.copy_profile_contents(&src, &config.name).await {
            let dir = self.profile_dir(&config.name);
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                warn!("Failed to remove partial profile {}: {cleanup}", dir.display());
            }
            return Err(e);
        }

        info!("Duplicated profile {src} to {}", config.name);
        Ok(config)
    }

    async fn copy_profile_contents(&self, src: &str, dst: &str) -> Result<()> {
        let source = open_database(&self.database_path(src)).await?;
        let target = open_database(&self.database_path(dst)).await?;
        let copied = copy_catalog(&source, &target).await;
        source.close().await?;
        target.close().await?;
        copied?;

        let images = self.profile_dir(src).join(IMAGES_DIR);
        if images.is_dir() {
            copy_dir_all(&images, &self.profile_dir(dst).join(IMAGES_DIR), &[])?;
        }
        let preview = self.profile_dir(src).join(PREVIEW_FILE);
        if preview.is_file() {
            let target = self.profile_dir(dst).join(PREVIEW_FILE);
            fs::copy(&preview, &target).map_err(Error::io_at(&preview))?;
        }
        Ok(())
    }

    /// Renames a profile folder, its database file and its configuration.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if `old` does not exist and [`Error::Conflict`] if
    /// `new` is taken.
    #[instrument(skip(self))]
    pub fn rename_profile(&self, old: &str, new: &str) -> Result<ProfileConfig> {
        let old = self.require_existing(old)?;
        let new = Self::validate_profile_name(new)?;
        if old == new {
            return self.load_config(&old);
        }
        let new = self.require_free(&new)?;

        let old_dir = self.profile_dir(&old);
        let new_dir = self.profile_dir(&new);
        fs::rename(&old_dir, &new_dir).map_err(Error::io_at(&old_dir))?;

        let old_db = new_dir.join(format!("{old}.db"));
        if old_db.is_file() {
            let new_db = self.database_path(&new);
            fs::rename(&old_db, &new_db).map_err(Error::io_at(&old_db))?;
        }

        let mut config = self.load_config(&new)?;
        config.name.clone_from(&new);
        self.save_config(&config)?;

        if self.read_index()?.last_profile.as_deref() == Some(old.as_str()) {
            self.set_last_used_profile(Some(&new))?;
        }
        info!("Renamed profile {old} to {new}");
        Ok(config)
    }

    /// Deletes a profile folder and everything in it, backups included.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the profile does not exist.
    #[instrument(skip(self))]
    pub fn delete_profile(&self, name: &str) -> Result<()> {
        let name = self.require_existing(name)?;
        let dir = self.profile_dir(&name);
        fs::remove_dir_all(&dir).map_err(Error::io_at(&dir))?;

        if self.read_index()?.last_profile.as_deref() == Some(name.as_str()) {
            self.set_last_used_profile(None)?;
        }
        info!("Deleted profile {name}");
        Ok(())
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn read_index(&self) -> Result<ProfileIndex> {
        let path = self.index_path();
        if !path.is_file() {
            return Ok(ProfileIndex::default());
        }
        let contents = fs::read_to_string(&path).map_err(Error::io_at(&path))?;
        toml::from_str(&contents).map_err(|e| Error::Config {
            message: format!("Failed to parse {}: {e}", path.display()),
        })
    }

    /// The profile opened most recently, if it still exists.
    pub fn last_used_profile(&self) -> Result<Option<String>> {
        Ok(self
            .read_index()?
            .last_profile
            .filter(|name| self.exists(name)))
    }

    /// Records (or clears) the last used profile.
    pub fn set_last_used_profile(&self, name: Option<&str>) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(Error::io_at(&self.root))?;
        let index = ProfileIndex {
            last_profile: name.map(str::to_string),
        };
        let contents = toml::to_string(&index).map_err(|e| Error::Config {
            message: format!("Failed to write profile index: {e}"),
        })?;
        let path = self.index_path();
        fs::write(&path, contents).map_err(Error::io_at(&path))
    }

    /// Makes a restored profile match its folder name again. A backup taken before a
    /// rename carries the old name in `config.json` and in its database file name.
    pub fn adopt_folder_name(&self, name: &str) -> Result<ProfileConfig> {
        let mut config = self.load_config(name)?;
        if config.name == name {
            return Ok(config);
        }

        let old_db = self.profile_dir(name).join(format!("{}.db", config.name));
        let new_db = self.database_path(name);
        if old_db.is_file() && !new_db.exists() {
            fs::rename(&old_db, &new_db).map_err(Error::io_at(&old_db))?;
        }
        warn!("Profile {name} was restored with name {}; renaming", config.name);
        config.name = name.to_string();
        self.save_config(&config)?;
        Ok(config)
    }

    /// Stamps `last_opened` and records `name` as the last used profile.
    pub fn mark_opened(&self, name: &str) -> Result<ProfileConfig> {
        let mut config = self.load_config(name)?;
        config.last_opened = Some(Utc::now());
        self.save_config(&config)?;
        self.set_last_used_profile(Some(name))?;
        Ok(config)
    }
}

/// Rows per INSERT statement when copying a catalog, well under `SQLite`'s bound
/// variable limit for the widest catalog table.
const INSERT_CHUNK: usize = 500;

/// Copies catalog rows with their ids from `source` into the empty `target`.
async fn copy_catalog(source: &DatabaseConnection, target: &DatabaseConnection) -> Result<()> {
    let products: Vec<product::ActiveModel> = Product::find()
        .all(source)
        .await?
        .into_iter()
        .map(|m| product::ActiveModel::from(m).reset_all())
        .collect();
    let clients: Vec<client::ActiveModel> = Client::find()
        .all(source)
        .await?
        .into_iter()
        .map(|m| client::ActiveModel::from(m).reset_all())
        .collect();
    let suppliers: Vec<supplier::ActiveModel> = Supplier::find()
        .all(source)
        .await?
        .into_iter()
        .map(|m| supplier::ActiveModel::from(m).reset_all())
        .collect();

    let txn = target.begin().await?;
    insert_chunked(&txn, &products).await?;
    insert_chunked(&txn, &clients).await?;
    insert_chunked(&txn, &suppliers).await?;
    txn.commit().await?;
    Ok(())
}

async fn insert_chunked<A, C>(db: &C, rows: &[A]) -> Result<()>
where
    A: ActiveModelTrait,
    C: ConnectionTrait,
{
    for chunk in rows.chunks(INSERT_CHUNK) {
        <A::Entity as EntityTrait>::insert_many(chunk.to_vec())
            .exec(db)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{contact::ContactInput, product::ProductInput, sale};
    use crate::test_utils::*;

    #[test]
    fn test_validate_profile_name() {
        assert_eq!(ProfileManager::validate_profile_name("  Shop ").unwrap(), "Shop");
        for bad in ["", "   ", "..", ".hidden", "a/b", "a\\b", "/abs"] {
            assert!(
                matches!(
                    ProfileManager::validate_profile_name(bad),
                    Err(Error::Validation { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_create_profile_layout() -> Result<()> {
        let (_tmp, manager) = temp_profiles();

        let config = manager.create_profile("Shop").await?;
        assert_eq!(config.name, "Shop");
        assert!(config.encrypted_phrase.is_none());

        let dir = manager.profile_dir("Shop");
        assert!(dir.join(IMAGES_DIR).is_dir());
        assert!(dir.join(BACKUPS_DIR).is_dir());
        assert!(dir.join(CONFIG_FILE).is_file());
        assert!(manager.database_path("Shop").is_file());
        assert_eq!(manager.load_config("Shop")?, config);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_profile_conflict() -> Result<()> {
        let (_tmp, manager) = temp_profiles();
        manager.create_profile("Shop").await?;

        let result = manager.create_profile("Shop").await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_profiles_sorted_and_filtered() -> Result<()> {
        let (_tmp, manager) = temp_profiles();
        assert!(manager.list_profiles()?.is_empty());

        manager.create_profile("Zeta").await?;
        manager.create_profile("Alpha").await?;
        fs::create_dir_all(manager.root().join("stray")).unwrap();

        assert_eq!(manager.list_profiles()?, vec!["Alpha", "Zeta"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_profile_copies_catalog_only() -> Result<()> {
        let (_tmp, manager) = temp_profiles();
        manager.create_profile("Shop").await?;

        let db = open_database(&manager.database_path("Shop")).await?;
        let product =
            crate::core::product::create_product(&db, &ProductInput::new("Iron", 2.0, 3.0))
                .await?;
        let client =
            crate::core::client::create_client(&db, &ContactInput::named("Acme")).await?;
        crate::core::supplier::create_supplier(&db, &ContactInput::named("Forge")).await?;
        let sale = create_test_sale(&db, Some(client.id)).await?;
        sale::add_sale_item(&db, sale.id, product.id, 1, 3.0).await?;
        db.close().await?;

        let images = manager.profile_dir("Shop").join(IMAGES_DIR);
        fs::write(images.join("iron.png"), b"png").unwrap();
        fs::write(manager.profile_dir("Shop").join(PREVIEW_FILE), b"preview").unwrap();

        let copy = manager.duplicate_profile("Shop", "Shop Copy").await?;
        assert!(copy.encrypted_phrase.is_none());

        let db = open_database(&manager.database_path("Shop Copy")).await?;
        let products = crate::core::product::get_all_products(&db).await?;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, product.id);
        assert_eq!(products[0].name, "Iron");
        assert_eq!(crate::core::client::get_all_clients(&db).await?.len(), 1);
        assert_eq!(crate::core::supplier::get_all_suppliers(&db).await?.len(), 1);
        assert!(sale::query_sales(&db, &Default::default()).await?.is_empty());
        db.close().await?;

        let copy_dir = manager.profile_dir("Shop Copy");
        assert_eq!(fs::read(copy_dir.join(IMAGES_DIR).join("iron.png")).unwrap(), b"png");
        assert_eq!(fs::read(copy_dir.join(PREVIEW_FILE)).unwrap(), b"preview");

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_profile_with_large_catalog() -> Result<()> {
        let (_tmp, manager) = temp_profiles();
        manager.create_profile("Shop").await?;

        // More rows than a single INSERT may bind
        let count = 4000;
        let now = Utc::now().naive_utc();
        let db = open_database(&manager.database_path("Shop")).await?;
        let rows: Vec<product::ActiveModel> = (0..count)
            .map(|i| product::ActiveModel {
                name: sea_orm::Set(format!("Item {i:04}")),
                unit_price: sea_orm::Set(1.0),
                sale_price: sea_orm::Set(2.0),
                category: sea_orm::Set(String::new()),
                description: sea_orm::Set(String::new()),
                preview_image: sea_orm::Set(None),
                created_at: sea_orm::Set(now),
                updated_at: sea_orm::Set(now),
                ..Default::default()
            })
            .collect();
        insert_chunked(&db, &rows).await?;
        db.close().await?;

        manager.duplicate_profile("Shop", "Copy").await?;

        let db = open_database(&manager.database_path("Copy")).await?;
        let products = crate::core::product::get_all_products(&db).await?;
        assert_eq!(products.len(), count);
        assert!(products.iter().any(|p| p.name == "Item 3999"));
        db.close().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_missing_profile() -> Result<()> {
        let (_tmp, manager) = temp_profiles();

        let result = manager.duplicate_profile("Ghost", "Copy").await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert!(!manager.profile_dir("Copy").exists());

        Ok(())
    }

    #[tokio::test]
    async fn test_rename_profile_follows_last_used() -> Result<()> {
        let (_tmp, manager) = temp_profiles();
        manager.create_profile("Old").await?;
        manager.mark_opened("Old")?;

        let config = manager.rename_profile("Old", "New")?;
        assert_eq!(config.name, "New");
        assert!(!manager.profile_dir("Old").exists());
        assert!(manager.database_path("New").is_file());
        assert_eq!(manager.last_used_profile()?, Some("New".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_profile_clears_last_used() -> Result<()> {
        let (_tmp, manager) = temp_profiles();
        manager.create_profile("Shop").await?;
        manager.set_last_used_profile(Some("Shop"))?;

        manager.delete_profile("Shop")?;
        assert!(!manager.profile_dir("Shop").exists());
        assert_eq!(manager.last_used_profile()?, None);

        let result = manager.delete_profile("Shop");
        assert!(matches!(result, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_adopt_folder_name_after_restore() -> Result<()> {
        let (_tmp, manager) = temp_profiles();
        manager.create_profile("Old").await?;
        fs::rename(manager.profile_dir("Old"), manager.profile_dir("New")).unwrap();

        let config = manager.adopt_folder_name("New")?;
        assert_eq!(config.name, "New");
        assert!(manager.database_path("New").is_file());
        assert_eq!(manager.load_config("New")?.name, "New");

        Ok(())
    }

    #[tokio::test]
    async fn test_mark_opened_sets_timestamp() -> Result<()> {
        let (_tmp, manager) = temp_profiles();
        manager.create_profile("Shop").await?;

        let config = manager.mark_opened("Shop")?;
        assert!(config.last_opened.is_some());
        assert_eq!(manager.load_config("Shop")?.last_opened, config.last_opened);

        Ok(())
    }
}

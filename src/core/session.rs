//! The open profile, its database connection and its password gate.
//!
//! All data access goes through [`Session::database`], which refuses while no profile is
//! open or while the profile is locked. Backup and restore close the connection around
//! the file copy and reopen it afterwards.

use crate::{
    config::database::open_database,
    core::{
        backup::{BackupInfo, BackupManager},
        password::{EncryptedPhrase, KdfParams, LockState, PasswordGate},
        profile::{ProfileConfig, ProfileManager},
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use tracing::{info, instrument};

#[derive(Debug)]
struct ActiveProfile {
    config: ProfileConfig,
    db: DatabaseConnection,
}

/// Single-user session over a profiles root.
#[derive(Debug)]
pub struct Session {
    profiles: ProfileManager,
    active: Option<ActiveProfile>,
    gate: PasswordGate,
}

impl Session {
    /// Session with the default key derivation cost.
    #[must_use]
    pub fn new(profiles: ProfileManager) -> Self {
        Self::with_kdf_params(profiles, KdfParams::default())
    }

    /// Session deriving new password keys with `params`.
    #[must_use]
    pub const fn with_kdf_params(profiles: ProfileManager, params: KdfParams) -> Self {
        Self {
            profiles,
            active: None,
            gate: PasswordGate::new(params),
        }
    }

    /// The profile manager this session works on
    #[must_use]
    pub const fn profiles(&self) -> &ProfileManager {
        &self.profiles
    }

    /// Configuration of the open profile
    #[must_use]
    pub fn active_profile(&self) -> Option<&ProfileConfig> {
        self.active.as_ref().map(|active| &active.config)
    }

    /// Lock state of the open profile
    #[must_use]
    pub const fn lock_state(&self) -> LockState {
        self.gate.state()
    }

    fn active(&self) -> Result<&ActiveProfile> {
        self.active.as_ref().ok_or(Error::NoActiveProfile)
    }

    /// Connection to the open profile's database.
    ///
    /// # Errors
    /// Returns [`Error::NoActiveProfile`] with no profile open and
    /// [`Error::SessionLocked`] while the profile is locked.
    pub fn database(&self) -> Result<&DatabaseConnection> {
        let active = self.active()?;
        if !self.gate.is_unlocked() {
            return Err(Error::SessionLocked);
        }
        Ok(&active.db)
    }

    /// Opens profile `name`, closing the current one first. A password protected
    /// profile starts locked.
    #[instrument(skip(self))]
    pub async fn open_profile(&mut self, name: &str) -> Result<&ProfileConfig> {
        self.close_profile().await?;

        let config = self.profiles.mark_opened(name)?;
        let db = open_database(&self.profiles.database_path(&config.name)).await?;
        self.gate.reset_for(config.encrypted_phrase.clone());
        info!(
            "Opened profile {} ({:?})",
            config.name,
            self.gate.state()
        );

        Ok(&self.active.insert(ActiveProfile { config, db }).config)
    }

    /// Closes the open profile, if any.
    pub async fn close_profile(&mut self) -> Result<()> {
        self.gate.reset_for(None);
        if let Some(active) = self.active.take() {
            active.db.close().await?;
            info!("Closed profile {}", active.config.name);
        }
        Ok(())
    }

    /// Unlocks the open profile.
    ///
    /// # Errors
    /// Returns [`Error::AuthFailure`] for a wrong password.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        self.active()?;
        self.gate.validate(password)
    }

    /// Locks the open profile.
    pub fn logout(&mut self) {
        self.gate.logout();
    }

    /// Protects the open profile with `new_password`. The profile must be unlocked.
    pub fn set_password(&mut self, new_password: &str) -> Result<()> {
        self.active()?;
        let phrase = self.gate.set_password(new_password)?.clone();
        self.store_phrase(Some(phrase))
    }

    /// Replaces the password of the open profile.
    pub fn change_password(&mut self, old_password: &str, new_password: &str) -> Result<()> {
        self.active()?;
        let phrase = self
            .gate
            .change_password(old_password, new_password)?
            .clone();
        self.store_phrase(Some(phrase))
    }

    /// Removes the password of the open profile.
    pub fn remove_password(&mut self, password: &str) -> Result<()> {
        self.active()?;
        self.gate.remove_password(password)?;
        self.store_phrase(None)
    }

    fn store_phrase(&mut self, phrase: Option<EncryptedPhrase>) -> Result<()> {
        let active = self.active.as_mut().ok_or(Error::NoActiveProfile)?;
        active.config.encrypted_phrase = phrase;
        self.profiles.save_config(&active.config)
    }

    /// Backup manager of the open profile. The profile must be unlocked.
    pub fn backups(&self) -> Result<BackupManager> {
        self.database()?;
        let name = &self.active()?.config.name;
        Ok(BackupManager::new(self.profiles.profile_dir(name)))
    }

    /// Runs `op` on the open profile's name with its database closed, then reopens it.
    async fn with_database_closed<T>(
        &mut self,
        op: impl FnOnce(&ProfileManager, &str) -> Result<T>,
    ) -> Result<T> {
        let active = self.active.take().ok_or(Error::NoActiveProfile)?;
        let name = active.config.name.clone();
        active.db.close().await?;

        let outcome = op(&self.profiles, &name);
        let reopened = self.reopen(&name).await;
        let value = outcome?;
        reopened?;
        Ok(value)
    }

    async fn reopen(&mut self, name: &str) -> Result<()> {
        let config = self.profiles.load_config(name)?;
        let db = open_database(&self.profiles.database_path(name)).await?;
        self.active = Some(ActiveProfile { config, db });
        Ok(())
    }

    /// Backs up the open profile.
    pub async fn create_backup(&mut self, name: Option<&str>) -> Result<BackupInfo> {
        let backups = self.backups()?;
        self.with_database_closed(|_, _| backups.create_backup(name))
            .await
    }

    /// Restores the open profile from backup `name`.
    ///
    /// The restored configuration decides the lock state: a backup taken while the
    /// profile had a password comes back locked.
    #[instrument(skip(self))]
    pub async fn restore_backup(&mut self, name: &str) -> Result<()> {
        let backups = self.backups()?;
        self.with_database_closed(|profiles, profile| {
            backups.restore_backup(name)?;
            profiles.adopt_folder_name(profile).map(|_| ())
        })
        .await?;

        let phrase = self.active()?.config.encrypted_phrase.clone();
        self.gate.reset_for(phrase);
        Ok(())
    }

    /// Renames profile `old`. When it is the open profile it is reopened under the new
    /// name and keeps its lock state.
    pub async fn rename_profile(&mut self, old: &str, new: &str) -> Result<ProfileConfig> {
        let is_active = self
            .active_profile()
            .is_some_and(|config| config.name == old.trim());
        if !is_active {
            return self.profiles.rename_profile(old, new);
        }

        let active = self.active.take().ok_or(Error::NoActiveProfile)?;
        active.db.close().await?;
        let renamed = self.profiles.rename_profile(old, new);

        let name = match &renamed {
            Ok(config) => config.name.clone(),
            Err(_) => active.config.name,
        };
        let reopened = self.reopen(&name).await;
        let config = renamed?;
        reopened?;
        Ok(config)
    }

    /// Deletes profile `name`, closing it first when it is open.
    pub async fn delete_profile(&mut self, name: &str) -> Result<()> {
        if self
            .active_profile()
            .is_some_and(|config| config.name == name.trim())
        {
            self.close_profile().await?;
        }
        self.profiles.delete_profile(name)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::product::{self, ProductInput};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_database_requires_open_profile() -> Result<()> {
        let (_tmp, session) = temp_session();
        assert!(matches!(session.database(), Err(Error::NoActiveProfile)));
        Ok(())
    }

    #[tokio::test]
    async fn test_unprotected_profile_opens_unlocked() -> Result<()> {
        let (_tmp, mut session) = temp_session();
        session.profiles().create_profile("Shop").await?;

        session.open_profile("Shop").await?;
        assert_eq!(session.lock_state(), LockState::Unlocked);
        product::create_product(session.database()?, &ProductInput::new("Iron", 1.0, 2.0))
            .await?;
        assert_eq!(
            session.profiles().last_used_profile()?,
            Some("Shop".to_string())
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_password_gates_data_access() -> Result<()> {
        let (_tmp, mut session) = temp_session();
        session.profiles().create_profile("Shop").await?;
        session.open_profile("Shop").await?;
        session.set_password("secret")?;

        session.logout();
        assert!(matches!(session.database(), Err(Error::SessionLocked)));
        assert!(matches!(session.unlock("wrong"), Err(Error::AuthFailure)));
        assert_eq!(session.lock_state(), LockState::Locked);

        session.unlock("secret")?;
        assert!(session.database().is_ok());

        session.open_profile("Shop").await?;
        assert_eq!(session.lock_state(), LockState::Locked);

        Ok(())
    }

    #[tokio::test]
    async fn test_password_changes_are_persisted() -> Result<()> {
        let (_tmp, mut session) = temp_session();
        session.profiles().create_profile("Shop").await?;
        session.open_profile("Shop").await?;

        session.set_password("one")?;
        assert!(session.profiles().load_config("Shop")?.encrypted_phrase.is_some());

        session.change_password("one", "two")?;
        session.open_profile("Shop").await?;
        assert!(session.unlock("one").is_err());
        session.unlock("two")?;

        session.remove_password("two")?;
        assert!(session.profiles().load_config("Shop")?.encrypted_phrase.is_none());
        session.open_profile("Shop").await?;
        assert_eq!(session.lock_state(), LockState::Unlocked);

        Ok(())
    }

    #[tokio::test]
    async fn test_backup_and_restore_reopen_database() -> Result<()> {
        let (_tmp, mut session) = temp_session();
        session.profiles().create_profile("Shop").await?;
        session.open_profile("Shop").await?;
        product::create_product(session.database()?, &ProductInput::new("Iron", 1.0, 2.0))
            .await?;

        let backup = session.create_backup(Some("before")).await?;
        assert_eq!(backup.name, "before");

        product::create_product(session.database()?, &ProductInput::new("Wool", 1.0, 2.0))
            .await?;
        assert_eq!(product::get_all_products(session.database()?).await?.len(), 2);

        session.restore_backup("before").await?;
        let products = product::get_all_products(session.database()?).await?;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Iron");

        Ok(())
    }

    #[tokio::test]
    async fn test_restore_missing_backup_keeps_profile_open() -> Result<()> {
        let (_tmp, mut session) = temp_session();
        session.profiles().create_profile("Shop").await?;
        session.open_profile("Shop").await?;

        let result = session.restore_backup("ghost").await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert!(session.database().is_ok());

        Ok(())
    }

    #[tokio::test]
    async fn test_backups_refused_while_locked() -> Result<()> {
        let (_tmp, mut session) = temp_session();
        session.profiles().create_profile("Shop").await?;
        session.open_profile("Shop").await?;
        session.set_password("secret")?;
        session.logout();

        let result = session.create_backup(None).await;
        assert!(matches!(result, Err(Error::SessionLocked)));

        Ok(())
    }

    #[tokio::test]
    async fn test_rename_and_delete_active_profile() -> Result<()> {
        let (_tmp, mut session) = temp_session();
        session.profiles().create_profile("Shop").await?;
        session.open_profile("Shop").await?;

        let config = session.rename_profile("Shop", "Store").await?;
        assert_eq!(config.name, "Store");
        assert_eq!(session.active_profile().unwrap().name, "Store");
        assert!(session.database().is_ok());

        session.delete_profile("Store").await?;
        assert!(session.active_profile().is_none());
        assert!(session.profiles().list_profiles()?.is_empty());

        Ok(())
    }
}

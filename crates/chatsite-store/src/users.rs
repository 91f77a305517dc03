use chatsite_types::models::{User, UsersDocument};
use tracing::debug;

use crate::{Result, Store, StoreError, read_document, write_document};

impl Store {
    // -- Users --

    pub fn list_users(&self) -> Result<Vec<User>> {
        let doc: UsersDocument = read_document(&self.users_path())?;
        Ok(doc.users)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.list_users()?.into_iter().find(|u| u.email == email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.list_users()?.into_iter().find(|u| u.username == username))
    }

    /// Emails of every user whose `profile.avatar` is `avatar`.
    pub fn users_with_avatar(&self, avatar: &str) -> Result<Vec<String>> {
        Ok(self
            .list_users()?
            .into_iter()
            .filter(|u| u.profile.avatar == avatar)
            .map(|u| u.email)
            .collect())
    }

    /// Append a new user. Email is checked before username.
    pub fn create_user(&self, user: User) -> Result<()> {
        self.with_write_lock(|| {
            let path = self.users_path();
            let mut doc: UsersDocument = read_document(&path)?;

            if doc.users.iter().any(|u| u.email == user.email) {
                return Err(StoreError::EmailTaken);
            }
            if doc.users.iter().any(|u| u.username == user.username) {
                return Err(StoreError::UsernameTaken);
            }

            debug!("Creating user {} <{}>", user.username, user.email);
            doc.users.push(user);
            write_document(&path, &doc)
        })
    }

    /// Replace the user currently stored under `original_email`.
    pub fn update_user(&self, original_email: &str, updated: User) -> Result<()> {
        self.with_write_lock(|| {
            let path = self.users_path();
            let mut doc: UsersDocument = read_document(&path)?;

            if doc
                .users
                .iter()
                .any(|u| u.username == updated.username && u.email != original_email)
            {
                return Err(StoreError::UsernameTaken);
            }

            let slot = doc
                .users
                .iter_mut()
                .find(|u| u.email == original_email)
                .ok_or(StoreError::UserNotFound)?;
            *slot = updated;

            write_document(&path, &doc)
        })
    }
}

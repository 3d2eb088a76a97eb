use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::User,
    store::kv::KvStore,
};

fn email_key(email: &str) -> String {
    format!("user:email:{}", email)
}

fn id_key(id: &Uuid) -> String {
    format!("user:id:{}", id)
}

/// Demo accounts, keyed by lowercased email with a secondary id index.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn KvStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Inserts `user` unless its email is taken. Returns `false` on conflict.
    pub async fn create(&self, user: &User) -> Result<bool> {
        let json = sonic_rs::to_string(user)
            .map_err(|e| AppError::Serialization(format!("User serialization failed: {}", e)))?;

        if !self
            .store
            .insert_if_absent(&email_key(&user.email), json, None)
            .await?
        {
            return Ok(false);
        }

        self.store
            .set(&id_key(&user.id), user.email.clone(), None)
            .await?;
        Ok(true)
    }

    /// Finds a user by their (already normalized) email address.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.store
            .get(&email_key(email))
            .await?
            .map(|json| {
                sonic_rs::from_str::<User>(&json)
                    .map_err(|e| AppError::Serialization(format!("Corrupt user record: {}", e)))
            })
            .transpose()
    }

    /// Finds a user by their ID.
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        match self.store.get(&id_key(id)).await? {
            Some(email) => self.find_by_email(&email).await,
            None => Ok(None),
        }
    }
}

//! Turns a stored or supplied admin key into an [`AdminSession`].
//!
//! There is no built-in fallback key: with nothing supplied and nothing
//! stored, opening a session fails before any request is made.

use legality_store::CredentialStore;
use legality_sync::{AdminKey, AdminSession};
use tracing::{debug, info};

use crate::DeskError;

pub struct AdminGate {
    store: CredentialStore,
}

impl AdminGate {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Open a session from `explicit` if given, otherwise from the stored key.
    ///
    /// An explicit key is used for this session only and is not persisted.
    pub fn open(&self, explicit: Option<&str>) -> Result<AdminSession, DeskError> {
        let raw = match explicit {
            Some(key) => {
                debug!("using admin key supplied for this session");
                Some(key.to_string())
            }
            None => self.store.load()?,
        };
        let key = raw
            .and_then(|k| AdminKey::new(k).ok())
            .ok_or(DeskError::MissingCredential)?;
        Ok(AdminSession::new(key))
    }

    /// Store `key` for later sessions and return a session using it.
    pub fn login(&self, key: &str) -> Result<AdminSession, DeskError> {
        let key = AdminKey::new(key).map_err(|_| DeskError::MissingCredential)?;
        self.store.save(key.expose())?;
        info!("admin login stored");
        Ok(AdminSession::new(key))
    }

    /// Forget the stored key. Returns whether one was stored.
    pub fn logout(&self) -> Result<bool, DeskError> {
        Ok(self.store.clear()?)
    }
}

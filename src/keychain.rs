use std::collections::HashMap;
use std::sync::Mutex;

use keyring::Entry;
use tracing::{info, warn};

use crate::error::NutriLifeError;

/// Keychain account every NutriLife secret is stored under.
pub const KEYCHAIN_ACCOUNT: &str = "nutrilife";

pub const GEMINI_SERVICE: &str = "nutrilife-gemini-api";
pub const FIREBASE_SERVICE: &str = "nutrilife-firebase-api";
/// Holds the refresh token of the signed-in user.
pub const SESSION_SERVICE: &str = "nutrilife-session";

/// Named secrets keyed by service.
pub trait SecretStore: Send + Sync {
    fn get(&self, service: &str) -> Result<Option<String>, NutriLifeError>;
    fn set(&self, service: &str, secret: &str) -> Result<(), NutriLifeError>;
    /// Remove the secret; removing a missing secret succeeds.
    fn delete(&self, service: &str) -> Result<(), NutriLifeError>;
}

/// Secrets kept in the OS keychain.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeychainStore;

fn entry(service: &str) -> Result<Entry, NutriLifeError> {
    Entry::new(service, KEYCHAIN_ACCOUNT).map_err(|e| {
        warn!("Failed to create keyring entry for {}: {}", service, e);
        NutriLifeError::Keychain(e.to_string())
    })
}

impl SecretStore for KeychainStore {
    fn get(&self, service: &str) -> Result<Option<String>, NutriLifeError> {
        match entry(service)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => {
                info!("No secret stored for service: {}", service);
                Ok(None)
            }
            Err(e) => {
                warn!("Failed to get password for {}: {}", service, e);
                Err(NutriLifeError::Keychain(e.to_string()))
            }
        }
    }

    fn set(&self, service: &str, secret: &str) -> Result<(), NutriLifeError> {
        info!("Storing secret for service: {}", service);
        entry(service)?.set_password(secret).map_err(|e| {
            warn!("Failed to set password for {}: {}", service, e);
            NutriLifeError::Keychain(e.to_string())
        })
    }

    fn delete(&self, service: &str) -> Result<(), NutriLifeError> {
        info!("Deleting secret for service: {}", service);
        match entry(service)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!("Failed to delete credential for {}: {}", service, e);
                Err(NutriLifeError::Keychain(e.to_string()))
            }
        }
    }
}

/// In-process secrets that vanish on exit. Used where no keychain is
/// available.
#[derive(Debug, Default)]
pub struct MemorySecrets {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecrets {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, NutriLifeError> {
        self.secrets
            .lock()
            .map_err(|_| NutriLifeError::Keychain("secret store lock poisoned".to_string()))
    }
}

impl SecretStore for MemorySecrets {
    fn get(&self, service: &str) -> Result<Option<String>, NutriLifeError> {
        Ok(self.lock()?.get(service).cloned())
    }

    fn set(&self, service: &str, secret: &str) -> Result<(), NutriLifeError> {
        self.lock()?.insert(service.to_string(), secret.to_string());
        Ok(())
    }

    fn delete(&self, service: &str) -> Result<(), NutriLifeError> {
        self.lock()?.remove(service);
        Ok(())
    }
}

/// Look up an API key in `secrets`, falling back to the environment
/// variable `env_var` when none is stored.
pub fn resolve_api_key(
    secrets: &dyn SecretStore,
    service: &str,
    env_var: &str,
) -> Result<Option<String>, NutriLifeError> {
    if let Some(key) = secrets.get(service)?.filter(|k| !k.trim().is_empty()) {
        return Ok(Some(key));
    }
    Ok(std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_secrets() {
        let secrets = MemorySecrets::new();
        assert_eq!(secrets.get(GEMINI_SERVICE).unwrap(), None);
        secrets.set(GEMINI_SERVICE, "abc").unwrap();
        assert_eq!(secrets.get(GEMINI_SERVICE).unwrap(), Some("abc".to_string()));
        secrets.delete(GEMINI_SERVICE).unwrap();
        secrets.delete(GEMINI_SERVICE).unwrap();
        assert_eq!(secrets.get(GEMINI_SERVICE).unwrap(), None);
    }

    #[test]
    fn test_resolve_prefers_stored_key() {
        let secrets = MemorySecrets::new();
        secrets.set(FIREBASE_SERVICE, "stored").unwrap();
        let key = resolve_api_key(&secrets, FIREBASE_SERVICE, "NUTRILIFE_TEST_UNSET_VAR").unwrap();
        assert_eq!(key, Some("stored".to_string()));
    }

    #[test]
    fn test_resolve_missing_key() {
        let secrets = MemorySecrets::new();
        let key = resolve_api_key(&secrets, GEMINI_SERVICE, "NUTRILIFE_TEST_UNSET_VAR").unwrap();
        assert_eq!(key, None);
    }
}

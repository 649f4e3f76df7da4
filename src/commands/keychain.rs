use std::fmt;

use tracing::info;

use crate::keychain::{SecretStore, FIREBASE_SERVICE, GEMINI_SERVICE};

/// API keys the user can manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyService {
    Gemini,
    Firebase,
}

impl KeyService {
    pub fn service(self) -> &'static str {
        match self {
            KeyService::Gemini => GEMINI_SERVICE,
            KeyService::Firebase => FIREBASE_SERVICE,
        }
    }
}

impl fmt::Display for KeyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyService::Gemini => f.write_str("gemini"),
            KeyService::Firebase => f.write_str("firebase"),
        }
    }
}

pub fn set_api_key(secrets: &dyn SecretStore, service: KeyService, key: &str) -> Result<(), String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("API key cannot be empty.".to_string());
    }
    info!("Setting {} API key", service);
    secrets.set(service.service(), key)?;
    Ok(())
}

pub fn get_api_key(secrets: &dyn SecretStore, service: KeyService) -> Result<Option<String>, String> {
    Ok(secrets.get(service.service())?)
}

pub fn delete_api_key(secrets: &dyn SecretStore, service: KeyService) -> Result<(), String> {
    info!("Deleting {} API key", service);
    secrets.delete(service.service())?;
    Ok(())
}

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keychain::MemorySecrets;

    #[test]
    fn test_set_get_delete() {
        let secrets = MemorySecrets::new();
        set_api_key(&secrets, KeyService::Gemini, "  abc123  ").unwrap();
        assert_eq!(
            get_api_key(&secrets, KeyService::Gemini).unwrap(),
            Some("abc123".to_string())
        );
        assert_eq!(get_api_key(&secrets, KeyService::Firebase).unwrap(), None);
        delete_api_key(&secrets, KeyService::Gemini).unwrap();
        assert_eq!(get_api_key(&secrets, KeyService::Gemini).unwrap(), None);
    }

    #[test]
    fn test_empty_key_rejected() {
        let secrets = MemorySecrets::new();
        assert!(set_api_key(&secrets, KeyService::Firebase, "   ").is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("AIzaSyExample1234"), "*************1234");
        assert_eq!(mask_secret("abc"), "***");
    }
}

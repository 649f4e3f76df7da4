use thiserror::Error;

#[derive(Debug, Error)]
pub enum NutriLifeError {
    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<NutriLifeError> for String {
    fn from(err: NutriLifeError) -> Self {
        err.to_string()
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GryptError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown encryption scheme: {0}")]
    UnknownScheme(String),

    #[error("Invalid envelope: {0}")]
    Format(String),

    #[error("Scheme mismatch: envelope uses {envelope}, key is bound to {key}")]
    SchemeMismatch { envelope: String, key: String },

    /// Tag verification failed. Either the content was tampered with or the
    /// key is not the one it was sealed with.
    #[error("Integrity check failed: ciphertext was modified or the wrong key was used")]
    Integrity,

    #[error("Truncated ciphertext: {0}")]
    Truncated(String),

    #[error("Invalid key file: {0}")]
    KeyFile(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid keyring name: {0:?}")]
    InvalidKeyring(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Repository not initialized. Run 'grypt generate-key' first")]
    NotInitialized,

    #[error("Not in a git repository")]
    NotInGitRepo,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GryptError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    /// A dynamic `wrap` argument that is neither a label nor an options bag.
    #[error("unsupported profile argument: expected a string label or an options object, got {found}")]
    UnsupportedSpec { found: &'static str },

    #[error("invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("the global profiler is already installed")]
    AlreadyInstalled,
}

pub type Result<T> = std::result::Result<T, ProfileError>;

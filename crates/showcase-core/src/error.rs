use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Partitions cover {actual} targets but the run has {expected}")]
    PartitionLength { expected: usize, actual: usize },

    #[error("Partitions diverge from the target list at position {position}")]
    PartitionOrder { position: usize },

    #[error("Showcase view for scope '{0}' is unregistered")]
    Unregistered(String),

    #[error("Scope not found: {0}")]
    ScopeNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

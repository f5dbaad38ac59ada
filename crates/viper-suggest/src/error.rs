use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Thread panicked")]
    ThreadPanic,
    #[error("Failed to spawn background thread: {0}")]
    SpawnThread(#[source] std::io::Error),
    #[error("Failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Failed to initialize tracing: {0}")]
    InitTracing(String),
    #[error("Failed to create directory: {0}")]
    CreateDir(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not resolve a per-user cache/config directory")]
    NoUserDirectory,

    #[error("io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed store file at {path}: {source}")]
    Malformed {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

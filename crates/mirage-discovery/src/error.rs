use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("mDNS daemon failed to start: {0}")]
    DaemonFailed(String),

    #[error("failed to register service: {0}")]
    RegisterFailed(String),

    #[error("failed to browse service: {0}")]
    BrowseFailed(String),

    #[error("malformed TXT record: missing key {0}")]
    MissingField(&'static str),

    #[error("malformed TXT record field {0}: {1}")]
    InvalidField(&'static str, String),
}

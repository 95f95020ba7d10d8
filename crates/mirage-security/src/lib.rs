//! Media security (spec.md §2 component 2, §4.2): derives per-direction
//! AEAD keys from a shared secret established during handshake, seals and
//! opens payloads, issues and validates UDP registration tokens, and
//! protects handshakes against replay.

pub mod crypto;
pub mod error;
pub mod hello;
pub mod kdf;
pub mod replay;
pub mod token;

pub use crypto::{open, seal};
pub use error::SecurityError;
pub use hello::HelloPayload;
pub use kdf::{Direction, SessionKeys};
pub use replay::ReplayProtector;
pub use token::RegistrationToken;

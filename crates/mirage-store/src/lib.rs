//! Persisted state (spec.md §6 "Persisted state"): the codec benchmark
//! record and app preferences. Both are plain JSON documents written
//! overwrite-atomically to a per-user directory; neither is part of the
//! real-time data path.

pub mod atomic;
pub mod benchmark;
pub mod error;
pub mod preferences;

pub use benchmark::{BenchmarkStore, CodecBenchmarkRecord};
pub use error::StoreError;
pub use preferences::{AppPreferences, HostAppPreferences, PreferencesStore};

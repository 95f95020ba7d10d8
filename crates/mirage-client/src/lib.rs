//! Client-side stream state: the adaptive bitrate/format loop, the
//! metrics/cursor/position stores, and the connection façade tying the
//! control channel to that state (spec.md §2 component 8/10, §4.10,
//! §4.12).

pub mod adaptive;
pub mod connection;
pub mod error;
pub mod stores;

pub use adaptive::{AdaptiveLoop, AdaptiveMode, AdaptiveStep};
pub use connection::{ClientConnection, ClientEvent};
pub use error::ClientError;
pub use stores::{ClientObservedMetrics, CursorStore, HostReportedMetrics, MetricsStore, PositionStore, StreamMetricsSnapshot};

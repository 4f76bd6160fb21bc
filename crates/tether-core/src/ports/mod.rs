//! Ports - 抽象化レイヤー
//!
//! Engine が外部（ストレージ、ネットワーク検出、時刻、観測）に触れる
//! 境界をすべて trait として定義します。実装は `impls` にあります。

pub mod clock;
pub mod connectivity;
pub mod event_sink;
pub mod id_generator;
pub mod persistence;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::connectivity::Connectivity;
pub use self::event_sink::{EventSink, NoopEventSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::persistence::Persistence;

//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（Clock で timestamp 部分を決める）

use crate::domain::ActionId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は端末上で衝突しない ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（Engine から共有される）
pub trait IdGenerator: Send + Sync {
    fn generate_action_id(&self) -> ActionId;
}

/// ULID generator whose timestamp part comes from a [`Clock`].
///
/// With a `FixedClock` the timestamp is deterministic while the random part
/// still keeps ids unique.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_action_id(&self) -> ActionId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        ActionId::from(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_action_id();
        let id2 = id_gen.generate_action_id();

        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("action-"));
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_action_id();
        let id2 = id_gen.generate_action_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);

        // timestamp 部分は同じ
        assert_eq!(id1.as_ulid().timestamp_ms(), id2.as_ulid().timestamp_ms());
        assert_eq!(
            id1.as_ulid().timestamp_ms(),
            fixed_time.timestamp_millis() as u64
        );
    }
}

use snowflake::SnowflakeIdGenerator;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, UNIX_EPOCH};

// 2024-01-01T00:00:00Z
const SNOWFLAKE_EPOCH: u64 = 1704067200000;

static GENERATOR: once_cell::sync::OnceCell<Mutex<SnowflakeIdGenerator>> = once_cell::sync::OnceCell::new();

fn new() -> Mutex<SnowflakeIdGenerator> {
    let epoch = UNIX_EPOCH + Duration::from_millis(SNOWFLAKE_EPOCH);
    let machine_id = fastrand::i32(0..32);
    let node_id = fastrand::i32(0..32);
    Mutex::new(SnowflakeIdGenerator::with_epoch(machine_id, node_id, epoch))
}

/// Next payment or operator id. Ids from one process only ever grow.
pub fn next() -> i64 {
    GENERATOR
        .get_or_init(new)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .generate()
}

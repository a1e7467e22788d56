use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::db_types::{OrderCode, MAX_ORDER_CODE};

/// Hands out order codes derived from the current time in microseconds. Codes from one generator are strictly
/// increasing, even if the clock stalls or several callers ask in the same microsecond.
///
/// Codes are only unique within a process. Callers must still check the store before using one.
#[derive(Debug, Default)]
pub struct OrderCodeGenerator {
    last: AtomicI64,
}

impl OrderCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_code(&self) -> OrderCode {
        let now = Utc::now().timestamp_micros() % MAX_ORDER_CODE;
        let next = |last: i64| if now > last { now } else { last + 1 };
        let previous = match self.last.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next(last))) {
            Ok(v) | Err(v) => v,
        };
        OrderCode::from_raw(next(previous))
    }
}

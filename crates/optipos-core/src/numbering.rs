//! Human-readable document numbers.
//!
//! Every record carries a UUID v4 `id` for relations and sync. Invoices,
//! work orders and refunds also get a number the cashier can read out:
//!
//! ```text
//! INV-20261019-0001    WO-20261019-0001    RF-20261019-0001
//! └┬┘ └──┬───┘ └─┬┘
//! prefix  day    sequence within the day
//! ```
//!
//! The sequence is derived from the numbers already issued, so two records
//! created in the same millisecond still get distinct numbers.

use chrono::{DateTime, Utc};

pub const INVOICE_PREFIX: &str = "INV";
pub const WORK_ORDER_PREFIX: &str = "WO";
pub const REFUND_PREFIX: &str = "RF";

/// Next free number for `prefix` on the day of `now`.
pub fn next_number<'a>(
    prefix: &str,
    now: DateTime<Utc>,
    issued: impl IntoIterator<Item = &'a str>,
) -> String {
    let day = format!("{}-{}-", prefix, now.format("%Y%m%d"));
    let last = issued
        .into_iter()
        .filter_map(|number| number.strip_prefix(day.as_str()))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:04}", day, last + 1)
}

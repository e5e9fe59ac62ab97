use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on headcount times retention days.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static MARKED_DAY_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE))
});

/// Filter key for one employee-day. `day_start` is the local-midnight UTC
/// instant the record's calendar_date stores, so the key is stable for the
/// whole local day.
fn key(employee_id: u64, day_start: DateTime<Utc>) -> String {
    format!("{}:{}", employee_id, day_start.timestamp())
}

/// False positives possible; a `false` answer is definite and lets the
/// duplicate guard skip its pre-check SELECT.
pub fn might_be_marked(employee_id: u64, day_start: DateTime<Utc>) -> bool {
    MARKED_DAY_FILTER
        .read()
        .expect("day filter poisoned")
        .contains(&key(employee_id, day_start))
}

pub fn mark(employee_id: u64, day_start: DateTime<Utc>) {
    MARKED_DAY_FILTER
        .write()
        .expect("day filter poisoned")
        .add(&key(employee_id, day_start));
}

pub fn unmark(employee_id: u64, day_start: DateTime<Utc>) {
    MARKED_DAY_FILTER
        .write()
        .expect("day filter poisoned")
        .remove(&key(employee_id, day_start));
}

/// Warm up the filter from recent attendance rows using streaming + batching.
pub async fn warmup_day_filter(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (u64, DateTime<Utc>)>(
        r#"
        SELECT employee_id, calendar_date
        FROM attendance
        WHERE calendar_date >= NOW() - INTERVAL ? DAY
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (employee_id, day_start) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(key(employee_id, day_start));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    tracing::info!("Day filter warmup complete: {} marked employee-days", total);
    Ok(())
}

fn insert_batch(keys: &[String]) {
    let mut filter = MARKED_DAY_FILTER.write().expect("day filter poisoned");

    for k in keys {
        filter.add(k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unmarked_day_is_a_definite_negative() {
        let day = Utc.with_ymd_and_hms(2031, 3, 9, 18, 30, 0).unwrap();
        assert!(!might_be_marked(999_999, day));

        mark(999_999, day);
        assert!(might_be_marked(999_999, day));

        // The neighboring day stays negative.
        let next = Utc.with_ymd_and_hms(2031, 3, 10, 18, 30, 0).unwrap();
        assert!(!might_be_marked(999_999, next));

        unmark(999_999, day);
    }
}

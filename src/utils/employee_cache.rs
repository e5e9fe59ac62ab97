use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::core::error::AttendanceError;
use crate::model::employee::Employee;

/// Employee directory cache: profile plus registered descriptor, keyed by
/// employee id. Descriptors are read on every biometric check-in, so they
/// live here instead of being re-fetched per request.
pub static EMPLOYEE_CACHE: Lazy<Cache<u64, Employee>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(3600)) // 1h TTL
        .build()
});

const EMPLOYEE_COLUMNS: &str = r#"
    SELECT id, employee_code, first_name, last_name, email,
           department_id, job_title_id, hire_date, status,
           face_descriptor, face_registered_at
    FROM employees
"#;

/// Resolve an employee through the cache, falling back to the database.
pub async fn resolve(pool: &MySqlPool, employee_id: u64) -> Result<Employee, AttendanceError> {
    if let Some(hit) = EMPLOYEE_CACHE.get(&employee_id).await {
        return Ok(hit);
    }

    let sql = format!("{EMPLOYEE_COLUMNS} WHERE id = ?");
    let employee = sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AttendanceError::NotFound("Employee".to_string()))?;

    EMPLOYEE_CACHE.insert(employee_id, employee.clone()).await;
    Ok(employee)
}

/// Drop a cached profile, e.g. after a descriptor registration.
pub async fn invalidate(employee_id: u64) {
    EMPLOYEE_CACHE.invalidate(&employee_id).await;
}

/// Load active employees into the cache at boot (batched).
pub async fn warmup_employee_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let sql = format!("{EMPLOYEE_COLUMNS} WHERE status = 'active'");
    let mut stream = sqlx::query_as::<_, Employee>(&sql).fetch(pool);

    let mut batch: Vec<Employee> = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(row?);
        total += 1;

        if batch.len() >= batch_size {
            insert_batch(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch).await;
    }

    tracing::info!("Employee cache warmup complete: {} active employees", total);
    Ok(())
}

async fn insert_batch(employees: &[Employee]) {
    let futures: Vec<_> = employees
        .iter()
        .map(|e| EMPLOYEE_CACHE.insert(e.id, e.clone()))
        .collect();

    futures::future::join_all(futures).await;
}

pub mod day_filter;
pub mod employee_cache;
pub mod notify;

use std::env;
use dotenvy::dotenv;
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Geofence reference point, fixed at deployment
    pub office_latitude: f64,
    pub office_longitude: f64,
    pub office_radius_meters: f64,

    // Face matching
    pub face_match_threshold: f64,

    // Workday rules (minutes from local midnight). Local time is a fixed UTC offset.
    pub tz_offset_minutes: i32,
    pub work_start_minutes: u32,
    pub half_day_late_minutes: u32,
    pub workday_end_minutes: u32,
    pub checkout_lookback_hours: i64,

    // Rate limiting
    pub rate_check_in_per_min: u32,
    pub rate_check_out_per_min: u32,
    pub rate_verify_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            office_latitude: env::var("OFFICE_LATITUDE")
                .unwrap_or_else(|_| "23.8103".to_string())
                .parse()
                .unwrap(),
            office_longitude: env::var("OFFICE_LONGITUDE")
                .unwrap_or_else(|_| "90.4125".to_string())
                .parse()
                .unwrap(),
            office_radius_meters: env::var("OFFICE_RADIUS_METERS")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .unwrap(),

            face_match_threshold: env::var("FACE_MATCH_THRESHOLD")
                .unwrap_or_else(|_| "0.6".to_string())
                .parse()
                .unwrap(),

            tz_offset_minutes: env::var("TZ_OFFSET_MINUTES")
                .unwrap_or_else(|_| "330".to_string()) // UTC+5:30
                .parse()
                .unwrap(),
            work_start_minutes: env::var("WORK_START_MINUTES")
                .unwrap_or_else(|_| "600".to_string()) // 10:00 local
                .parse()
                .unwrap(),
            half_day_late_minutes: env::var("HALF_DAY_LATE_MINUTES")
                .unwrap_or_else(|_| "240".to_string())
                .parse()
                .unwrap(),
            workday_end_minutes: env::var("WORKDAY_END_MINUTES")
                .unwrap_or_else(|_| "1140".to_string()) // 19:00 local
                .parse()
                .unwrap(),
            checkout_lookback_hours: env::var("CHECKOUT_LOOKBACK_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap(),

            rate_check_in_per_min: env::var("RATE_CHECK_IN_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_check_out_per_min: env::var("RATE_CHECK_OUT_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_verify_per_min: env::var("RATE_VERIFY_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
        }
    }
}

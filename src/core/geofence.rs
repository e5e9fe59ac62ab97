use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Config;

/// Mean Earth radius in meters, as used by the haversine formula.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
}

/// Great-circle distance between two coordinates, in meters.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Outcome of a geofence check. Carries the exact distance so callers can
/// surface it in error payloads.
#[derive(Debug, Clone, Copy)]
pub struct GeofenceCheck {
    pub distance_meters: f64,
    pub radius_meters: f64,
    pub within_radius: bool,
}

/// Validates submitted coordinates against the fixed office geofence.
#[derive(Debug, Clone, Copy)]
pub struct GeofenceValidator {
    office: GeoPoint,
    radius_meters: f64,
}

impl GeofenceValidator {
    pub fn new(office: GeoPoint, radius_meters: f64) -> Self {
        Self {
            office,
            radius_meters,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            GeoPoint {
                latitude: config.office_latitude,
                longitude: config.office_longitude,
            },
            config.office_radius_meters,
        )
    }

    /// Boundary inclusive: a point exactly at the radius passes.
    pub fn check(&self, point: GeoPoint) -> GeofenceCheck {
        let distance_meters = haversine_distance(self.office, point);
        GeofenceCheck {
            distance_meters,
            radius_meters: self.radius_meters,
            within_radius: distance_meters <= self.radius_meters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFICE: GeoPoint = GeoPoint {
        latitude: 23.8103,
        longitude: 90.4125,
    };

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(haversine_distance(OFFICE, OFFICE), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let p = GeoPoint {
            latitude: 23.7806,
            longitude: 90.2794,
        };
        let ab = haversine_distance(OFFICE, p);
        let ba = haversine_distance(p, OFFICE);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn dhaka_landmarks_sanity() {
        // Gulshan to Dhanmondi is roughly 10 km as the crow flies.
        let gulshan = GeoPoint {
            latitude: 23.7925,
            longitude: 90.4078,
        };
        let dhanmondi = GeoPoint {
            latitude: 23.7461,
            longitude: 90.3742,
        };
        let d = haversine_distance(gulshan, dhanmondi);
        assert!(d > 5_000.0 && d < 10_000.0, "got {d}");
    }

    #[test]
    fn boundary_point_is_inside() {
        let validator = GeofenceValidator::new(OFFICE, 200.0);
        // Roughly 200 m north of the office: 1 deg latitude ~ 111_320 m.
        let north = GeoPoint {
            latitude: OFFICE.latitude + 200.0 / 111_320.0,
            longitude: OFFICE.longitude,
        };
        let check = validator.check(north);
        assert!((check.distance_meters - 200.0).abs() < 1.0);

        let at_radius = GeofenceValidator::new(OFFICE, check.distance_meters);
        assert!(at_radius.check(north).within_radius);
    }

    #[test]
    fn one_meter_beyond_radius_fails() {
        let north = GeoPoint {
            latitude: OFFICE.latitude + 200.0 / 111_320.0,
            longitude: OFFICE.longitude,
        };
        let distance = haversine_distance(OFFICE, north);

        let validator = GeofenceValidator::new(OFFICE, distance - 1.0);
        assert!(!validator.check(north).within_radius);
    }
}

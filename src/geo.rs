//! Geographic primitives: coordinates, the Île-de-France test, Haversine distance

use std::fmt;

/// Mean Earth radius used for great-circle distances, in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Headquarters in Paris; every scene is anchored here
pub const PARIS: Coordinate = Coordinate { lat: 48.8696, lng: 2.3484 };

/// A latitude/longitude pair in decimal degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Arithmetic mean of both axes. Not a geodesic midpoint.
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate {
            lat: (self.lat + other.lat) / 2.0,
            lng: (self.lng + other.lng) / 2.0,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.lat, self.lng)
    }
}

/// Axis-aligned lat/lng box, inclusive on every edge
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Smallest box holding both points
    pub fn from_corners(a: Coordinate, b: Coordinate) -> Self {
        Self {
            south: a.lat.min(b.lat),
            north: a.lat.max(b.lat),
            west: a.lng.min(b.lng),
            east: a.lng.max(b.lng),
        }
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        (self.south..=self.north).contains(&c.lat) && (self.west..=self.east).contains(&c.lng)
    }
}

/// Rough Île-de-France box
pub const IDF_BOUNDS: GeoBounds = GeoBounds {
    south: 47.0,
    north: 50.0,
    west: 1.0,
    east: 4.5,
};

/// Which scene shows a given destination
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    Map,
    Globe,
}

impl DisplayMode {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayMode::Map => "map",
            DisplayMode::Globe => "globe",
        }
    }
}

/// Map inside the Île-de-France box, globe everywhere else
pub fn classify(coord: Coordinate) -> DisplayMode {
    if IDF_BOUNDS.contains(coord) {
        DisplayMode::Map
    } else {
        DisplayMode::Globe
    }
}

/// Great-circle distance in kilometres (Haversine)
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // Rounding can push h just outside [0, 1] near coincident or antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW_YORK: Coordinate = Coordinate::new(40.7128, -74.0060);
    const TOKYO: Coordinate = Coordinate::new(35.68, 139.69);

    #[test]
    fn paris_region_is_map() {
        assert_eq!(classify(Coordinate::new(48.85, 2.35)), DisplayMode::Map);
        assert_eq!(classify(Coordinate::new(49.5, 4.0)), DisplayMode::Map);
        assert_eq!(classify(PARIS), DisplayMode::Map);
    }

    #[test]
    fn box_edges_are_inclusive() {
        assert_eq!(classify(Coordinate::new(47.0, 1.0)), DisplayMode::Map);
        assert_eq!(classify(Coordinate::new(50.0, 4.5)), DisplayMode::Map);
        assert_eq!(classify(Coordinate::new(47.0, 4.5)), DisplayMode::Map);
    }

    #[test]
    fn just_outside_box_is_globe() {
        assert_eq!(classify(Coordinate::new(46.999, 2.0)), DisplayMode::Globe);
        assert_eq!(classify(Coordinate::new(50.001, 2.0)), DisplayMode::Globe);
        assert_eq!(classify(Coordinate::new(48.0, 0.999)), DisplayMode::Globe);
        assert_eq!(classify(Coordinate::new(48.0, 4.501)), DisplayMode::Globe);
        assert_eq!(classify(TOKYO), DisplayMode::Globe);
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_km(PARIS, PARIS), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [(PARIS, NEW_YORK), (TOKYO, NEW_YORK), (Coordinate::new(-33.9, 18.4), TOKYO)];
        for (a, b) in pairs {
            assert_eq!(distance_km(a, b), distance_km(b, a));
        }
    }

    #[test]
    fn paris_to_new_york() {
        let d = distance_km(PARIS, NEW_YORK);
        assert!((d - 5837.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn antipodal_points_stay_finite() {
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn midpoint_is_arithmetic_mean() {
        let m = PARIS.midpoint(&TOKYO);
        assert!((m.lat - (48.8696 + 35.68) / 2.0).abs() < 1e-12);
        assert!((m.lng - (2.3484 + 139.69) / 2.0).abs() < 1e-12);
    }
}

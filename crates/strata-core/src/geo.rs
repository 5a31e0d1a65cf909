//! Geocentric coordinate handling for stations and hypocenters.

use crate::math::{DEGREES_TO_RADIANS, RADIANS_TO_DEGREES, TWO_PI};

/// Mean earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Kilometers per degree of arc at the surface.
pub const DEGREES_TO_KM: f64 = 111.319;
/// Degrees of arc per kilometer at the surface.
pub const KM_TO_DEGREES: f64 = 1.0 / DEGREES_TO_KM;
/// Factor converting geographic to geocentric latitude.
const GEOGRAPHIC_TO_GEOCENTRIC: f64 = 0.993277;

const MAXIMUM_LONGITUDE: f64 = 180.0;
const MINIMUM_LONGITUDE: f64 = -180.0;
const LONGITUDE_WRAP: f64 = 360.0;

/// A point as a geocentric triple (latitude deg, longitude deg, radius km)
/// with cached Cartesian and unit vectors for fast distance math.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geo {
    latitude: f64,
    longitude: f64,
    radius: f64,
    cart_x: f64,
    cart_y: f64,
    cart_z: f64,
    unit_x: f64,
    unit_y: f64,
    unit_z: f64,
}

fn wrap_longitude(lon: f64) -> f64 {
    if lon > MAXIMUM_LONGITUDE {
        lon - LONGITUDE_WRAP
    } else if lon < MINIMUM_LONGITUDE {
        lon + LONGITUDE_WRAP
    } else {
        lon
    }
}

impl Geo {
    /// Constructs from geographic coordinates, converting latitude to
    /// geocentric.
    pub fn from_geographic(lat: f64, lon: f64, radius: f64) -> Self {
        let geocentric_lat =
            RADIANS_TO_DEGREES * (GEOGRAPHIC_TO_GEOCENTRIC * (DEGREES_TO_RADIANS * lat).tan()).atan();
        Self::from_geocentric(geocentric_lat, lon, radius)
    }

    /// Constructs directly from geocentric coordinates.
    pub fn from_geocentric(lat: f64, lon: f64, radius: f64) -> Self {
        let mut geo = Geo {
            latitude: lat,
            longitude: wrap_longitude(lon),
            radius,
            ..Geo::default()
        };
        geo.compute_vectors();
        geo
    }

    /// Constructs from Cartesian coordinates (km).
    pub fn from_cartesian(x: f64, y: f64, z: f64) -> Self {
        let radius = (x * x + y * y + z * z).sqrt();
        let rxy = (x * x + y * y).sqrt();
        let mut geo = Geo {
            latitude: RADIANS_TO_DEGREES * z.atan2(rxy),
            longitude: RADIANS_TO_DEGREES * y.atan2(x),
            radius,
            cart_x: x,
            cart_y: y,
            cart_z: z,
            ..Geo::default()
        };
        geo.unit_x = x / radius;
        geo.unit_y = y / radius;
        geo.unit_z = z / radius;
        geo
    }

    fn compute_vectors(&mut self) {
        let lat_rad = DEGREES_TO_RADIANS * self.latitude;
        let lon_rad = DEGREES_TO_RADIANS * self.longitude;
        self.cart_z = self.radius * lat_rad.sin();
        let rxy = self.radius * lat_rad.cos();
        self.cart_x = rxy * lon_rad.cos();
        self.cart_y = rxy * lon_rad.sin();

        let rr = (self.cart_x * self.cart_x
            + self.cart_y * self.cart_y
            + self.cart_z * self.cart_z)
            .sqrt();
        self.unit_x = self.cart_x / rr;
        self.unit_y = self.cart_y / rr;
        self.unit_z = self.cart_z / rr;
    }

    /// Geographic (lat deg, lon deg, radius km), converting latitude back
    /// from geocentric.
    pub fn as_geographic(&self) -> (f64, f64, f64) {
        let lat = RADIANS_TO_DEGREES
            * ((DEGREES_TO_RADIANS * self.latitude).tan() / GEOGRAPHIC_TO_GEOCENTRIC).atan();
        (lat, wrap_longitude(self.longitude), self.radius)
    }

    /// Geocentric (lat deg, lon deg, radius km).
    pub fn as_geocentric(&self) -> (f64, f64, f64) {
        (self.latitude, wrap_longitude(self.longitude), self.radius)
    }

    pub fn cartesian(&self) -> (f64, f64, f64) {
        (self.cart_x, self.cart_y, self.cart_z)
    }

    /// Central angle to `other` in radians, from the cached unit vectors.
    pub fn delta(&self, other: &Geo) -> f64 {
        let dot =
            self.unit_x * other.unit_x + self.unit_y * other.unit_y + self.unit_z * other.unit_z;
        if dot < 1.0 {
            dot.acos()
        } else {
            0.0
        }
    }

    /// Great-circle bearing to `other` in radians, clockwise from north.
    pub fn azimuth(&self, other: &Geo) -> f64 {
        let other_lat = DEGREES_TO_RADIANS * other.latitude;
        let other_lon = DEGREES_TO_RADIANS * other.longitude;
        let self_lat = DEGREES_TO_RADIANS * self.latitude;
        let self_lon = DEGREES_TO_RADIANS * self.longitude;

        // radial normal vectors at each point
        let sx = other_lat.cos() * other_lon.cos();
        let sy = other_lat.cos() * other_lon.sin();
        let sz = other_lat.sin();
        let qx = self_lat.cos() * self_lon.cos();
        let qy = self_lat.cos() * self_lon.sin();
        let qz = self_lat.sin();

        // normal to the great circle through both points
        let qsx = qy * sz - sy * qz;
        let qsy = qz * sx - sz * qx;
        let qsz = qx * sy - sx * qy;

        // tangent along the great circle at self
        let mut ax = qsy * qz - qy * qsz;
        let mut ay = qsz * qx - qz * qsx;
        let mut az = qsx * qy - qx * qsy;
        let r = (ax * ax + ay * ay + az * az).sqrt();
        ax /= r;
        ay /= r;
        az /= r;

        // north and east tangent vectors at self
        let nx = -self_lat.sin() * self_lon.cos();
        let ny = -self_lat.sin() * self_lon.sin();
        let nz = self_lat.cos();
        let ex = -self_lon.sin();
        let ey = self_lon.cos();

        let n = ax * nx + ay * ny + az * nz;
        let e = ax * ex + ay * ey;

        let mut azm = e.atan2(n);
        if azm < 0.0 {
            azm += TWO_PI;
        }
        azm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::PI;

    #[test]
    fn geocentric_round_trip() {
        let geo = Geo::from_geocentric(45.0, -120.0, EARTH_RADIUS_KM);
        let (lat, lon, r) = geo.as_geocentric();
        assert!((lat - 45.0).abs() < 1e-12);
        assert!((lon + 120.0).abs() < 1e-12);
        assert!((r - EARTH_RADIUS_KM).abs() < 1e-12);
    }

    #[test]
    fn geographic_round_trip() {
        let geo = Geo::from_geographic(36.769, -98.019, EARTH_RADIUS_KM);
        let (lat, lon, _) = geo.as_geographic();
        assert!((lat - 36.769).abs() < 1e-9);
        assert!((lon + 98.019).abs() < 1e-9);
    }

    #[test]
    fn longitude_wraps() {
        let geo = Geo::from_geocentric(0.0, 190.0, EARTH_RADIUS_KM);
        let (_, lon, _) = geo.as_geocentric();
        assert!((lon + 170.0).abs() < 1e-12);

        let geo = Geo::from_geocentric(0.0, -200.0, EARTH_RADIUS_KM);
        let (_, lon, _) = geo.as_geocentric();
        assert!((lon - 160.0).abs() < 1e-12);
    }

    #[test]
    fn cartesian_matches_geocentric() {
        let geo = Geo::from_geocentric(0.0, 0.0, EARTH_RADIUS_KM);
        let (x, y, z) = geo.cartesian();
        assert!((x - EARTH_RADIUS_KM).abs() < 1e-9);
        assert!(y.abs() < 1e-9);
        assert!(z.abs() < 1e-9);

        let back = Geo::from_cartesian(x, y, z);
        let (lat, lon, r) = back.as_geocentric();
        assert!(lat.abs() < 1e-9);
        assert!(lon.abs() < 1e-9);
        assert!((r - EARTH_RADIUS_KM).abs() < 1e-9);
    }

    #[test]
    fn delta_quarter_circle() {
        let equator = Geo::from_geocentric(0.0, 0.0, EARTH_RADIUS_KM);
        let pole = Geo::from_geocentric(90.0, 0.0, EARTH_RADIUS_KM);
        assert!((equator.delta(&pole) - PI / 2.0).abs() < 1e-9);
        assert_eq!(equator.delta(&equator), 0.0);
    }

    #[test]
    fn azimuth_cardinal_directions() {
        let origin = Geo::from_geocentric(0.0, 0.0, EARTH_RADIUS_KM);
        let north = Geo::from_geocentric(10.0, 0.0, EARTH_RADIUS_KM);
        let east = Geo::from_geocentric(0.0, 10.0, EARTH_RADIUS_KM);
        let south = Geo::from_geocentric(-10.0, 0.0, EARTH_RADIUS_KM);

        assert!(origin.azimuth(&north).abs() < 1e-9);
        assert!((origin.azimuth(&east) - PI / 2.0).abs() < 1e-9);
        assert!((origin.azimuth(&south) - PI).abs() < 1e-9);
    }
}

//! Coordinate quantization module
//!
//! Provides the cell-key encoding used to index cached speed limits by
//! location, plus great-circle distance between position fixes.
//!
//! Cell keys are base-32 geohashes at a fixed precision. At precision 7 a cell
//! is roughly 153m × 153m, so neighbouring GPS fixes on the same stretch of
//! road usually share a key or land in an adjacent one.

mod types;

pub use types::{
    CellBounds, CellKey, CoordError, CELL_KEY_PRECISION, EARTH_RADIUS_M, MAX_LAT, MAX_LON,
    MIN_LAT, MIN_LON, NEIGHBOR_OFFSET_DEG,
};

/// Geohash base-32 alphabet (omits a, i, l, o).
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Offsets (lat, lon) in degrees probed around a position for neighbour cells.
const NEIGHBOR_OFFSETS: [(f64, f64); 8] = [
    (NEIGHBOR_OFFSET_DEG, 0.0),
    (-NEIGHBOR_OFFSET_DEG, 0.0),
    (0.0, NEIGHBOR_OFFSET_DEG),
    (0.0, -NEIGHBOR_OFFSET_DEG),
    (NEIGHBOR_OFFSET_DEG, NEIGHBOR_OFFSET_DEG),
    (NEIGHBOR_OFFSET_DEG, -NEIGHBOR_OFFSET_DEG),
    (-NEIGHBOR_OFFSET_DEG, NEIGHBOR_OFFSET_DEG),
    (-NEIGHBOR_OFFSET_DEG, -NEIGHBOR_OFFSET_DEG),
];

/// Validates a latitude/longitude pair.
#[inline]
pub fn validate(lat: f64, lon: f64) -> Result<(), CoordError> {
    if !lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    Ok(())
}

/// Encodes geographic coordinates into a cell key.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-90.0 to 90.0)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
///
/// # Returns
///
/// A `Result` containing the cell key or an error if inputs are invalid.
#[inline]
pub fn encode_cell_key(lat: f64, lon: f64) -> Result<CellKey, CoordError> {
    validate(lat, lon)?;
    Ok(CellKey(encode_geohash(lat, lon, CELL_KEY_PRECISION)))
}

/// Returns the distinct cell keys probed around a position, excluding the
/// position's own cell.
///
/// Probes use fixed ±0.001° offsets on each axis and diagonal. Offsets that
/// leave the valid range are clamped (latitude) or wrapped (longitude).
/// Because a cell is wider than the offset, several probes often fall back
/// into the direct cell; those are dropped, as are duplicates.
pub fn neighbor_cell_keys(lat: f64, lon: f64) -> Result<Vec<CellKey>, CoordError> {
    let direct = encode_cell_key(lat, lon)?;
    let mut keys: Vec<CellKey> = Vec::with_capacity(NEIGHBOR_OFFSETS.len());

    for (dlat, dlon) in NEIGHBOR_OFFSETS {
        let probe_lat = (lat + dlat).clamp(MIN_LAT, MAX_LAT);
        let probe_lon = wrap_longitude(lon + dlon);
        let key = encode_cell_key(probe_lat, probe_lon)?;
        if key != direct && !keys.contains(&key) {
            keys.push(key);
        }
    }

    Ok(keys)
}

/// Decodes a cell key back into the bounding box it covers.
pub fn cell_bounds(key: &CellKey) -> Result<CellBounds, CoordError> {
    let mut lat_range = (MIN_LAT, MAX_LAT);
    let mut lon_range = (MIN_LON, MAX_LON);
    let mut even = true;

    for ch in key.as_str().bytes() {
        let idx = BASE32
            .iter()
            .position(|&c| c == ch)
            .ok_or_else(|| CoordError::InvalidCellKey(key.as_str().to_string()))?;

        for shift in (0..5).rev() {
            let bit = (idx >> shift) & 1;
            let range = if even { &mut lon_range } else { &mut lat_range };
            let mid = (range.0 + range.1) / 2.0;
            if bit == 1 {
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            even = !even;
        }
    }

    Ok(CellBounds {
        min_lat: lat_range.0,
        max_lat: lat_range.1,
        min_lon: lon_range.0,
        max_lon: lon_range.1,
    })
}

/// Great-circle distance between two positions in meters (haversine).
#[inline]
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

fn wrap_longitude(lon: f64) -> f64 {
    if lon > MAX_LON {
        lon - 360.0
    } else if lon < MIN_LON {
        lon + 360.0
    } else {
        lon
    }
}

fn encode_geohash(lat: f64, lon: f64, precision: usize) -> String {
    let mut lat_range = (MIN_LAT, MAX_LAT);
    let mut lon_range = (MIN_LON, MAX_LON);
    let mut out = String::with_capacity(precision);
    let mut even = true;
    let mut bits = 0u8;
    let mut idx = 0usize;

    while out.len() < precision {
        let (range, value) = if even {
            (&mut lon_range, lon)
        } else {
            (&mut lat_range, lat)
        };
        let mid = (range.0 + range.1) / 2.0;
        if value >= mid {
            idx = (idx << 1) | 1;
            range.0 = mid;
        } else {
            idx <<= 1;
            range.1 = mid;
        }
        even = !even;

        bits += 1;
        if bits == 5 {
            out.push(BASE32[idx] as char);
            bits = 0;
            idx = 0;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_geohash() {
        // Classic reference point: 57.64911, 10.40744 -> u4pruydqqvj
        let key = encode_cell_key(57.64911, 10.40744).unwrap();
        assert_eq!(key.as_str(), "u4pruyd");
    }

    #[test]
    fn test_key_has_fixed_precision() {
        let key = encode_cell_key(40.7128, -74.0060).unwrap();
        assert_eq!(key.as_str().len(), CELL_KEY_PRECISION);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = encode_cell_key(91.0, 0.0);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_invalid_longitude() {
        let result = encode_cell_key(0.0, -181.0);
        assert!(matches!(result, Err(CoordError::InvalidLongitude(_))));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(encode_cell_key(f64::NAN, 0.0).is_err());
        assert!(encode_cell_key(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_cell_size_is_roughly_150m() {
        let key = encode_cell_key(40.7128, -74.0060).unwrap();
        let bounds = cell_bounds(&key).unwrap();

        let height_m = haversine_distance_m(
            bounds.min_lat,
            bounds.min_lon,
            bounds.max_lat,
            bounds.min_lon,
        );
        assert!(
            (140.0..170.0).contains(&height_m),
            "cell height {} m outside expected range",
            height_m
        );
    }

    #[test]
    fn test_bounds_contain_point() {
        let (lat, lon) = (51.5074, -0.1278);
        let key = encode_cell_key(lat, lon).unwrap();
        let bounds = cell_bounds(&key).unwrap();
        assert!(bounds.contains(lat, lon));
    }

    #[test]
    fn test_bounds_reject_invalid_key() {
        let key = CellKey("abc".to_string()); // 'a' is not in the alphabet
        assert!(matches!(
            cell_bounds(&key),
            Err(CoordError::InvalidCellKey(_))
        ));
    }

    #[test]
    fn test_neighbors_exclude_direct_cell() {
        let (lat, lon) = (40.7128, -74.0060);
        let direct = encode_cell_key(lat, lon).unwrap();
        let neighbors = neighbor_cell_keys(lat, lon).unwrap();

        assert!(!neighbors.is_empty());
        assert!(neighbors.len() <= 8);
        assert!(!neighbors.contains(&direct));
    }

    #[test]
    fn test_neighbors_near_cell_corner_are_distinct() {
        // Point just inside the north-east corner of its cell: every positive
        // offset crosses a boundary.
        let key = encode_cell_key(40.7128, -74.0060).unwrap();
        let b = cell_bounds(&key).unwrap();
        let lat = b.max_lat - 0.0001;
        let lon = b.max_lon - 0.0001;

        let neighbors = neighbor_cell_keys(lat, lon).unwrap();
        let north = encode_cell_key(lat + NEIGHBOR_OFFSET_DEG, lon).unwrap();
        let east = encode_cell_key(lat, lon + NEIGHBOR_OFFSET_DEG).unwrap();
        assert!(neighbors.contains(&north));
        assert!(neighbors.contains(&east));
    }

    #[test]
    fn test_neighbors_at_pole_and_antimeridian() {
        assert!(neighbor_cell_keys(90.0, 180.0).is_ok());
        assert!(neighbor_cell_keys(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert_eq!(haversine_distance_m(10.0, 20.0, 10.0, 20.0), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // One degree of latitude is ~111.2 km on a 6371 km sphere
        let d = haversine_distance_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_haversine_london_paris() {
        let d = haversine_distance_m(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((d / 1000.0 - 343.5).abs() < 2.0, "got {} km", d / 1000.0);
    }

    proptest! {
        #[test]
        fn prop_encoding_is_deterministic(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            let a = encode_cell_key(lat, lon).unwrap();
            let b = encode_cell_key(lat, lon).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_points_in_same_cell_share_key(
            lat in -89.0f64..89.0,
            lon in -179.0f64..179.0,
            fx in 0.0f64..1.0,
            fy in 0.0f64..1.0,
        ) {
            let key = encode_cell_key(lat, lon).unwrap();
            let b = cell_bounds(&key).unwrap();
            // Any point strictly inside the same cell encodes to the same key
            let inner_lat = b.min_lat + (b.max_lat - b.min_lat) * (0.01 + fy * 0.98);
            let inner_lon = b.min_lon + (b.max_lon - b.min_lon) * (0.01 + fx * 0.98);
            prop_assert_eq!(encode_cell_key(inner_lat, inner_lon).unwrap(), key);
        }
    }
}

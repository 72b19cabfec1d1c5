//! Alert threshold computation.
//!
//! A resolved speed limit becomes an alert threshold by adding an offset.
//! The offset is either fixed or looked up in a [`ZoneTable`]: an ordered,
//! contiguous list of limit ranges covering `[0, ∞)`, each with its own
//! offset.
//!
//! ```text
//!   0 ──── 30 ──── 50 ──── 70 ────────► ∞
//!   │ +3   │ +5    │ +7    │ +10
//! ```
//!
//! Boundary edits go through [`ZoneTable::set_boundary`], which moves the
//! shared edge of two adjacent zones so the table never has a gap or overlap.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Default offset for fixed mode.
pub const DEFAULT_FIXED_OFFSET: f64 = 5.0;

/// Errors from building or editing a zone table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("Zone table is empty")]
    NoZones,

    #[error("First zone must start at 0, starts at {0}")]
    DoesNotStartAtZero(u32),

    #[error("Zone {index} starts at {min} but the previous zone ends at {prev_max}")]
    NotContiguous { index: usize, prev_max: u32, min: u32 },

    #[error("Zone {index} is empty or inverted ({min}-{max})")]
    EmptyZone { index: usize, min: u32, max: u32 },

    #[error("Only the last zone may be unbounded (zone {0} is)")]
    UnboundedBeforeLast(usize),

    #[error("Last zone must be unbounded")]
    LastZoneBounded,

    #[error("Boundary index {index} out of range ({count} boundaries)")]
    BoundaryIndexOutOfRange { index: usize, count: usize },

    #[error("Zone index {index} out of range ({count} zones)")]
    ZoneIndexOutOfRange { index: usize, count: usize },

    #[error("Boundary {value} must lie strictly between {lower} and {}", display_upper(.upper))]
    BoundaryOutOfRange {
        value: u32,
        lower: u32,
        upper: Option<u32>,
    },

    #[error("Invalid offset: {0}")]
    InvalidOffset(f64),

    #[error("Invalid zone entry {0:?}")]
    Parse(String),
}

/// One row of a zone table: limits in `[min_limit, max_limit)` get `offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdZone {
    pub min_limit: u32,
    /// Exclusive upper bound; `None` for the last, unbounded zone.
    pub max_limit: Option<u32>,
    pub offset: f64,
}

impl ThresholdZone {
    pub fn new(min_limit: u32, max_limit: Option<u32>, offset: f64) -> Self {
        Self {
            min_limit,
            max_limit,
            offset,
        }
    }

    /// True if `limit` falls in this zone.
    pub fn contains(&self, limit: f64) -> bool {
        limit >= f64::from(self.min_limit) && self.max_limit.map_or(true, |m| limit < f64::from(m))
    }
}

impl fmt::Display for ThresholdZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_limit {
            Some(max) => write!(f, "{}-{}:{}", self.min_limit, max, self.offset),
            None => write!(f, "{}-:{}", self.min_limit, self.offset),
        }
    }
}

/// Ordered, contiguous zone table covering `[0, ∞)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneTable {
    zones: Vec<ThresholdZone>,
}

impl Default for ZoneTable {
    fn default() -> Self {
        Self {
            zones: vec![
                ThresholdZone::new(0, Some(30), 3.0),
                ThresholdZone::new(30, Some(50), 5.0),
                ThresholdZone::new(50, Some(70), 7.0),
                ThresholdZone::new(70, None, 10.0),
            ],
        }
    }
}

impl ZoneTable {
    /// Build a table, checking that the zones are ordered and contiguous.
    pub fn new(zones: Vec<ThresholdZone>) -> Result<Self, ThresholdError> {
        let first = zones.first().ok_or(ThresholdError::NoZones)?;
        if first.min_limit != 0 {
            return Err(ThresholdError::DoesNotStartAtZero(first.min_limit));
        }

        let last_index = zones.len() - 1;
        for (index, zone) in zones.iter().enumerate() {
            validate_offset(zone.offset)?;
            match zone.max_limit {
                Some(max) if max <= zone.min_limit => {
                    return Err(ThresholdError::EmptyZone {
                        index,
                        min: zone.min_limit,
                        max,
                    });
                }
                Some(_) if index == last_index => return Err(ThresholdError::LastZoneBounded),
                None if index != last_index => {
                    return Err(ThresholdError::UnboundedBeforeLast(index))
                }
                _ => {}
            }
            if index > 0 {
                // Every zone before the last is bounded, checked above
                let prev_max = zones[index - 1].max_limit.unwrap_or(u32::MAX);
                if prev_max != zone.min_limit {
                    return Err(ThresholdError::NotContiguous {
                        index,
                        prev_max,
                        min: zone.min_limit,
                    });
                }
            }
        }

        Ok(Self { zones })
    }

    /// The zones, in order.
    pub fn zones(&self) -> &[ThresholdZone] {
        &self.zones
    }

    /// The zone containing `limit`. Negative limits map to the first zone.
    pub fn zone_for(&self, limit: f64) -> &ThresholdZone {
        self.zones
            .iter()
            .find(|z| z.contains(limit))
            .unwrap_or(&self.zones[0])
    }

    /// Move the boundary between zone `index` and zone `index + 1`.
    ///
    /// The new value must lie strictly inside the span of the two zones so
    /// neither becomes empty.
    pub fn set_boundary(&mut self, index: usize, value: u32) -> Result<(), ThresholdError> {
        let count = self.zones.len() - 1;
        if index >= count {
            return Err(ThresholdError::BoundaryIndexOutOfRange { index, count });
        }

        let lower = self.zones[index].min_limit;
        let upper = self.zones[index + 1].max_limit;
        let fits = value > lower && upper.map_or(true, |u| value < u);
        if !fits {
            return Err(ThresholdError::BoundaryOutOfRange {
                value,
                lower,
                upper,
            });
        }

        self.zones[index].max_limit = Some(value);
        self.zones[index + 1].min_limit = value;
        tracing::debug!(index, value, "Threshold zone boundary moved");
        Ok(())
    }

    /// Change the offset of zone `index`.
    pub fn set_offset(&mut self, index: usize, offset: f64) -> Result<(), ThresholdError> {
        validate_offset(offset)?;
        let count = self.zones.len();
        let zone = self
            .zones
            .get_mut(index)
            .ok_or(ThresholdError::ZoneIndexOutOfRange { index, count })?;
        zone.offset = offset;
        Ok(())
    }

    /// True if adjacent zones share their boundary and only the last is unbounded.
    pub fn is_contiguous(&self) -> bool {
        self.zones.first().map_or(false, |z| z.min_limit == 0)
            && self
                .zones
                .windows(2)
                .all(|w| w[0].max_limit == Some(w[1].min_limit) && w[0].min_limit < w[1].min_limit)
            && self.zones.last().map_or(false, |z| z.max_limit.is_none())
    }
}

impl fmt::Display for ZoneTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, zone) in self.zones.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", zone)?;
        }
        Ok(())
    }
}

/// Parses `min-max:offset,...`, with an empty `max` on the last zone.
impl FromStr for ZoneTable {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || ThresholdError::Parse(s.to_string());

        let zones = s
            .split(',')
            .map(|part| {
                let (range, offset) = part.trim().split_once(':').ok_or_else(parse_err)?;
                let (min, max) = range.split_once('-').ok_or_else(parse_err)?;
                let min_limit = min.trim().parse().map_err(|_| parse_err())?;
                let max_limit = match max.trim() {
                    "" => None,
                    m => Some(m.parse().map_err(|_| parse_err())?),
                };
                let offset = offset.trim().parse().map_err(|_| parse_err())?;
                Ok(ThresholdZone::new(min_limit, max_limit, offset))
            })
            .collect::<Result<Vec<_>, ThresholdError>>()?;

        ZoneTable::new(zones)
    }
}

fn display_upper(upper: &Option<u32>) -> String {
    upper.map_or_else(|| "∞".to_string(), |u| u.to_string())
}

fn validate_offset(offset: f64) -> Result<(), ThresholdError> {
    if offset.is_finite() && offset >= 0.0 {
        Ok(())
    } else {
        Err(ThresholdError::InvalidOffset(offset))
    }
}

/// How the alert offset is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdMode {
    /// The same offset for every limit.
    Fixed(f64),
    /// Offset depends on which zone the limit falls in.
    Dynamic(ZoneTable),
}

impl Default for ThresholdMode {
    fn default() -> Self {
        ThresholdMode::Fixed(DEFAULT_FIXED_OFFSET)
    }
}

impl ThresholdMode {
    /// Offset allowed above `limit` before the driver counts as speeding.
    pub fn offset_for(&self, limit: f64) -> f64 {
        match self {
            ThresholdMode::Fixed(offset) => *offset,
            ThresholdMode::Dynamic(table) => table.zone_for(limit).offset,
        }
    }

    /// Speed above which alerting starts: `limit + offset`.
    pub fn alert_speed(&self, limit: f64) -> f64 {
        limit + self.offset_for(limit)
    }

    /// Short name used in config and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ThresholdMode::Fixed(_) => "fixed",
            ThresholdMode::Dynamic(_) => "dynamic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_offset_ignores_limit() {
        let mode = ThresholdMode::Fixed(5.0);
        assert_eq!(mode.offset_for(25.0), 5.0);
        assert_eq!(mode.offset_for(70.0), 5.0);
        assert_eq!(mode.alert_speed(55.0), 60.0);
    }

    #[test]
    fn test_dynamic_zone_lookup_half_open() {
        let mode = ThresholdMode::Dynamic(ZoneTable::default());
        assert_eq!(mode.offset_for(0.0), 3.0);
        assert_eq!(mode.offset_for(29.0), 3.0);
        assert_eq!(mode.offset_for(30.0), 5.0);
        assert_eq!(mode.offset_for(65.0), 7.0);
        assert_eq!(mode.offset_for(70.0), 10.0);
        assert_eq!(mode.offset_for(130.0), 10.0);
        assert_eq!(mode.alert_speed(55.0), 62.0);
    }

    #[test]
    fn test_set_boundary_cascades() {
        let mut table = ZoneTable::default();
        table.set_boundary(1, 45).unwrap();

        assert_eq!(table.zones()[1].max_limit, Some(45));
        assert_eq!(table.zones()[2].min_limit, 45);
        assert!(table.is_contiguous());
        assert_eq!(table.zone_for(47.0).offset, 7.0);
    }

    #[test]
    fn test_set_boundary_rejects_collapse() {
        let mut table = ZoneTable::default();

        assert!(matches!(
            table.set_boundary(1, 30),
            Err(ThresholdError::BoundaryOutOfRange { .. })
        ));
        assert!(matches!(
            table.set_boundary(1, 70),
            Err(ThresholdError::BoundaryOutOfRange { .. })
        ));
        assert!(matches!(
            table.set_boundary(3, 100),
            Err(ThresholdError::BoundaryIndexOutOfRange { index: 3, count: 3 })
        ));
        assert_eq!(table, ZoneTable::default());
    }

    #[test]
    fn test_last_boundary_moves_freely_upward() {
        let mut table = ZoneTable::default();
        table.set_boundary(2, 200).unwrap();
        assert_eq!(table.zones()[3].min_limit, 200);
        assert!(table.zones()[3].max_limit.is_none());
    }

    #[test]
    fn test_set_offset() {
        let mut table = ZoneTable::default();
        table.set_offset(0, 2.0).unwrap();
        assert_eq!(table.zones()[0].offset, 2.0);

        assert!(table.set_offset(0, -1.0).is_err());
        assert!(table.set_offset(9, 1.0).is_err());
    }

    #[test]
    fn test_new_validates() {
        assert_eq!(ZoneTable::new(vec![]), Err(ThresholdError::NoZones));
        assert_eq!(
            ZoneTable::new(vec![ThresholdZone::new(5, None, 1.0)]),
            Err(ThresholdError::DoesNotStartAtZero(5))
        );
        assert!(matches!(
            ZoneTable::new(vec![
                ThresholdZone::new(0, Some(30), 1.0),
                ThresholdZone::new(40, None, 1.0),
            ]),
            Err(ThresholdError::NotContiguous { index: 1, .. })
        ));
        assert_eq!(
            ZoneTable::new(vec![ThresholdZone::new(0, Some(30), 1.0)]),
            Err(ThresholdError::LastZoneBounded)
        );
        assert_eq!(
            ZoneTable::new(vec![
                ThresholdZone::new(0, None, 1.0),
                ThresholdZone::new(30, None, 1.0),
            ]),
            Err(ThresholdError::UnboundedBeforeLast(0))
        );
    }

    #[test]
    fn test_parse_and_display() {
        let table: ZoneTable = "0-30:3, 30-50:5, 50-70:7, 70-:10".parse().unwrap();
        assert_eq!(table, ZoneTable::default());
        assert_eq!(table.to_string(), "0-30:3,30-50:5,50-70:7,70-:10");

        assert!(matches!(
            "0-30".parse::<ZoneTable>(),
            Err(ThresholdError::Parse(_))
        ));
        assert!(matches!(
            "0-30:3,35-:5".parse::<ZoneTable>(),
            Err(ThresholdError::NotContiguous { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_zones_stay_contiguous(
            edits in proptest::collection::vec((0usize..5, 0u32..200), 0..40),
        ) {
            let mut table = ZoneTable::default();
            for (index, value) in edits {
                let _ = table.set_boundary(index, value);
                prop_assert!(table.is_contiguous());
            }

            // Every limit maps to exactly one zone
            for limit in 0..220u32 {
                let hits = table.zones().iter().filter(|z| z.contains(f64::from(limit))).count();
                prop_assert_eq!(hits, 1);
            }
        }
    }
}

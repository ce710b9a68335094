use custom_error::custom_error;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::latlon::LatLon;

pub const FEET_TO_METERS: f64 = 0.3048;

custom_error! {pub ParseLimitError
    Invalid{text: String} = "invalid vertical limit: {text}"
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VerticalLimit {
    Gnd,
    Agl(f64),
    Amsl(f64),
    FlightLevel(u16),
}

impl VerticalLimit {
    pub fn ft_amsl(ft: f64) -> Self {
        VerticalLimit::Amsl(ft * FEET_TO_METERS)
    }

    pub fn ft_agl(ft: f64) -> Self {
        VerticalLimit::Agl(ft * FEET_TO_METERS)
    }

    pub fn is_ground(&self) -> bool {
        match *self {
            VerticalLimit::Gnd => true,
            VerticalLimit::Agl(h) => h <= 0.0,
            VerticalLimit::Amsl(_) | VerticalLimit::FlightLevel(_) => false,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            VerticalLimit::Gnd => "GND".to_string(),
            VerticalLimit::FlightLevel(fl) => format!("FL{}", fl),
            VerticalLimit::Amsl(m) => format!("{:.3}m AMSL", m),
            VerticalLimit::Agl(m) => format!("{:.3}m AGL", m),
        }
    }

    pub fn fixed_amsl(&self) -> Option<f64> {
        match *self {
            VerticalLimit::Amsl(m) => Some(m),
            VerticalLimit::FlightLevel(fl) => Some(f64::from(fl) * 100.0 * FEET_TO_METERS),
            VerticalLimit::Gnd | VerticalLimit::Agl(_) => None,
        }
    }
}

impl FromStr for VerticalLimit {
    type Err = ParseLimitError;

    /// Accepts `GND`/`SFC`, `FL65`, `2000ft`, `2000 ft AMSL`, `1000ft AGL`,
    /// `1500m MSL` and the like. Plain numbers are feet AMSL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref FL_REGEX: Regex = Regex::new(r"(?i)^FL\s*(\d{1,3})$").unwrap();
            static ref HEIGHT_REGEX: Regex = Regex::new(
                r"(?i)^(-?\d+(?:\.\d+)?)\s*(FT|F|M)?\s*(AMSL|MSL|ALT|AGL|ASFC|GND|SFC)?$"
            )
            .unwrap();
        }

        let text = s.trim();
        let invalid = || ParseLimitError::Invalid {
            text: text.to_string(),
        };

        if ["GND", "SFC", "SURFACE"]
            .iter()
            .any(|g| text.eq_ignore_ascii_case(g))
        {
            return Ok(VerticalLimit::Gnd);
        }

        if let Some(cap) = FL_REGEX.captures(text) {
            return cap[1]
                .parse()
                .map(VerticalLimit::FlightLevel)
                .map_err(|_| invalid());
        }

        let cap = HEIGHT_REGEX.captures(text).ok_or_else(invalid)?;
        let value: f64 = cap[1].parse().map_err(|_| invalid())?;
        let metres = match cap.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
            Some(ref unit) if unit == "M" => value,
            _ => value * FEET_TO_METERS,
        };
        match cap.get(3).map(|m| m.as_str().to_ascii_uppercase()) {
            Some(ref datum) if ["AGL", "ASFC", "GND", "SFC"].contains(&datum.as_str()) => {
                Ok(VerticalLimit::Agl(metres))
            }
            _ => Ok(VerticalLimit::Amsl(metres)),
        }
    }
}

impl fmt::Display for VerticalLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerticalLimit::Gnd => write!(f, "GND"),
            VerticalLimit::FlightLevel(fl) => write!(f, "FL{}", fl),
            VerticalLimit::Amsl(m) => write!(f, "{:.0} ft AMSL", m / FEET_TO_METERS),
            VerticalLimit::Agl(m) => write!(f, "{:.0} ft AGL", m / FEET_TO_METERS),
        }
    }
}

pub trait ElevationSource {
    fn elevation_at(&self, position: LatLon) -> Option<f64>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoTerrain;

impl ElevationSource for NoTerrain {
    fn elevation_at(&self, _: LatLon) -> Option<f64> {
        None
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FlatTerrain(pub f64);

impl ElevationSource for FlatTerrain {
    fn elevation_at(&self, _: LatLon) -> Option<f64> {
        Some(self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedLimit {
    pub altitudes: Vec<f64>,
    pub covered: bool,
}

/// Resolves `limit` to metres AMSL at every vertex of `ring`.
///
/// Vertices without terrain data take the elevation of the nearest vertex
/// along the ring that has some, or 0 if none has. Only a positive AGL height
/// marks the result as not covered.
pub fn resolve_amsl(
    limit: &VerticalLimit,
    ring: &[LatLon],
    terrain: &dyn ElevationSource,
) -> ResolvedLimit {
    if let Some(alt) = limit.fixed_amsl() {
        return ResolvedLimit {
            altitudes: vec![alt; ring.len()],
            covered: true,
        };
    }

    let height = match *limit {
        VerticalLimit::Agl(h) if h > 0.0 => h,
        _ => 0.0,
    };

    let known: Vec<Option<f64>> = ring.iter().map(|&p| terrain.elevation_at(p)).collect();
    let missing = known.iter().any(Option::is_none);

    let altitudes = (0..known.len())
        .map(|i| nearest_known(&known, i).unwrap_or(0.0) + height)
        .collect();

    ResolvedLimit {
        altitudes,
        covered: !(missing && height > 0.0),
    }
}

fn nearest_known(known: &[Option<f64>], i: usize) -> Option<f64> {
    let n = known.len();
    (0..=n / 2).find_map(|d| known[(i + d) % n].or(known[(i + n - d) % n]))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Patchy;

    // data only east of the prime meridian
    impl ElevationSource for Patchy {
        fn elevation_at(&self, p: LatLon) -> Option<f64> {
            if p.lon() >= 0.0 {
                Some(100.0)
            } else {
                None
            }
        }
    }

    fn ring() -> Vec<LatLon> {
        vec![
            LatLon::new(45.0, -1.0),
            LatLon::new(45.0, 1.0),
            LatLon::new(46.0, 1.0),
            LatLon::new(45.0, -1.0),
        ]
    }

    #[test]
    fn parse_limits() {
        assert_eq!("GND".parse::<VerticalLimit>().ok(), Some(VerticalLimit::Gnd));
        assert_eq!("sfc".parse::<VerticalLimit>().ok(), Some(VerticalLimit::Gnd));
        assert_eq!("FL65".parse::<VerticalLimit>().ok(), Some(VerticalLimit::FlightLevel(65)));
        assert_eq!("fl 95".parse::<VerticalLimit>().ok(), Some(VerticalLimit::FlightLevel(95)));
        match "2000ft AMSL".parse::<VerticalLimit>() {
            Ok(VerticalLimit::Amsl(m)) => assert!((m - 609.6).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        match "1000 ft AGL".parse::<VerticalLimit>() {
            Ok(VerticalLimit::Agl(m)) => assert!((m - 304.8).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!("1500m MSL".parse::<VerticalLimit>().ok(), Some(VerticalLimit::Amsl(1500.0)));
        assert!("unlimited".parse::<VerticalLimit>().is_err());
        assert!("FL".parse::<VerticalLimit>().is_err());
    }

    #[test]
    fn display_in_feet() {
        assert_eq!(VerticalLimit::ft_amsl(2000.0).to_string(), "2000 ft AMSL");
        assert_eq!(VerticalLimit::ft_agl(1500.0).to_string(), "1500 ft AGL");
        assert_eq!(VerticalLimit::FlightLevel(65).to_string(), "FL65");
        assert_eq!(VerticalLimit::Gnd.to_string(), "GND");
    }

    #[test]
    fn encoding_is_lossless() {
        for limit in [
            VerticalLimit::Gnd,
            VerticalLimit::FlightLevel(125),
            VerticalLimit::Amsl(1234.5),
            VerticalLimit::Agl(304.8),
        ] {
            let parsed: VerticalLimit = limit.encode().parse().unwrap();
            match (limit, parsed) {
                (VerticalLimit::Amsl(a), VerticalLimit::Amsl(b))
                | (VerticalLimit::Agl(a), VerticalLimit::Agl(b)) => assert!((a - b).abs() < 1e-3),
                (a, b) => assert_eq!(a, b),
            }
        }
    }

    #[test]
    fn ground_limits() {
        assert!(VerticalLimit::Gnd.is_ground());
        assert!(VerticalLimit::Agl(0.0).is_ground());
        assert!(!VerticalLimit::Agl(10.0).is_ground());
        assert!(!VerticalLimit::Amsl(0.0).is_ground());
    }

    #[test]
    fn fixed_limits_are_constant() {
        let r = resolve_amsl(&VerticalLimit::FlightLevel(100), &ring(), &NoTerrain);
        assert!(r.covered);
        assert_eq!(r.altitudes.len(), 4);
        assert!(r.altitudes.iter().all(|&a| (a - 3048.0).abs() < 1e-6));
    }

    #[test]
    fn agl_adds_terrain() {
        let r = resolve_amsl(&VerticalLimit::Agl(300.0), &ring(), &FlatTerrain(250.0));
        assert!(r.covered);
        assert!(r.altitudes.iter().all(|&a| (a - 550.0).abs() < 1e-6));
    }

    #[test]
    fn agl_without_terrain_falls_back() {
        let r = resolve_amsl(&VerticalLimit::Agl(300.0), &ring(), &Patchy);
        assert!(!r.covered);
        // western vertices borrow the elevation of their neighbours
        assert_eq!(r.altitudes, vec![400.0, 400.0, 400.0, 400.0]);

        let r = resolve_amsl(&VerticalLimit::Agl(300.0), &ring(), &NoTerrain);
        assert!(!r.covered);
        assert!(r.altitudes.iter().all(|&a| (a - 300.0).abs() < 1e-6));
    }

    #[test]
    fn ground_without_terrain_is_still_covered() {
        let r = resolve_amsl(&VerticalLimit::Gnd, &ring(), &NoTerrain);
        assert!(r.covered);
        assert!(r.altitudes.iter().all(|&a| a == 0.0));
    }
}

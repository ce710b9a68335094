use derive_builder::Builder;
use std::fmt;

use crate::error::Error;
use crate::latlon::LatLon;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum WaypointType {
    Unknown = 0,
    Normal,
    AirfieldGrass,
    Outlanding,
    GlidingAirfield,
    AirfieldSolid,
    MountainPass,
    MountainTop,
    TransmitterMast,
    Vor,
    Ndb,
    CoolingTower,
    Dam,
    Tunnel,
    Bridge,
    PowerPlant,
    Castle,
    Intersection,
}

impl WaypointType {
    pub const ALL: [WaypointType; 18] = [
        WaypointType::Unknown,
        WaypointType::Normal,
        WaypointType::AirfieldGrass,
        WaypointType::Outlanding,
        WaypointType::GlidingAirfield,
        WaypointType::AirfieldSolid,
        WaypointType::MountainPass,
        WaypointType::MountainTop,
        WaypointType::TransmitterMast,
        WaypointType::Vor,
        WaypointType::Ndb,
        WaypointType::CoolingTower,
        WaypointType::Dam,
        WaypointType::Tunnel,
        WaypointType::Bridge,
        WaypointType::PowerPlant,
        WaypointType::Castle,
        WaypointType::Intersection,
    ];

    pub fn from_style(style: i64) -> Option<Self> {
        usize::try_from(style)
            .ok()
            .and_then(|i| WaypointType::ALL.get(i))
            .copied()
    }

    pub fn style(self) -> usize {
        self as usize
    }

    pub fn is_airfield(self) -> bool {
        match self {
            WaypointType::AirfieldGrass
            | WaypointType::Outlanding
            | WaypointType::GlidingAirfield
            | WaypointType::AirfieldSolid => true,
            WaypointType::Unknown
            | WaypointType::Normal
            | WaypointType::MountainPass
            | WaypointType::MountainTop
            | WaypointType::TransmitterMast
            | WaypointType::Vor
            | WaypointType::Ndb
            | WaypointType::CoolingTower
            | WaypointType::Dam
            | WaypointType::Tunnel
            | WaypointType::Bridge
            | WaypointType::PowerPlant
            | WaypointType::Castle
            | WaypointType::Intersection => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WaypointType::Unknown => "Unknown",
            WaypointType::Normal => "Waypoint",
            WaypointType::AirfieldGrass => "Airfield with grass runway",
            WaypointType::Outlanding => "Outlanding",
            WaypointType::GlidingAirfield => "Gliding airfield",
            WaypointType::AirfieldSolid => "Airfield with solid runway",
            WaypointType::MountainPass => "Mountain pass",
            WaypointType::MountainTop => "Mountain top",
            WaypointType::TransmitterMast => "Transmitter mast",
            WaypointType::Vor => "VOR",
            WaypointType::Ndb => "NDB",
            WaypointType::CoolingTower => "Cooling tower",
            WaypointType::Dam => "Dam",
            WaypointType::Tunnel => "Tunnel",
            WaypointType::Bridge => "Bridge",
            WaypointType::PowerPlant => "Power plant",
            WaypointType::Castle => "Castle",
            WaypointType::Intersection => "Intersection",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        text.parse::<i64>()
            .ok()
            .and_then(WaypointType::from_style)
            .or_else(|| {
                WaypointType::ALL
                    .iter()
                    .copied()
                    .find(|t| t.label().eq_ignore_ascii_case(text))
            })
    }
}

impl fmt::Display for WaypointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn is_airband_frequency(mhz: f32) -> bool {
    (118.0..=137.0).contains(&mhz)
}

pub fn is_vor_frequency(mhz: f32) -> bool {
    (108.0..=117.975).contains(&mhz)
}

pub fn is_ndb_frequency(khz: f32) -> bool {
    (190.0..=1750.0).contains(&khz)
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Airfield {
    pub runway_dir: Option<u16>,
    pub runway_length: Option<u32>,
    pub frequency: Option<f32>,
    pub secondary_frequency: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct Waypoint {
    pub name: String,
    #[builder(default)]
    pub code: String,
    #[builder(default)]
    pub country: String,
    pub position: LatLon,
    #[builder(default)]
    pub elevation: f64,
    #[builder(default = "WaypointType::Unknown")]
    pub kind: WaypointType,
    #[builder(default)]
    pub description: String,
    #[builder(default, setter(into, strip_option))]
    pub other_frequency: Option<f32>,
    #[builder(default, setter(into, strip_option))]
    pub airfield: Option<Airfield>,
}

impl WaypointBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.name {
            Some(ref n) if !n.trim().is_empty() => (),
            _ => return Err("waypoint name is empty".to_string()),
        }
        let kind = self.kind.unwrap_or(WaypointType::Unknown);
        match self.airfield {
            Some(Some(_)) if !kind.is_airfield() => {
                Err(format!("{} cannot carry airfield data", kind))
            }
            _ => Ok(()),
        }
    }
}

impl From<WaypointBuilderError> for Error {
    fn from(e: WaypointBuilderError) -> Error {
        Error::Builder {
            reason: e.to_string(),
        }
    }
}

impl Waypoint {
    pub fn is_airfield(&self) -> bool {
        self.kind.is_airfield()
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Type: {}", self.kind),
            format!("Coordinates: {}", self.position.to_dms()),
            format!("Elevation: {:.0} m", self.elevation),
        ];
        if !self.code.is_empty() {
            lines.push(format!("Code: {}", self.code));
        }
        if !self.country.is_empty() {
            lines.push(format!("Country: {}", self.country));
        }
        if let Some(ref a) = self.airfield {
            if let Some(dir) = a.runway_dir {
                lines.push(format!("Runway direction: {:03}", dir));
            }
            if let Some(len) = a.runway_length {
                lines.push(format!("Runway length: {} m", len));
            }
            if let Some(f) = a.frequency {
                lines.push(format!("Frequency: {:.3} MHz", f));
            }
            if let Some(f) = a.secondary_frequency {
                lines.push(format!("Secondary frequency: {:.3} MHz", f));
            }
        }
        if let Some(f) = self.other_frequency {
            match self.kind {
                WaypointType::Ndb => lines.push(format!("Frequency: {:.1} kHz", f)),
                _ => lines.push(format!("Frequency: {:.2} MHz", f)),
            }
        }
        if !self.description.is_empty() {
            lines.push(self.description.clone());
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_outside_range_are_rejected() {
        assert_eq!(WaypointType::from_style(0), Some(WaypointType::Unknown));
        assert_eq!(WaypointType::from_style(9), Some(WaypointType::Vor));
        assert_eq!(WaypointType::from_style(17), Some(WaypointType::Intersection));
        assert_eq!(WaypointType::from_style(18), None);
        assert_eq!(WaypointType::from_style(-1), None);
    }

    #[test]
    fn airfield_payload_only_on_airfields() {
        let vor = WaypointBuilder::default()
            .name("HELGOLAND")
            .position(LatLon::new(54.1857, 7.9107))
            .kind(WaypointType::Vor)
            .airfield(Airfield::default())
            .build();
        assert!(vor.is_err());

        let field = WaypointBuilder::default()
            .name("Itzehoe")
            .code("EDHF")
            .position(LatLon::new(53.9925, 9.5767))
            .kind(WaypointType::AirfieldGrass)
            .airfield(Airfield {
                runway_dir: Some(30),
                runway_length: Some(1200),
                frequency: Some(122.6),
                secondary_frequency: None,
            })
            .build()
            .unwrap();
        assert!(field.is_airfield());
        assert!(field.summary().contains("Runway direction: 030"));
    }

    #[test]
    fn name_is_mandatory() {
        let wp = WaypointBuilder::default()
            .name("  ")
            .position(LatLon::new(0.0, 0.0))
            .build();
        assert!(wp.is_err());
    }

    #[test]
    fn frequency_bands() {
        assert!(is_airband_frequency(122.8));
        assert!(!is_airband_frequency(117.0));
        assert!(is_vor_frequency(112.3));
        assert!(is_ndb_frequency(375.0));
        assert!(!is_ndb_frequency(112.3));
    }
}

use derive_builder::Builder;
use geo::{Distance, Geodesic};
use std::fmt;

use crate::altitude::VerticalLimit;
use crate::error::Error;
use crate::latlon::LatLon;

// declaration order is the folder order of written documents
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum AirspaceCategory {
    ClassA,
    ClassB,
    ClassC,
    ClassD,
    ClassE,
    ClassF,
    ClassG,
    Ctr,
    Tma,
    Restricted,
    Danger,
    Prohibited,
    Tmz,
    Rmz,
    GliderProhibited,
    WaveWindow,
    GlidingSector,
    Unclassified,
}

impl AirspaceCategory {
    pub const ALL: [AirspaceCategory; 18] = [
        AirspaceCategory::ClassA,
        AirspaceCategory::ClassB,
        AirspaceCategory::ClassC,
        AirspaceCategory::ClassD,
        AirspaceCategory::ClassE,
        AirspaceCategory::ClassF,
        AirspaceCategory::ClassG,
        AirspaceCategory::Ctr,
        AirspaceCategory::Tma,
        AirspaceCategory::Restricted,
        AirspaceCategory::Danger,
        AirspaceCategory::Prohibited,
        AirspaceCategory::Tmz,
        AirspaceCategory::Rmz,
        AirspaceCategory::GliderProhibited,
        AirspaceCategory::WaveWindow,
        AirspaceCategory::GlidingSector,
        AirspaceCategory::Unclassified,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            AirspaceCategory::ClassA => "A",
            AirspaceCategory::ClassB => "B",
            AirspaceCategory::ClassC => "C",
            AirspaceCategory::ClassD => "D",
            AirspaceCategory::ClassE => "E",
            AirspaceCategory::ClassF => "F",
            AirspaceCategory::ClassG => "G",
            AirspaceCategory::Ctr => "CTR",
            AirspaceCategory::Tma => "TMA",
            AirspaceCategory::Restricted => "R",
            AirspaceCategory::Danger => "Q",
            AirspaceCategory::Prohibited => "P",
            AirspaceCategory::Tmz => "TMZ",
            AirspaceCategory::Rmz => "RMZ",
            AirspaceCategory::GliderProhibited => "GP",
            AirspaceCategory::WaveWindow => "W",
            AirspaceCategory::GlidingSector => "GSEC",
            AirspaceCategory::Unclassified => "UNC",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AirspaceCategory::ClassA => "Class A",
            AirspaceCategory::ClassB => "Class B",
            AirspaceCategory::ClassC => "Class C",
            AirspaceCategory::ClassD => "Class D",
            AirspaceCategory::ClassE => "Class E",
            AirspaceCategory::ClassF => "Class F",
            AirspaceCategory::ClassG => "Class G",
            AirspaceCategory::Ctr => "CTR",
            AirspaceCategory::Tma => "TMA",
            AirspaceCategory::Restricted => "Restricted",
            AirspaceCategory::Danger => "Danger",
            AirspaceCategory::Prohibited => "Prohibited",
            AirspaceCategory::Tmz => "TMZ",
            AirspaceCategory::Rmz => "RMZ",
            AirspaceCategory::GliderProhibited => "Glider prohibited",
            AirspaceCategory::WaveWindow => "Wave window",
            AirspaceCategory::GlidingSector => "Gliding sector",
            AirspaceCategory::Unclassified => "Unclassified",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        AirspaceCategory::ALL
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(text) || c.label().eq_ignore_ascii_case(text))
    }

    pub fn title(self, name: &str) -> String {
        let label = match self {
            AirspaceCategory::Unclassified => return name.to_string(),
            _ => self.label(),
        };
        if name.len() >= label.len()
            && name.is_char_boundary(label.len())
            && name[..label.len()].eq_ignore_ascii_case(label)
        {
            name.to_string()
        } else {
            format!("{} {}", label, name)
        }
    }
}

impl fmt::Display for AirspaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    Point(LatLon),
    /// Arc around `center` from `start` to `end`. Radius in metres.
    Arc {
        center: LatLon,
        radius: f64,
        start: LatLon,
        end: LatLon,
        clockwise: bool,
    },
    Circle { center: LatLon, radius: f64 },
}

impl Primitive {
    pub fn arc(center: LatLon, start: LatLon, end: LatLon, clockwise: bool) -> Self {
        Primitive::Arc {
            center,
            radius: Geodesic.distance(center.into(), start.into()),
            start,
            end,
            clockwise,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct Airspace {
    pub category: AirspaceCategory,
    pub name: String,
    #[builder(default = "VerticalLimit::Gnd")]
    pub floor: VerticalLimit,
    pub ceiling: VerticalLimit,
    #[builder(default, setter(each(name = "primitive")))]
    pub boundary: Vec<Primitive>,
}

impl AirspaceBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.boundary {
            Some(ref b) if !b.is_empty() => Ok(()),
            _ => Err("airspace boundary is empty".to_string()),
        }
    }
}

impl From<AirspaceBuilderError> for Error {
    fn from(e: AirspaceBuilderError) -> Error {
        Error::Builder {
            reason: e.to_string(),
        }
    }
}

impl Airspace {
    pub fn is_grounded(&self) -> bool {
        self.floor.is_ground()
    }

    pub fn title(&self) -> String {
        self.category.title(&self.name)
    }

    pub fn description(&self) -> String {
        format!(
            "Class: {}\nTop: {}\nBase: {}",
            self.category.label(),
            self.ceiling,
            self.floor
        )
    }
}

impl fmt::Display for Airspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} | {}/{}",
            self.name, self.category, self.ceiling, self.floor
        )
    }
}

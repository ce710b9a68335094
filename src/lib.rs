//! Converts airspaces and waypoints between KML/KMZ and SeeYou CUP files.
#![deny(clippy::all)]
#![forbid(unsafe_code)]

pub mod airspace;
pub mod altitude;
pub mod collections;
pub mod cup;
pub mod error;
pub mod kml;
pub mod latlon;
pub mod sampler;
pub mod solid;
pub mod txt_data;
pub mod waypoint;
pub mod zip_util;

pub use airspace::{Airspace, AirspaceBuilder, AirspaceCategory, Primitive};
pub use altitude::{ElevationSource, FlatTerrain, NoTerrain, VerticalLimit};
pub use collections::{Airspaces, Waypoints};
pub use error::{Error, Result};
pub use kml::{ExtentRule, KmlReader, KmlWriter};
pub use latlon::LatLon;
pub use sampler::BoundarySampler;
pub use waypoint::{Airfield, Waypoint, WaypointBuilder, WaypointType};

use lazy_static::lazy_static;
use regex::Regex;

use crate::airspace::AirspaceCategory;
use crate::waypoint::WaypointType;

pub const DEFAULT_ICONS_BASE: &str = "http://maps.google.com/mapfiles/kml/shapes/";

const AIRSPACE_COLORS: [&str; 18] = [
    "0000ff", // A
    "0000ff", // B
    "0066ff", // C
    "ff3300", // D
    "00cc00", // E
    "00ffcc", // F
    "999999", // G
    "0000cc", // CTR
    "ff6600", // TMA
    "0000ff", // R
    "0066cc", // Q
    "000099", // P
    "cc00cc", // TMZ
    "ff00ff", // RMZ
    "003399", // GP
    "ffff00", // W
    "33cc33", // GSEC
    "cccccc", // UNC
];
const DEFAULT_AIRSPACE_COLOR: &str = "ffffff";

const LINE_ALPHA: &str = "ff";
const POLY_ALPHA: &str = "40";

const WAYPOINT_ICONS: [&str; 18] = [
    "placemark_circle.png", // unknown
    "placemark_circle.png", // normal
    "airports.png",         // grass
    "target.png",           // outlanding
    "airports.png",         // gliding
    "airports.png",         // solid
    "hiker.png",            // pass
    "triangle.png",         // top
    "electronics.png",      // mast
    "polygon.png",          // VOR
    "donut.png",            // NDB
    "square.png",           // cooling tower
    "water.png",            // dam
    "rail.png",             // tunnel
    "square.png",           // bridge
    "caution.png",          // power plant
    "flag.png",             // castle
    "cross-hairs.png",      // intersection
];
const DEFAULT_WAYPOINT_ICON: &str = "placemark_circle.png";

const AIRFIELD_COLORS: [(WaypointType, &str); 4] = [
    (WaypointType::AirfieldGrass, "ff00cc00"),
    (WaypointType::Outlanding, "ff00ccff"),
    (WaypointType::GlidingAirfield, "ffff9900"),
    (WaypointType::AirfieldSolid, "ff0000ff"),
];
const DEFAULT_ICON_COLOR: &str = "ffffffff";

pub fn airspace_style_id(category: AirspaceCategory) -> String {
    format!("Airspace_{}", category.code())
}

pub fn waypoint_style_id(kind: WaypointType) -> String {
    format!("Waypoint_{}", kind.style())
}

pub fn waypoint_type_from_style_url(url: &str) -> Option<WaypointType> {
    lazy_static! {
        static ref STYLE_URL_REGEX: Regex = Regex::new(r"#Waypoint_(\d+)$").unwrap();
    }
    let cap = STYLE_URL_REGEX.captures(url.trim())?;
    WaypointType::from_style(cap[1].parse().ok()?)
}

fn airspace_color(category: AirspaceCategory) -> &'static str {
    AIRSPACE_COLORS
        .get(category.index())
        .copied()
        .unwrap_or(DEFAULT_AIRSPACE_COLOR)
}

pub fn airspace_line_color(category: AirspaceCategory) -> String {
    format!("{}{}", LINE_ALPHA, airspace_color(category))
}

pub fn airspace_poly_color(category: AirspaceCategory) -> String {
    format!("{}{}", POLY_ALPHA, airspace_color(category))
}

pub fn waypoint_icon(kind: WaypointType) -> &'static str {
    WAYPOINT_ICONS
        .get(kind.style())
        .copied()
        .unwrap_or(DEFAULT_WAYPOINT_ICON)
}

pub fn waypoint_icon_color(kind: WaypointType) -> &'static str {
    AIRFIELD_COLORS
        .iter()
        .find(|(t, _)| *t == kind)
        .map(|(_, c)| *c)
        .unwrap_or(DEFAULT_ICON_COLOR)
}

pub fn prepare_text(text: &str) -> String {
    let clean: String = text
        .trim()
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect();
    quick_xml::escape::escape(clean.as_str()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_color() {
        for c in AirspaceCategory::ALL.iter() {
            assert_eq!(airspace_line_color(*c).len(), 8);
            assert!(airspace_poly_color(*c).starts_with(POLY_ALPHA));
        }
        assert_eq!(airspace_line_color(AirspaceCategory::ClassD), "ffff3300");
    }

    #[test]
    fn icons_by_type() {
        assert_eq!(waypoint_icon(WaypointType::AirfieldSolid), "airports.png");
        assert_eq!(waypoint_icon(WaypointType::Ndb), "donut.png");
        assert_eq!(waypoint_icon_color(WaypointType::AirfieldSolid), "ff0000ff");
        assert_eq!(waypoint_icon_color(WaypointType::Vor), DEFAULT_ICON_COLOR);
    }

    #[test]
    fn style_urls_round_trip() {
        for t in WaypointType::ALL.iter() {
            let url = format!("#{}", waypoint_style_id(*t));
            assert_eq!(waypoint_type_from_style_url(&url), Some(*t));
        }
        assert_eq!(waypoint_type_from_style_url("#Waypoint_42"), None);
        assert_eq!(waypoint_type_from_style_url("#Other"), None);
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(prepare_text("  R&D <zone>\u{7} "), "R&amp;D &lt;zone&gt;");
        assert_eq!(prepare_text("Top: FL65\nBase: GND"), "Top: FL65\nBase: GND");
    }
}

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use roxmltree::{Document, Node};

use super::style::waypoint_type_from_style_url;
use super::{is_kmz, keys, RecordOutcome};
use crate::airspace::{AirspaceBuilder, AirspaceCategory, Primitive};
use crate::altitude::VerticalLimit;
use crate::collections::{Airspaces, Waypoints};
use crate::error::Result;
use crate::latlon::LatLon;
use crate::waypoint::{Airfield, WaypointBuilder, WaypointType};

const ALTITUDE_EPSILON: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExtentRule {
    /// Lowest and highest vertex altitude over all faces.
    #[default]
    MinMax,
    /// Lowest and highest mean altitude of the faces. Placemarks with a
    /// single face fall back to `MinMax`.
    FaceMean,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadSummary {
    outcomes: Vec<RecordOutcome>,
}

impl ReadSummary {
    pub fn outcomes(&self) -> &[RecordOutcome] {
        &self.outcomes
    }

    pub fn converted(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_skipped()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Inherited {
    airspace: Option<AirspaceCategory>,
    waypoint: Option<WaypointType>,
}

enum Shape<'a, 'i> {
    Polygons(Vec<Node<'a, 'i>>),
    LineString(Node<'a, 'i>),
    Point(Node<'a, 'i>),
    Unrecognized,
}

impl<'a, 'i> Shape<'a, 'i> {
    fn classify(placemark: Node<'a, 'i>) -> Self {
        let polygons: Vec<_> = placemark
            .descendants()
            .filter(|n| n.has_tag_name("Polygon"))
            .collect();
        if !polygons.is_empty() {
            return Shape::Polygons(polygons);
        }
        if let Some(line) = get_descendant_node(placemark, "LineString") {
            return Shape::LineString(line);
        }
        if let Some(point) = get_descendant_node(placemark, "Point") {
            return Shape::Point(point);
        }
        Shape::Unrecognized
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AltitudeMode {
    Absolute,
    RelativeToGround,
    ClampToGround,
}

impl AltitudeMode {
    fn of(geometry: Node) -> Self {
        match get_child_text(geometry, "altitudeMode").map(str::trim) {
            Some("relativeToGround") => AltitudeMode::RelativeToGround,
            Some("clampToGround") | Some("clampToSeaFloor") => AltitudeMode::ClampToGround,
            _ => AltitudeMode::Absolute,
        }
    }
}

#[derive(Debug)]
struct Face {
    ring: Vec<(LatLon, f64)>,
    extruded: bool,
    mode: AltitudeMode,
}

impl Face {
    fn from_geometry(geometry: Node) -> std::result::Result<Face, String> {
        let text = get_descendant_text(geometry, "coordinates")
            .ok_or_else(|| "no coordinates".to_string())?;
        let ring = parse_coordinates(text)?;
        let extruded = get_child_text(geometry, "extrude").is_some_and(|e| e.trim() == "1");
        Ok(Face {
            ring,
            extruded,
            mode: AltitudeMode::of(geometry),
        })
    }

    fn mean_altitude(&self) -> f64 {
        self.ring.iter().map(|&(_, alt)| alt).sum::<f64>() / self.ring.len() as f64
    }

    fn altitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.ring.iter().map(|&(_, alt)| alt)
    }

    fn is_horizontal(&self) -> bool {
        let (lo, hi) = min_max(self.altitudes());
        hi - lo < ALTITUDE_EPSILON
    }

    fn vertices(&self) -> Vec<LatLon> {
        let mut out: Vec<LatLon> = Vec::with_capacity(self.ring.len());
        for &(p, _) in &self.ring {
            if !out.last().is_some_and(|&last| last.approx_eq(p, 1e-9)) {
                out.push(p);
            }
        }
        if out.len() > 1 && out[0].approx_eq(out[out.len() - 1], 1e-9) {
            out.pop();
        }
        out
    }
}

fn parse_coordinates(text: &str) -> std::result::Result<Vec<(LatLon, f64)>, String> {
    let ring = text
        .split_whitespace()
        .map(|tuple| {
            LatLon::from_kml(tuple).ok_or_else(|| format!("unparsable coordinate tuple '{}'", tuple))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if ring.is_empty() {
        return Err("no coordinates".to_string());
    }
    Ok(ring)
}

fn min_max<I: Iterator<Item = f64>>(values: I) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn infer_extent(faces: &[Face], rule: ExtentRule) -> (VerticalLimit, VerticalLimit) {
    let relative = faces
        .iter()
        .any(|f| f.mode == AltitudeMode::RelativeToGround);
    let limit = |alt: f64| {
        if relative {
            VerticalLimit::Agl(alt)
        } else {
            VerticalLimit::Amsl(alt)
        }
    };

    if let Some(face) = faces.iter().find(|f| f.extruded) {
        let top = face.mean_altitude();
        if top <= 0.0 {
            debug!("Extruded face at or below ground level");
            return (VerticalLimit::Gnd, VerticalLimit::Gnd);
        }
        return (VerticalLimit::Gnd, limit(top));
    }

    let (lo, hi) = match rule {
        ExtentRule::FaceMean if faces.len() > 1 => min_max(faces.iter().map(Face::mean_altitude)),
        _ => min_max(faces.iter().flat_map(Face::altitudes)),
    };

    if hi <= 0.0 {
        (VerticalLimit::Gnd, VerticalLimit::Gnd)
    } else if hi - lo < ALTITUDE_EPSILON || lo <= ALTITUDE_EPSILON {
        (VerticalLimit::Gnd, limit(hi))
    } else {
        (limit(lo), limit(hi))
    }
}

/// Boundary face: the extruded one, else the first horizontal one, else the
/// first one with the most distinct vertices.
fn boundary_face(faces: &[Face]) -> Option<&Face> {
    faces
        .iter()
        .find(|f| f.extruded)
        .or_else(|| faces.iter().find(|f| f.is_horizontal()))
        .or_else(|| most_vertices(faces))
}

fn most_vertices(faces: &[Face]) -> Option<&Face> {
    let mut best: Option<(&Face, usize)> = None;
    for face in faces {
        let count = face.vertices().len();
        if !matches!(best, Some((_, most)) if most >= count) {
            best = Some((face, count));
        }
    }
    best.map(|(face, _)| face)
}

fn get_child_node<'a, 'i>(n: Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    n.children().find(|c| c.has_tag_name(tag))
}

fn get_child_text<'a>(n: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    get_child_node(n, tag).and_then(|c| c.text())
}

fn get_descendant_node<'a, 'i>(n: Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    n.descendants().find(|d| d.has_tag_name(tag))
}

fn get_descendant_text<'a>(n: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    get_descendant_node(n, tag).and_then(|d| d.text())
}

fn extended_data<'a>(n: Node<'a, '_>) -> HashMap<&'a str, &'a str> {
    let mut data = HashMap::new();
    let ext = match get_child_node(n, "ExtendedData") {
        Some(ext) => ext,
        None => return data,
    };
    for d in ext.descendants() {
        let name = match d.attribute("name") {
            Some(name) => name,
            None => continue,
        };
        let value = if d.has_tag_name("Data") {
            get_child_text(d, "value")
        } else if d.has_tag_name("SimpleData") {
            d.text()
        } else {
            None
        };
        data.insert(name, value.unwrap_or("").trim());
    }
    data
}

fn detect_icons_path() -> Option<PathBuf> {
    let local = PathBuf::from("icons");
    if local.is_dir() {
        return Some(local);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("icons")))
        .filter(|dir| dir.is_dir())
}

#[derive(Clone, Debug)]
pub struct KmlReader {
    line_strings_as_airspaces: bool,
    extent_rule: ExtentRule,
    icons_path: Option<PathBuf>,
}

impl Default for KmlReader {
    fn default() -> Self {
        KmlReader::new()
    }
}

impl KmlReader {
    pub fn new() -> Self {
        KmlReader {
            line_strings_as_airspaces: true,
            extent_rule: ExtentRule::default(),
            icons_path: detect_icons_path(),
        }
    }

    pub fn line_strings_as_airspaces(mut self, enabled: bool) -> Self {
        self.line_strings_as_airspaces = enabled;
        self
    }

    pub fn extent_rule(mut self, rule: ExtentRule) -> Self {
        self.extent_rule = rule;
        self
    }

    pub fn icons_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.icons_path = Some(path.into());
        self
    }

    pub fn read<P: AsRef<Path>>(
        &self,
        path: P,
        airspaces: &mut Airspaces,
        waypoints: &mut Waypoints,
    ) -> Result<ReadSummary> {
        let path = path.as_ref();
        info!("Reading KML file: {}", path.display());

        let file = File::open(path)?;
        let text = if is_kmz(path) {
            let doc = crate::zip_util::kmz_to_pseudofile(BufReader::new(file))?;
            crate::zip_util::pseudofile_to_str(&doc)?.to_string()
        } else {
            let mut text = String::new();
            BufReader::new(file).read_to_string(&mut text)?;
            text
        };

        self.read_str(&text, airspaces, waypoints)
    }

    pub fn read_str(
        &self,
        text: &str,
        airspaces: &mut Airspaces,
        waypoints: &mut Waypoints,
    ) -> Result<ReadSummary> {
        let doc = Document::parse(text)?;
        let root = doc.root_element();
        self.check_icons(root);

        let mut summary = ReadSummary::default();
        self.walk(root, Inherited::default(), airspaces, waypoints, &mut summary);
        info!(
            "Read {} records, skipped {}",
            summary.converted(),
            summary.skipped()
        );
        Ok(summary)
    }

    fn check_icons(&self, root: Node) {
        let hrefs = root
            .descendants()
            .filter(|n| n.has_tag_name("Icon"))
            .filter_map(|icon| get_child_text(icon, "href"))
            .map(str::trim)
            .filter(|href| !href.is_empty() && !href.contains("://"));

        for href in hrefs {
            match self.icons_path {
                Some(ref base) if !base.join(href).exists() => {
                    debug!("Icon {} not found in {}", href, base.display())
                }
                Some(_) => (),
                None => debug!("No icons directory to resolve {}", href),
            }
        }
    }

    fn walk(
        &self,
        node: Node,
        inherited: Inherited,
        airspaces: &mut Airspaces,
        waypoints: &mut Waypoints,
        summary: &mut ReadSummary,
    ) {
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "Document" | "Folder" => {
                    if !child.children().any(|c| {
                        c.has_tag_name("Placemark")
                            || c.has_tag_name("Folder")
                            || c.has_tag_name("Document")
                    }) {
                        warn!(
                            "Skipping empty folder {}",
                            get_child_text(child, "name").unwrap_or("")
                        );
                        continue;
                    }
                    let inner = Self::enter_folder(child, inherited);
                    self.walk(child, inner, airspaces, waypoints, summary);
                }
                "Placemark" => {
                    let name = get_child_text(child, "name").unwrap_or("").trim();
                    let outcome = match self.placemark(child, inherited, airspaces, waypoints) {
                        Ok(record) => RecordOutcome::Converted(record),
                        Err(reason) => {
                            warn!("Skipping placemark {}: {}", name, reason);
                            RecordOutcome::Skipped {
                                record: name.to_string(),
                                reason,
                            }
                        }
                    };
                    summary.outcomes.push(outcome);
                }
                _ => (),
            }
        }
    }

    fn enter_folder(folder: Node, parent: Inherited) -> Inherited {
        let mut inherited = parent;
        let data = extended_data(folder);
        let tag = data
            .get(keys::CATEGORY)
            .copied()
            .or_else(|| get_child_text(folder, "name"))
            .unwrap_or("");

        if let Some(category) = AirspaceCategory::parse(tag) {
            inherited.airspace = Some(category);
        } else if let Some(kind) = WaypointType::parse(tag) {
            inherited.waypoint = Some(kind);
        }
        inherited
    }

    fn placemark(
        &self,
        placemark: Node,
        inherited: Inherited,
        airspaces: &mut Airspaces,
        waypoints: &mut Waypoints,
    ) -> std::result::Result<String, String> {
        match Shape::classify(placemark) {
            Shape::Polygons(polygons) => {
                let faces = polygons
                    .into_iter()
                    .map(Face::from_geometry)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                self.airspace(placemark, inherited, &faces, airspaces)
            }
            Shape::LineString(line) => {
                if !self.line_strings_as_airspaces {
                    return Err("line string read as a track, not as an airspace".to_string());
                }
                let face = Face::from_geometry(line)?;
                self.airspace(placemark, inherited, &[face], airspaces)
            }
            Shape::Point(point) => self.waypoint(placemark, point, inherited, waypoints),
            Shape::Unrecognized => Err("no supported geometry".to_string()),
        }
    }

    fn airspace(
        &self,
        placemark: Node,
        inherited: Inherited,
        faces: &[Face],
        airspaces: &mut Airspaces,
    ) -> std::result::Result<String, String> {
        let data = extended_data(placemark);
        let name = data
            .get(keys::NAME)
            .copied()
            .or_else(|| get_child_text(placemark, "name"))
            .unwrap_or("")
            .trim()
            .to_string();
        let category = data
            .get(keys::CATEGORY)
            .and_then(|c| AirspaceCategory::parse(c))
            .or(inherited.airspace)
            .unwrap_or(AirspaceCategory::Unclassified);

        let explicit = |key: &str| data.get(key).and_then(|v| v.parse::<VerticalLimit>().ok());
        let (floor, ceiling) = match (explicit(keys::BASE), explicit(keys::TOP)) {
            (Some(base), Some(top)) => (base, top),
            _ => {
                if faces.iter().any(|f| f.mode == AltitudeMode::ClampToGround) {
                    warn!(
                        "Airspace {} is clamped to the ground, altitudes may be missing",
                        name
                    );
                }
                infer_extent(faces, self.extent_rule)
            }
        };
        if floor == VerticalLimit::Gnd && ceiling == VerticalLimit::Gnd {
            warn!("Airspace {} has no vertical extent", name);
        }

        let vertices = boundary_face(faces)
            .map(Face::vertices)
            .unwrap_or_default();
        if vertices.len() < 3 {
            return Err("boundary has fewer than three vertices".to_string());
        }

        let airspace = AirspaceBuilder::default()
            .category(category)
            .name(name.clone())
            .floor(floor)
            .ceiling(ceiling)
            .boundary(vertices.into_iter().map(Primitive::Point).collect::<Vec<_>>())
            .build()
            .map_err(|e| e.to_string())?;
        airspaces.push_airspace(airspace);
        Ok(name)
    }

    fn waypoint(
        &self,
        placemark: Node,
        point: Node,
        inherited: Inherited,
        waypoints: &mut Waypoints,
    ) -> std::result::Result<String, String> {
        let data = extended_data(placemark);
        let name = get_child_text(placemark, "name").unwrap_or("").trim();
        let coordinates = get_descendant_text(point, "coordinates")
            .ok_or_else(|| "no coordinates".to_string())?;
        let (position, elevation) = match parse_coordinates(coordinates)?.as_slice() {
            [only] => *only,
            _ => return Err("point with more than one coordinate tuple".to_string()),
        };

        let kind = data
            .get(keys::STYLE)
            .and_then(|s| WaypointType::parse(s))
            .or_else(|| get_child_text(placemark, "styleUrl").and_then(waypoint_type_from_style_url))
            .or(inherited.waypoint)
            .unwrap_or(WaypointType::Unknown);

        let number = |key: &str| data.get(key).and_then(|v| v.parse::<f32>().ok());
        let description = data
            .get(keys::DESCRIPTION)
            .copied()
            .or_else(|| get_child_text(placemark, "description"))
            .unwrap_or("")
            .trim();

        let mut builder = WaypointBuilder::default();
        builder
            .name(name)
            .code(data.get(keys::CODE).copied().unwrap_or(""))
            .country(data.get(keys::COUNTRY).copied().unwrap_or(""))
            .position(position)
            .elevation(elevation)
            .kind(kind)
            .description(description);
        if let Some(freq) = number(keys::OTHER_FREQUENCY) {
            builder.other_frequency(freq);
        }
        if kind.is_airfield() {
            let airfield = Airfield {
                runway_dir: data.get(keys::RUNWAY_DIR).and_then(|v| v.parse().ok()),
                runway_length: data.get(keys::RUNWAY_LENGTH).and_then(|v| v.parse().ok()),
                frequency: number(keys::FREQUENCY),
                secondary_frequency: number(keys::SECONDARY_FREQUENCY),
            };
            if airfield != Airfield::default() {
                builder.airfield(airfield);
            }
        }

        let waypoint = builder.build().map_err(|e| e.to_string())?;
        waypoints.push_waypoint(waypoint);
        Ok(name.to_string())
    }
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use log::{info, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::style::{self, DEFAULT_ICONS_BASE};
use super::{is_kmz, keys, RecordOutcome, KML_NAMESPACE};
use crate::airspace::Airspace;
use crate::altitude::ElevationSource;
use crate::collections::{Airspaces, Waypoints};
use crate::error::{Error, Result};
use crate::sampler::BoundarySampler;
use crate::solid::{Corner, Solid};
use crate::waypoint::Waypoint;
use crate::zip_util::pseudofile_to_kmz;

#[derive(Clone, Debug, PartialEq)]
pub struct WriteSummary {
    outcomes: Vec<RecordOutcome>,
    all_agl_covered: bool,
}

impl WriteSummary {
    pub fn all_agl_altitudes_covered(&self) -> bool {
        self.all_agl_covered
    }

    pub fn outcomes(&self) -> &[RecordOutcome] {
        &self.outcomes
    }

    pub fn written(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_skipped()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }
}

#[derive(Default)]
struct Fragment {
    events: Vec<Event<'static>>,
}

impl Fragment {
    fn start(&mut self, tag: &'static str) -> &mut Self {
        self.events.push(Event::Start(BytesStart::new(tag)));
        self
    }

    fn start_with(&mut self, tag: &'static str, attr: (&'static str, String)) -> &mut Self {
        let start = BytesStart::new(tag).with_attributes([(attr.0, attr.1.as_str())]);
        self.events.push(Event::Start(start.into_owned()));
        self
    }

    fn end(&mut self, tag: &'static str) -> &mut Self {
        self.events.push(Event::End(BytesEnd::new(tag)));
        self
    }

    fn text(&mut self, tag: &'static str, text: &str) -> &mut Self {
        self.start(tag);
        self.events
            .push(Event::Text(BytesText::from_escaped(style::prepare_text(text))));
        self.end(tag)
    }

    fn extended_data(&mut self, data: &[(&'static str, String)]) -> &mut Self {
        self.start("ExtendedData");
        for (key, value) in data {
            self.start_with("Data", ("name", key.to_string()))
                .text("value", value)
                .end("Data");
        }
        self.end("ExtendedData")
    }

    fn polygon<I: Iterator<Item = Corner>>(&mut self, corners: I, extrude: bool) -> &mut Self {
        let coordinates = corners.map(|(p, alt)| p.to_kml(alt)).join(" ");
        self.start("Polygon")
            .text("extrude", if extrude { "1" } else { "0" })
            .text("altitudeMode", "absolute")
            .start("outerBoundaryIs")
            .start("LinearRing")
            .text("coordinates", &coordinates)
            .end("LinearRing")
            .end("outerBoundaryIs")
            .end("Polygon")
    }

    fn write_to<W: Write>(self, writer: &mut Writer<W>) -> Result<()> {
        for event in self.events {
            writer.write_event(event)?;
        }
        Ok(())
    }
}

fn close_folder<W: Write>(writer: &mut Writer<W>) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new("Folder")))?;
    Ok(())
}

pub struct KmlWriter<'t> {
    sampler: BoundarySampler,
    terrain: &'t dyn ElevationSource,
    icons_base: String,
}

impl<'t> KmlWriter<'t> {
    pub fn new(terrain: &'t dyn ElevationSource) -> Self {
        KmlWriter {
            sampler: BoundarySampler::default(),
            terrain,
            icons_base: DEFAULT_ICONS_BASE.to_string(),
        }
    }

    pub fn sampler(mut self, sampler: BoundarySampler) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn icons_base<S: Into<String>>(mut self, base: S) -> Self {
        self.icons_base = base.into();
        self
    }

    /// Writes a `.kml` file, or a `.kmz` archive if the extension says so.
    ///
    /// Fails without touching `path` if there is nothing to write. Records
    /// that cannot be converted are skipped and reported in the summary.
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        airspaces: &Airspaces,
        waypoints: &Waypoints,
    ) -> Result<WriteSummary> {
        let path = path.as_ref();
        if airspaces.is_empty() && waypoints.is_empty() {
            warn!("KML output: no airspaces and no waypoints, nothing to write");
            return Err(Error::NothingToWrite);
        }

        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Airspaces");
        let mut doc = Vec::new();
        let summary = self.write_document(&mut doc, title, airspaces, waypoints)?;

        info!("Writing output file: {}", path.display());
        let file = File::create(path)?;
        if is_kmz(path) {
            pseudofile_to_kmz(BufWriter::new(file), &doc)?.flush()?;
        } else {
            let mut out = BufWriter::new(file);
            out.write_all(&doc)?;
            out.flush()?;
        }

        Ok(summary)
    }

    pub fn write_document<W: Write>(
        &self,
        out: W,
        title: &str,
        airspaces: &Airspaces,
        waypoints: &Waypoints,
    ) -> Result<WriteSummary> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        let mut summary = WriteSummary {
            outcomes: Vec::with_capacity(airspaces.len() + waypoints.len()),
            all_agl_covered: true,
        };

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut header = Fragment::default();
        header
            .start_with("kml", ("xmlns", KML_NAMESPACE.to_string()))
            .start("Document")
            .text("name", title)
            .text("open", "1");
        self.styles(&mut header, airspaces, waypoints);
        header.write_to(&mut writer)?;

        if !airspaces.is_empty() {
            let mut open = Fragment::default();
            open.start("Folder").text("name", "Airspaces").text("open", "1");
            open.write_to(&mut writer)?;

            for (category, records) in airspaces.categories() {
                let mut folder = Fragment::default();
                folder
                    .start("Folder")
                    .text("name", category.label())
                    .extended_data(&[(keys::CATEGORY, category.code().to_string())]);
                folder.write_to(&mut writer)?;

                for airspace in records {
                    match self.airspace(airspace) {
                        Ok((fragment, covered)) => {
                            fragment.write_to(&mut writer)?;
                            summary.all_agl_covered &= covered;
                            summary
                                .outcomes
                                .push(RecordOutcome::Converted(airspace.name.clone()));
                        }
                        Err(reason) => {
                            warn!("Skipping airspace {}: {}", airspace.name, reason);
                            summary.outcomes.push(RecordOutcome::Skipped {
                                record: airspace.name.clone(),
                                reason,
                            });
                        }
                    }
                }

                close_folder(&mut writer)?;
            }

            close_folder(&mut writer)?;
        }

        if !waypoints.is_empty() {
            let mut open = Fragment::default();
            open.start("Folder").text("name", "Waypoints").text("open", "1");
            open.write_to(&mut writer)?;

            for (kind, records) in waypoints.categories() {
                let mut folder = Fragment::default();
                folder
                    .start("Folder")
                    .text("name", kind.label())
                    .extended_data(&[(keys::CATEGORY, kind.style().to_string())]);
                folder.write_to(&mut writer)?;

                for waypoint in records {
                    match self.waypoint(waypoint) {
                        Ok(fragment) => {
                            fragment.write_to(&mut writer)?;
                            summary
                                .outcomes
                                .push(RecordOutcome::Converted(waypoint.name.clone()));
                        }
                        Err(reason) => {
                            warn!("Skipping waypoint {}: {}", waypoint.code, reason);
                            summary.outcomes.push(RecordOutcome::Skipped {
                                record: waypoint.code.clone(),
                                reason,
                            });
                        }
                    }
                }

                close_folder(&mut writer)?;
            }

            close_folder(&mut writer)?;
        }

        let mut footer = Fragment::default();
        footer.end("Document").end("kml");
        footer.write_to(&mut writer)?;
        writer.into_inner().flush()?;

        Ok(summary)
    }

    fn styles(&self, f: &mut Fragment, airspaces: &Airspaces, waypoints: &Waypoints) {
        for (category, _) in airspaces.categories() {
            f.start_with("Style", ("id", style::airspace_style_id(*category)))
                .start("LineStyle")
                .text("color", &style::airspace_line_color(*category))
                .text("width", "1.5")
                .end("LineStyle")
                .start("PolyStyle")
                .text("color", &style::airspace_poly_color(*category))
                .end("PolyStyle")
                .end("Style");
        }

        for (kind, _) in waypoints.categories() {
            let href = format!("{}{}", self.icons_base, style::waypoint_icon(*kind));
            f.start_with("Style", ("id", style::waypoint_style_id(*kind)))
                .start("IconStyle")
                .text("color", style::waypoint_icon_color(*kind))
                .text("scale", "1.0")
                .start("Icon")
                .text("href", &href)
                .end("Icon")
                .end("IconStyle")
                .end("Style");
        }
    }

    fn airspace(&self, airspace: &Airspace) -> std::result::Result<(Fragment, bool), String> {
        let solid = Solid::from_airspace(airspace, &self.sampler, self.terrain);

        if solid.samples().len() < 4 {
            return Err("boundary has fewer than three vertices".to_string());
        }
        if solid.samples().iter().any(|s| {
            !(s.position.lat().is_finite()
                && s.position.lon().is_finite()
                && s.floor.is_finite()
                && s.ceiling.is_finite())
        }) {
            return Err("boundary or limits are not finite".to_string());
        }
        if !solid.agl_covered() {
            warn!(
                "AGL limit of {} not resolved everywhere, using nearest known terrain",
                airspace.name
            );
        }
        if solid.is_degenerate() {
            warn!(
                "Airspace {} has its ceiling at or below its floor, side walls omitted",
                airspace.name
            );
        }

        let mut f = Fragment::default();
        f.start("Placemark")
            .text("name", &airspace.title())
            .text(
                "styleUrl",
                &format!("#{}", style::airspace_style_id(airspace.category)),
            )
            .text("description", &airspace.description())
            .extended_data(&[
                (keys::NAME, airspace.name.clone()),
                (keys::CATEGORY, airspace.category.code().to_string()),
                (keys::TOP, airspace.ceiling.encode()),
                (keys::BASE, airspace.floor.encode()),
            ]);

        if solid.is_extruded() {
            f.polygon(solid.ceiling_ring(), true);
        } else {
            f.start("MultiGeometry")
                .polygon(solid.floor_ring(), false)
                .polygon(solid.ceiling_ring(), false);
            if !solid.is_degenerate() {
                for wall in solid.walls() {
                    f.polygon(wall.0.iter().copied(), false);
                }
            }
            f.end("MultiGeometry");
        }
        f.end("Placemark");

        Ok((f, solid.agl_covered()))
    }

    fn waypoint(&self, waypoint: &Waypoint) -> std::result::Result<Fragment, String> {
        if waypoint.name.trim().is_empty() {
            return Err("waypoint has no name".to_string());
        }
        let p = waypoint.position;
        if !(p.lat().is_finite() && p.lon().is_finite() && waypoint.elevation.is_finite()) {
            return Err("position is not finite".to_string());
        }

        let mut data = vec![
            (keys::CODE, waypoint.code.clone()),
            (keys::COUNTRY, waypoint.country.clone()),
            (keys::STYLE, waypoint.kind.style().to_string()),
        ];
        if let Some(ref a) = waypoint.airfield {
            if let Some(dir) = a.runway_dir {
                data.push((keys::RUNWAY_DIR, dir.to_string()));
            }
            if let Some(len) = a.runway_length {
                data.push((keys::RUNWAY_LENGTH, len.to_string()));
            }
            if let Some(freq) = a.frequency {
                data.push((keys::FREQUENCY, format!("{:.3}", freq)));
            }
            if let Some(freq) = a.secondary_frequency {
                data.push((keys::SECONDARY_FREQUENCY, format!("{:.3}", freq)));
            }
        }
        if let Some(freq) = waypoint.other_frequency {
            data.push((keys::OTHER_FREQUENCY, format!("{:.3}", freq)));
        }
        data.push((keys::DESCRIPTION, waypoint.description.clone()));

        let mut f = Fragment::default();
        f.start("Placemark")
            .text("name", &waypoint.name)
            .text(
                "styleUrl",
                &format!("#{}", style::waypoint_style_id(waypoint.kind)),
            )
            .text("description", &waypoint.summary())
            .extended_data(&data)
            .start("Point")
            .text("altitudeMode", "absolute")
            .text("coordinates", &p.to_kml(waypoint.elevation))
            .end("Point")
            .end("Placemark");

        Ok(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airspace::{AirspaceBuilder, AirspaceCategory, Primitive};
    use crate::altitude::{NoTerrain, VerticalLimit};
    use crate::latlon::LatLon;
    use crate::waypoint::{WaypointBuilder, WaypointType};

    fn render(airspaces: &Airspaces, waypoints: &Waypoints) -> (String, WriteSummary) {
        let writer = KmlWriter::new(&NoTerrain);
        let mut out = Vec::new();
        let summary = writer
            .write_document(&mut out, "test", airspaces, waypoints)
            .unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    fn square(floor: VerticalLimit, ceiling: VerticalLimit) -> Airspace {
        AirspaceBuilder::default()
            .category(AirspaceCategory::ClassD)
            .name("ALPHA")
            .floor(floor)
            .ceiling(ceiling)
            .primitive(Primitive::Point(LatLon::new(45.0, 7.0)))
            .primitive(Primitive::Point(LatLon::new(45.0, 7.1)))
            .primitive(Primitive::Point(LatLon::new(45.1, 7.1)))
            .primitive(Primitive::Point(LatLon::new(45.1, 7.0)))
            .build()
            .unwrap()
    }

    #[test]
    fn nothing_to_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.kml");
        let result = KmlWriter::new(&NoTerrain).write(&path, &Airspaces::new(), &Waypoints::new());
        assert!(matches!(result, Err(Error::NothingToWrite)));
        assert!(!path.exists());
    }

    #[test]
    fn grounded_airspace_is_one_extruded_polygon() {
        let mut airspaces = Airspaces::new();
        airspaces.push_airspace(square(VerticalLimit::Gnd, VerticalLimit::ft_amsl(2000.0)));
        let (kml, summary) = render(&airspaces, &Waypoints::new());

        assert_eq!(summary.written(), 1);
        assert!(summary.all_agl_altitudes_covered());
        assert!(kml.contains("<extrude>1</extrude>"));
        assert!(!kml.contains("<MultiGeometry>"));
        assert_eq!(kml.matches("<Polygon>").count(), 1);
        assert!(kml.contains("7.000000,45.000000,609.6"));
        assert!(kml.contains("<styleUrl>#Airspace_D</styleUrl>"));
    }

    #[test]
    fn elevated_airspace_has_floor_ceiling_and_walls() {
        let mut airspaces = Airspaces::new();
        airspaces.push_airspace(square(
            VerticalLimit::ft_amsl(1000.0),
            VerticalLimit::FlightLevel(65),
        ));
        let (kml, _) = render(&airspaces, &Waypoints::new());

        assert!(kml.contains("<MultiGeometry>"));
        assert_eq!(kml.matches("<Folder>").count(), 2);
        assert_eq!(kml.matches("</Folder>").count(), 2);
        // floor, ceiling and one wall per edge of the closed ring
        assert_eq!(kml.matches("<Polygon>").count(), 2 + 4);
        assert!(!kml.contains("<extrude>1</extrude>"));
        assert!(kml.contains("<value>FL65</value>"));
    }

    #[test]
    fn inverted_limits_omit_walls() {
        let mut airspaces = Airspaces::new();
        airspaces.push_airspace(square(
            VerticalLimit::ft_amsl(5000.0),
            VerticalLimit::ft_amsl(3000.0),
        ));
        let (kml, summary) = render(&airspaces, &Waypoints::new());

        assert_eq!(summary.written(), 1);
        assert_eq!(kml.matches("<Polygon>").count(), 2);
    }

    #[test]
    fn names_are_escaped() {
        let mut waypoints = Waypoints::new();
        waypoints.push_waypoint(
            WaypointBuilder::default()
                .name("Fish & <Chips>")
                .code("FISH")
                .position(LatLon::new(46.0, 8.0))
                .elevation(420.0)
                .kind(WaypointType::Normal)
                .build()
                .unwrap(),
        );
        let (kml, summary) = render(&Airspaces::new(), &waypoints);

        assert_eq!(summary.written(), 1);
        assert!(kml.contains("<name>Fish &amp; &lt;Chips&gt;</name>"));
        assert!(kml.contains("8.000000,46.000000,420.0"));
        assert!(kml.contains("<Style id=\"Waypoint_1\">"));
        assert!(!kml.contains("Airspace_"));
    }

    #[test]
    fn kmz_is_an_archive_with_one_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.kmz");
        let mut airspaces = Airspaces::new();
        airspaces.push_airspace(square(VerticalLimit::Gnd, VerticalLimit::ft_amsl(2000.0)));
        KmlWriter::new(&NoTerrain)
            .write(&path, &airspaces, &Waypoints::new())
            .unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.by_index(0).unwrap().name(), crate::zip_util::KMZ_DOCUMENT);
    }
}

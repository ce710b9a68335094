//! SeeYou `.cup` waypoint files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{error, info, warn};

use crate::altitude::FEET_TO_METERS;
use crate::collections::Waypoints;
use crate::error::{Error, Result};
use crate::latlon::LatLon;
use crate::txt_data::{quote, DataFile, Record};
use crate::waypoint::{
    is_airband_frequency, is_ndb_frequency, is_vor_frequency, Airfield, Waypoint,
    WaypointBuilder, WaypointType,
};

pub const HEADER: &str = "name, code, country, lat, lon, elev, style, rwydir, rwylen, freq, desc";
const HEADER_COMPACT: &str = "name,code,country,lat,lon,elev,style,rwdir,rwlen,freq,desc";
const TASKS_MARKER: &str = "-----Related Tasks-----";
const FIELDS: usize = 11;

const NM_TO_METERS: f64 = 1852.0;
const MI_TO_METERS: f64 = 1609.344;

/// Reads waypoints from a `.cup` file, returns how many were added.
///
/// Malformed lines are logged and skipped.
pub fn read<P: AsRef<Path>>(path: P, waypoints: &mut Waypoints) -> Result<usize> {
    let path = path.as_ref();
    info!("Reading CUP file: {}", path.display());
    let file = DataFile::from_file(path)?;
    Ok(read_data(&file, waypoints))
}

pub fn read_data(file: &DataFile, waypoints: &mut Waypoints) -> usize {
    let mut crlf_warned = false;
    let mut first_found = false;
    let mut count = 0;

    for line in file.lines() {
        let n = line.number;
        if line.text.is_empty() {
            continue;
        }
        if !crlf_warned && !line.crlf {
            warn!("Line {}: not terminated by CR LF", n);
            crlf_warned = true;
        }
        if !first_found && (line.text.contains(HEADER) || line.text.contains(HEADER_COMPACT)) {
            continue;
        }

        let text = line.text.trim();
        if text.is_empty() || text.starts_with('*') {
            continue;
        }
        if text.len() <= 10 {
            error!("Line {} is too short to contain anything useful: {}", n, text);
            continue;
        }
        if text == TASKS_MARKER {
            break;
        }

        let record = match Record::tokenize(text) {
            Ok(record) if record.len() == FIELDS => record,
            Ok(_) => {
                error!("Line {}: expected {} fields: {}", n, FIELDS, text);
                continue;
            }
            Err(e) => {
                error!("Line {}: {}: {}", n, e, text);
                continue;
            }
        };

        match parse_record(n, &record) {
            Ok(waypoint) => {
                waypoints.push_waypoint(waypoint);
                first_found = true;
                count += 1;
            }
            Err(reason) => error!("Line {}: {}", n, reason),
        }
    }

    count
}

fn parse_record(n: usize, r: &Record) -> std::result::Result<Waypoint, String> {
    let name = &r[0];
    if name.trim().is_empty() {
        return Err("a name must be present".to_string());
    }
    let position = LatLon::from_cup(&r[3], &r[4])
        .ok_or_else(|| format!("invalid coordinates: {} {}", &r[3], &r[4]))?;

    let elevation = parse_elevation(&r[5]).unwrap_or_else(|| {
        warn!("Line {}: invalid elevation: {}, assuming 0 AMSL", n, &r[5]);
        0.0
    });
    let kind = parse_style(&r[6]).unwrap_or_else(|| {
        warn!("Line {}: invalid waypoint style: {}, assuming unknown", n, &r[6]);
        WaypointType::Unknown
    });

    let mut builder = WaypointBuilder::default();
    builder
        .name(name.trim())
        .code(r[1].trim())
        .country(r[2].trim())
        .position(position)
        .elevation(elevation)
        .kind(kind)
        .description(r[10].trim());

    if kind.is_airfield() {
        let runway_dir = parse_runway_dir(&r[7]).unwrap_or_else(|| {
            warn!("Line {}: invalid runway direction: {}", n, &r[7]);
            None
        });
        let runway_length = parse_runway_length(&r[8]).unwrap_or_else(|| {
            warn!("Line {}: invalid runway length: {}", n, &r[8]);
            None
        });
        let (frequency, secondary_frequency) = airfield_frequencies(n, &r[9]);
        builder.airfield(Airfield {
            runway_dir,
            runway_length,
            frequency,
            secondary_frequency,
        });
    } else if let Some(freq) = other_frequency(n, &r[9], kind) {
        builder.other_frequency(freq);
    }

    builder.build().map_err(|e| e.to_string())
}

fn parse_elevation(text: &str) -> Option<f64> {
    let text = text.trim().to_ascii_lowercase();
    if text == "0" {
        return Some(0.0);
    }
    let (value, feet) = if let Some(v) = text.strip_suffix("ft").or_else(|| text.strip_suffix('f')) {
        (v, true)
    } else if let Some(v) = text.strip_suffix('m') {
        (v, false)
    } else {
        return None;
    };
    let value: f64 = value.trim().parse().ok()?;
    Some(if feet { value * FEET_TO_METERS } else { value })
}

fn parse_style(text: &str) -> Option<WaypointType> {
    text.trim().parse().ok().and_then(WaypointType::from_style)
}

/// Outer `None` for invalid text, inner `None` for an unknown direction.
fn parse_runway_dir(text: &str) -> Option<Option<u16>> {
    let text = text.trim();
    if text.is_empty() {
        return Some(None);
    }
    match text.parse::<u16>().ok()? {
        0 => Some(Some(360)),
        dir @ 1..=360 => Some(Some(dir)),
        _ => None,
    }
}

fn parse_runway_length(text: &str) -> Option<Option<u32>> {
    let text = text.trim().to_ascii_lowercase();
    if text.is_empty() {
        return Some(None);
    }
    if text.len() < 3 {
        return None;
    }
    let (value, factor) = if let Some(v) = text.strip_suffix("nm") {
        (v, NM_TO_METERS)
    } else if let Some(v) = text.strip_suffix("ml").or_else(|| text.strip_suffix("mi")) {
        (v, MI_TO_METERS)
    } else if let Some(v) = text.strip_suffix('m') {
        (v, 1.0)
    } else {
        return None;
    };
    let value: f64 = value.trim().parse().ok()?;
    if value < 0.0 {
        return None;
    }
    let metres = (value * factor).round() as u32;
    Some(if metres > 0 { Some(metres) } else { None })
}

fn airfield_frequencies(n: usize, text: &str) -> (Option<f32>, Option<f32>) {
    let text = text.trim();
    if text.is_empty() {
        return (None, None);
    }
    let (main, secondary) = match text.split_once('-') {
        Some((main, secondary)) => (main, Some(secondary)),
        None => (text, None),
    };

    let main = match main.trim().parse::<f32>() {
        Ok(f) if is_airband_frequency(f) => f,
        _ => {
            warn!("Line {}: invalid radio frequency for airfield: {}", n, text);
            return (None, None);
        }
    };
    let secondary = secondary.and_then(|s| match s.trim().parse::<f32>() {
        Ok(f) if is_airband_frequency(f) => Some(f),
        _ => {
            warn!("Line {}: invalid secondary frequency for airfield: {}", n, text);
            None
        }
    });
    (Some(main), secondary)
}

fn other_frequency(n: usize, text: &str, kind: WaypointType) -> Option<f32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let valid = match (kind, text.parse::<f32>()) {
        (WaypointType::Vor, Ok(f)) if is_vor_frequency(f) => Some(f),
        (WaypointType::Ndb, Ok(f)) if is_ndb_frequency(f) => Some(f),
        _ => None,
    };
    if valid.is_none() {
        warn!("Line {}: invalid frequency for {}: {}", n, kind, text);
    }
    valid
}

pub fn write<P: AsRef<Path>>(path: P, waypoints: &Waypoints) -> Result<usize> {
    let path = path.as_ref();
    if waypoints.is_empty() {
        warn!("SeeYou output: no waypoints, nothing to write");
        return Err(Error::NothingToWrite);
    }
    info!("Writing output file: {}", path.display());
    let mut out = BufWriter::new(File::create(path)?);
    let count = write_to(&mut out, waypoints)?;
    out.flush()?;
    Ok(count)
}

pub fn write_to<W: Write>(out: &mut W, waypoints: &Waypoints) -> Result<usize> {
    write!(out, "{}\r\n\r\n", HEADER)?;
    write!(out, "* Waypoints written by {} {}\r\n", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
    write!(out, "* Not for navigation, verify against official sources\r\n\r\n")?;

    let mut count = 0;
    for w in waypoints.values() {
        if w.name.trim().is_empty() {
            warn!("Skipping waypoint with empty name: {}", w.code);
            continue;
        }
        write!(out, "{}\r\n", format_record(w))?;
        count += 1;
    }
    Ok(count)
}

fn format_record(w: &Waypoint) -> String {
    let mut line = format!("{},", quote(&w.name));
    if !w.code.is_empty() {
        line += &quote(&w.code);
    }
    let (lat, lon) = w.position.to_cup();
    line += &format!(",{},{},{},", w.country, lat, lon);

    let elevation = (w.elevation * 10.0).round() / 10.0;
    if elevation != 0.0 {
        line += &format!("{:.1}m,", elevation);
    } else {
        line += "0,";
    }
    line += &format!("{},", w.kind.style());

    match w.airfield {
        Some(ref a) => {
            if let Some(dir) = a.runway_dir {
                line += &format!("{:03}", dir);
            }
            line += ",";
            if let Some(len) = a.runway_length {
                line += &format!("{}m", len);
            }
            line += ",";
            if let Some(freq) = a.frequency {
                line += &format!("{:.3}", freq);
                if let Some(second) = a.secondary_frequency {
                    line += &format!("-{:.3}", second);
                }
            }
        }
        None => {
            line += ",,";
            if let Some(freq) = w.other_frequency {
                line += &match w.kind {
                    WaypointType::Ndb => format!("{:.1}", freq),
                    WaypointType::Vor => format!("{:.2}", freq),
                    _ => format!("{:.3}", freq),
                };
            }
        }
    }
    line += ",";

    if !w.description.is_empty() {
        line += &quote(&w.description);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_text(text: &str) -> (Waypoints, usize) {
        let mut waypoints = Waypoints::new();
        let count = read_data(&DataFile::from(text.to_string()), &mut waypoints);
        (waypoints, count)
    }

    #[test]
    fn reads_airfield_and_vor() {
        let text = concat!(
            "name,code,country,lat,lon,elev,style,rwdir,rwlen,freq,desc\r\n",
            "* comment\r\n",
            "\r\n",
            "\"Lesce\",\"LJBL\",SI,4621.500N,01410.700E,504.0m,5,130,1140m,123.500-118.000,\"Nice, field\"\r\n",
            "\"Ljubljana VOR\",LJU,SI,4613.000N,01427.000E,1200ft,9,,,113.80,\r\n",
            "-----Related Tasks-----\r\n",
            "\"Task\",\"Lesce\",\"Lesce\"\r\n",
        );
        let (waypoints, count) = read_text(text);
        assert_eq!(count, 2);

        let field = &waypoints.get(&WaypointType::AirfieldSolid)[0];
        assert_eq!(field.code, "LJBL");
        assert_eq!(field.description, "Nice, field");
        assert!((field.position.lat() - 46.358333).abs() < 1e-5);
        let a = field.airfield.unwrap();
        assert_eq!(a.runway_dir, Some(130));
        assert_eq!(a.runway_length, Some(1140));
        assert_eq!(a.frequency, Some(123.5));
        assert_eq!(a.secondary_frequency, Some(118.0));

        let vor = &waypoints.get(&WaypointType::Vor)[0];
        assert!((vor.elevation - 365.76).abs() < 1e-6);
        assert_eq!(vor.other_frequency, Some(113.8));
        assert!(vor.airfield.is_none());
    }

    #[test]
    fn out_of_range_style_is_unknown() {
        let (waypoints, count) =
            read_text("\"Somewhere\",,,4500.000N,00700.000E,0,42,,,,\r\n");
        assert_eq!(count, 1);
        assert_eq!(waypoints.get(&WaypointType::Unknown).len(), 1);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = concat!(
            "short,line\r\n",
            ",,,4500.000N,00700.000E,0,1,,,,\r\n",
            "\"Bad lat\",,,45XX.000N,00700.000E,0,1,,,,\r\n",
            "\"Too few\",,,4500.000N,00700.000E,0,1,,\r\n",
            "\"Good\",,,4500.000N,00700.000E,0,1,,,,\r\n",
        );
        let (waypoints, count) = read_text(text);
        assert_eq!(count, 1);
        assert_eq!(waypoints.values().next().unwrap().name, "Good");
    }

    #[test]
    fn field_parsers() {
        assert_eq!(parse_elevation("0"), Some(0.0));
        assert_eq!(parse_elevation("12.5m"), Some(12.5));
        assert!((parse_elevation("1000ft").unwrap() - 304.8).abs() < 1e-9);
        assert_eq!(parse_elevation("1000"), None);

        assert_eq!(parse_runway_dir(""), Some(None));
        assert_eq!(parse_runway_dir("0"), Some(Some(360)));
        assert_eq!(parse_runway_dir("361"), None);

        assert_eq!(parse_runway_length("800m"), Some(Some(800)));
        assert_eq!(parse_runway_length("1nm"), Some(Some(1852)));
        assert_eq!(parse_runway_length("1mi"), Some(Some(1609)));
        assert_eq!(parse_runway_length("9m"), None);
        assert_eq!(parse_runway_length("800yd"), None);

        assert_eq!(airfield_frequencies(1, "150.000"), (None, None));
        assert_eq!(airfield_frequencies(1, "122.500-99.0"), (Some(122.5), None));
        assert_eq!(other_frequency(1, "350", WaypointType::Ndb), Some(350.0));
        assert_eq!(other_frequency(1, "350", WaypointType::Vor), None);
    }

    #[test]
    fn empty_collection_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.cup");
        assert!(matches!(write(&path, &Waypoints::new()), Err(Error::NothingToWrite)));
        assert!(!path.exists());
    }

    #[test]
    fn written_lines_read_back() {
        let text = "\"Lesce\",\"LJBL\",SI,4621.500N,01410.700E,504.0m,5,130,1140m,123.500-118.000,\"Nice, field\"\r\n";
        let (waypoints, _) = read_text(text);

        let mut out = Vec::new();
        assert_eq!(write_to(&mut out, &waypoints).unwrap(), 1);
        let written = String::from_utf8(out).unwrap();
        assert!(written.starts_with(HEADER));
        assert!(written.contains(text));

        let (again, _) = read_text(&written);
        assert_eq!(again.values().collect::<Vec<_>>(), waypoints.values().collect::<Vec<_>>());
    }
}

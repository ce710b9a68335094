#![deny(clippy::all)]
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::{Path, PathBuf};

use log::{info, warn};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use airspace_converter::{
    cup, error, Airspaces, BoundarySampler, ElevationSource, ExtentRule, FlatTerrain, KmlReader,
    KmlWriter, NoTerrain, Waypoints,
};

#[derive(StructOpt)]
#[structopt(about = "Converts airspaces and waypoints between KML, KMZ and CUP files")]
struct Args {
    /// Input files (.kml, .kmz or .cup)
    #[structopt(name = "input", parse(from_os_str), required = true)]
    inputs: Vec<PathBuf>,
    /// Output file (.kml, .kmz or .cup)
    #[structopt(
        short = "o",
        long = "output",
        parse(from_os_str),
        default_value = "./output.kmz"
    )]
    output: PathBuf,
    /// Read KML line strings as airspace boundaries rather than tracks
    #[structopt(
        long = "line-strings-as-airspaces",
        default_value = "true",
        parse(try_from_str)
    )]
    line_strings_as_airspaces: bool,
    /// Sampling step for arcs and circles, in degrees
    #[structopt(long = "arc-step", default_value = "3")]
    arc_step: f64,
    /// Derive missing limits from the mean altitude of each polygon face
    #[structopt(long = "face-mean")]
    face_mean: bool,
    /// Assume flat terrain at this elevation (m AMSL) for AGL limits
    #[structopt(long = "ground-elevation")]
    ground_elevation: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Format {
    Kml,
    Cup,
}

fn format_of(path: &Path) -> error::Result<Format> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("kml") | Some("kmz") => Ok(Format::Kml),
        Some("cup") => Ok(Format::Cup),
        _ => Err(error::Error::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::from_args();
    let output_format = format_of(&args.output)?;

    let reader = KmlReader::new()
        .line_strings_as_airspaces(args.line_strings_as_airspaces)
        .extent_rule(if args.face_mean {
            ExtentRule::FaceMean
        } else {
            ExtentRule::MinMax
        });

    let mut airspaces = Airspaces::new();
    let mut waypoints = Waypoints::new();
    for input in &args.inputs {
        match format_of(input)? {
            Format::Kml => {
                reader.read(input, &mut airspaces, &mut waypoints)?;
            }
            Format::Cup => {
                cup::read(input, &mut waypoints)?;
            }
        }
    }
    info!(
        "Loaded {} airspaces and {} waypoints",
        airspaces.len(),
        waypoints.len()
    );

    match output_format {
        Format::Kml => {
            let terrain: Box<dyn ElevationSource> = match args.ground_elevation {
                Some(elevation) => Box::new(FlatTerrain(elevation)),
                None => Box::new(NoTerrain),
            };
            let summary = KmlWriter::new(terrain.as_ref())
                .sampler(BoundarySampler::new(args.arc_step))
                .write(&args.output, &airspaces, &waypoints)?;
            info!(
                "Wrote {} records, skipped {}",
                summary.written(),
                summary.skipped()
            );
            if !summary.all_agl_altitudes_covered() {
                warn!("Not all AGL altitudes could be resolved with terrain data, nearest known or 0 m assumed");
            }
        }
        Format::Cup => {
            if !airspaces.is_empty() {
                warn!(
                    "CUP files hold waypoints only, {} airspaces not written",
                    airspaces.len()
                );
            }
            let written = cup::write(&args.output, &waypoints)?;
            info!("Wrote {} waypoints", written);
        }
    }

    Ok(())
}

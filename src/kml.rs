//! KML and KMZ documents.

use std::path::Path;

pub mod read;
pub mod style;
pub mod write;

pub use read::{ExtentRule, KmlReader, ReadSummary};
pub use write::{KmlWriter, WriteSummary};

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

pub(crate) mod keys {
    pub const CATEGORY: &str = "category";
    pub const NAME: &str = "name";
    pub const TOP: &str = "top";
    pub const BASE: &str = "base";
    pub const CODE: &str = "code";
    pub const COUNTRY: &str = "country";
    pub const STYLE: &str = "style";
    pub const RUNWAY_DIR: &str = "rwdir";
    pub const RUNWAY_LENGTH: &str = "rwlen";
    pub const FREQUENCY: &str = "freq";
    pub const SECONDARY_FREQUENCY: &str = "freq2";
    pub const OTHER_FREQUENCY: &str = "otherfreq";
    pub const DESCRIPTION: &str = "description";
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecordOutcome {
    Converted(String),
    Skipped { record: String, reason: String },
}

impl RecordOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RecordOutcome::Skipped { .. })
    }
}

pub(crate) fn is_kmz(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("kmz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kmz_by_extension() {
        assert!(is_kmz(Path::new("out/airspace.KMZ")));
        assert!(!is_kmz(Path::new("out/airspace.kml")));
        assert!(!is_kmz(Path::new("kmz")));
    }
}

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct LatLon(f64, f64);

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        LatLon(lat, lon)
    }

    pub fn lat(self) -> f64 {
        self.0
    }

    pub fn lon(self) -> f64 {
        self.1
    }

    pub fn approx_eq(self, other: LatLon, tolerance: f64) -> bool {
        (self.0 - other.0).abs() <= tolerance && (self.1 - other.1).abs() <= tolerance
    }

    pub fn from_kml(tuple: &str) -> Option<(Self, f64)> {
        let mut parts = tuple.split(',').map(str::trim);
        // Its backwards in KML too
        let lon: f64 = parts.next()?.parse().ok()?;
        let lat: f64 = parts.next()?.parse().ok()?;
        let alt = match parts.next() {
            Some(a) if !a.is_empty() => a.parse().ok()?,
            _ => 0.0,
        };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some((LatLon(lat, lon), alt))
    }

    pub fn to_kml(self, alt: f64) -> String {
        format!("{:.6},{:.6},{:.1}", self.1, self.0, alt)
    }

    // Ex: 5107.830N 00145.500W
    pub fn from_cup(lat: &str, lon: &str) -> Option<Self> {
        lazy_static! {
            static ref CUP_LAT_REGEX: Regex =
                Regex::new(r"^(\d{2})(\d{2}(?:\.\d*)?)([NnSs])$").unwrap();
            static ref CUP_LON_REGEX: Regex =
                Regex::new(r"^(\d{3})(\d{2}(?:\.\d*)?)([EeWw])$").unwrap();
        }

        fn to_dd(re: &Regex, text: &str, negative: char) -> Option<f64> {
            let cap = re.captures(text.trim())?;
            let (d, m) = (cap[1].parse::<f64>().ok()?, cap[2].parse::<f64>().ok()?);
            let dd = d + m / 60.0;
            if cap[3].eq_ignore_ascii_case(&negative.to_string()) {
                Some(-dd)
            } else {
                Some(dd)
            }
        }

        let lat = to_dd(&CUP_LAT_REGEX, lat, 'S')?;
        let lon = to_dd(&CUP_LON_REGEX, lon, 'W')?;
        if lat.abs() > 90.0 || lon.abs() > 180.0 {
            return None;
        }
        Some(LatLon(lat, lon))
    }

    pub fn to_cup(self) -> (String, String) {
        fn to_dm(dd: f64) -> (u32, f64) {
            let abs = dd.abs();
            let mut d = abs.trunc() as u32;
            let mut m = ((abs - abs.trunc()) * 60.0 * 1000.0).round() / 1000.0;
            if m >= 60.0 {
                d += 1;
                m -= 60.0;
            }
            (d, m)
        }

        let (d, m) = to_dm(self.0);
        let lat = format!(
            "{:02}{:06.3}{}",
            d,
            m,
            if self.0.is_sign_negative() { 'S' } else { 'N' }
        );
        let (d, m) = to_dm(self.1);
        let lon = format!(
            "{:03}{:06.3}{}",
            d,
            m,
            if self.1.is_sign_negative() { 'W' } else { 'E' }
        );
        (lat, lon)
    }

    pub fn to_dms(self) -> String {
        fn dms(dd: f64) -> (u32, u32, f64) {
            let abs = dd.abs();
            let d = abs.trunc() as u32;
            let m = (abs * 60.0).trunc() as u32 % 60;
            let s = (abs * 3600.0) % 60.0;
            (d, m, s)
        }

        let mut tmp = String::new();
        tmp += if self.0.is_sign_negative() { "S " } else { "N " };
        let (d, m, s) = dms(self.0);
        tmp += &format!("{:02}°{:02}'{:05.2}\"", d, m, s);

        tmp += " ";

        tmp += if self.1.is_sign_negative() { "W " } else { "E " };
        let (d, m, s) = dms(self.1);
        tmp += &format!("{:03}°{:02}'{:05.2}\"", d, m, s);
        tmp
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.0, self.1)
    }
}

// geo uses (x, y) = (longitude, latitude)
impl From<LatLon> for geo::Point<f64> {
    fn from(p: LatLon) -> Self {
        geo::Point::new(p.1, p.0)
    }
}

impl From<geo::Point<f64>> for LatLon {
    fn from(p: geo::Point<f64>) -> Self {
        LatLon(p.y(), p.x())
    }
}

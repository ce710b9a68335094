use geo::{Bearing, Destination, Geodesic, Point};

use crate::airspace::Primitive;
use crate::latlon::LatLon;

pub const DEFAULT_STEP_DEG: f64 = 3.0;

const SAME_POINT_DEG: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundarySampler {
    step_deg: f64,
}

impl Default for BoundarySampler {
    fn default() -> Self {
        BoundarySampler {
            step_deg: DEFAULT_STEP_DEG,
        }
    }
}

impl BoundarySampler {
    pub fn new(step_deg: f64) -> Self {
        let step_deg = if step_deg.is_finite() {
            step_deg.clamp(0.1, 90.0)
        } else {
            DEFAULT_STEP_DEG
        };
        BoundarySampler { step_deg }
    }

    pub fn step_deg(&self) -> f64 {
        self.step_deg
    }

    pub fn circle_samples(&self) -> usize {
        (360.0 / self.step_deg - 1e-9).ceil() as usize
    }

    pub fn sample(&self, boundary: &[Primitive]) -> Vec<LatLon> {
        let mut ring = Vec::new();

        for primitive in boundary {
            match *primitive {
                Primitive::Point(p) => ring.push(p),
                Primitive::Arc {
                    center,
                    radius,
                    start,
                    end,
                    clockwise,
                } => self.sample_arc(&mut ring, center, radius, start, end, clockwise),
                Primitive::Circle { center, radius } => {
                    self.sample_circle(&mut ring, center, radius)
                }
            }
        }

        if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
            if !first.approx_eq(last, SAME_POINT_DEG) {
                ring.push(first);
            }
        }

        ring
    }

    fn sample_arc(
        &self,
        ring: &mut Vec<LatLon>,
        center: LatLon,
        radius: f64,
        start: LatLon,
        end: LatLon,
        clockwise: bool,
    ) {
        let origin: Point<f64> = center.into();
        let start_bearing = normalize(Geodesic.bearing(origin, start.into()));
        let end_bearing = normalize(Geodesic.bearing(origin, end.into()));
        let sweep = arc_sweep(start_bearing, end_bearing, clockwise);
        let direction = sweep.signum();

        push_distinct(ring, start);
        // no intermediate sample right on top of the end point
        let last = sweep.abs() - self.step_deg * 1e-3;
        let mut walked = self.step_deg;
        while walked < last {
            let bearing = normalize(start_bearing + direction * walked);
            push_distinct(ring, Geodesic.destination(origin, bearing, radius).into());
            walked += self.step_deg;
        }
        push_distinct(ring, end);
    }

    fn sample_circle(&self, ring: &mut Vec<LatLon>, center: LatLon, radius: f64) {
        let origin: Point<f64> = center.into();
        let samples = self.circle_samples();
        let first_index = ring.len();

        for i in 0..samples {
            let bearing = i as f64 * self.step_deg;
            push_distinct(ring, Geodesic.destination(origin, bearing, radius).into());
        }

        // Close the circle
        if let Some(&first) = ring.get(first_index) {
            ring.push(first);
        }
    }
}

fn push_distinct(ring: &mut Vec<LatLon>, p: LatLon) {
    match ring.last() {
        Some(&last) if last.approx_eq(p, SAME_POINT_DEG) => (),
        _ => ring.push(p),
    }
}

fn normalize(bearing: f64) -> f64 {
    bearing.rem_euclid(360.0)
}

/// Signed sweep in degrees from `start` to `end`, positive clockwise.
/// Equal bearings mean a full turn.
fn arc_sweep(start: f64, end: f64, clockwise: bool) -> f64 {
    let mut diff = end - start;

    if clockwise {
        if diff <= 0.0 {
            diff += 360.0;
        }
    } else if diff >= 0.0 {
        diff -= 360.0;
    }

    diff
}

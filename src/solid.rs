use itertools::Itertools;

use crate::airspace::Airspace;
use crate::altitude::{resolve_amsl, ElevationSource};
use crate::latlon::LatLon;
use crate::sampler::BoundarySampler;

pub type Corner = (LatLon, f64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolidSample {
    pub position: LatLon,
    pub floor: f64,
    pub ceiling: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallPanel(pub [Corner; 5]);

#[derive(Clone, Debug, PartialEq)]
pub struct Solid {
    samples: Vec<SolidSample>,
    extrude_to_ground: bool,
    degenerate: bool,
    agl_covered: bool,
}

impl Solid {
    pub fn build(ring: &[LatLon], floors: &[f64], ceilings: &[f64], extrude_to_ground: bool) -> Self {
        debug_assert_eq!(ring.len(), floors.len());
        debug_assert_eq!(ring.len(), ceilings.len());

        let samples: Vec<SolidSample> = ring
            .iter()
            .zip(floors)
            .zip(ceilings)
            .map(|((&position, &floor), &ceiling)| SolidSample {
                position,
                floor,
                ceiling,
            })
            .collect();
        let degenerate = samples.len() < 4 || samples.iter().any(|s| s.ceiling <= s.floor);

        Solid {
            samples,
            extrude_to_ground,
            degenerate,
            agl_covered: true,
        }
    }

    pub fn from_airspace(
        airspace: &Airspace,
        sampler: &BoundarySampler,
        terrain: &dyn ElevationSource,
    ) -> Self {
        let ring = sampler.sample(&airspace.boundary);
        let floor = resolve_amsl(&airspace.floor, &ring, terrain);
        let ceiling = resolve_amsl(&airspace.ceiling, &ring, terrain);

        let mut solid = Solid::build(
            &ring,
            &floor.altitudes,
            &ceiling.altitudes,
            airspace.is_grounded(),
        );
        solid.agl_covered = floor.covered && ceiling.covered;
        solid
    }

    pub fn samples(&self) -> &[SolidSample] {
        &self.samples
    }

    pub fn is_extruded(&self) -> bool {
        self.extrude_to_ground
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn agl_covered(&self) -> bool {
        self.agl_covered
    }

    pub fn floor_ring(&self) -> impl Iterator<Item = Corner> + '_ {
        self.samples.iter().map(|s| (s.position, s.floor))
    }

    pub fn ceiling_ring(&self) -> impl Iterator<Item = Corner> + '_ {
        self.samples.iter().map(|s| (s.position, s.ceiling))
    }

    pub fn walls(&self) -> impl Iterator<Item = WallPanel> + '_ {
        self.samples.iter().tuple_windows().map(|(a, b)| {
            WallPanel([
                (a.position, a.floor),
                (b.position, b.floor),
                (b.position, b.ceiling),
                (a.position, a.ceiling),
                (a.position, a.floor),
            ])
        })
    }

    pub fn wall_count(&self) -> usize {
        self.samples.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airspace::{AirspaceBuilder, AirspaceCategory, Primitive};
    use crate::altitude::{FlatTerrain, NoTerrain, VerticalLimit};

    fn square() -> Vec<Primitive> {
        vec![
            Primitive::Point(LatLon::new(45.0, 7.0)),
            Primitive::Point(LatLon::new(45.0, 7.1)),
            Primitive::Point(LatLon::new(45.1, 7.1)),
            Primitive::Point(LatLon::new(45.1, 7.0)),
        ]
    }

    #[test]
    fn grounded_circle() {
        let airspace = AirspaceBuilder::default()
            .category(AirspaceCategory::Ctr)
            .name("CTR TEST")
            .floor(VerticalLimit::Gnd)
            .ceiling("2000ft AMSL".parse::<VerticalLimit>().unwrap())
            .primitive(Primitive::Circle {
                center: LatLon::new(46.0, 8.0),
                radius: 1000.0,
            })
            .build()
            .unwrap();
        let sampler = BoundarySampler::default();
        let solid = Solid::from_airspace(&airspace, &sampler, &NoTerrain);

        assert!(solid.is_extruded());
        assert!(!solid.is_degenerate());
        assert!(solid.agl_covered());
        assert_eq!(solid.wall_count(), sampler.circle_samples());
        assert_eq!(solid.walls().count(), 120);
        for s in solid.samples() {
            assert!((s.ceiling - 609.6).abs() < 1e-6);
        }
    }

    #[test]
    fn walls_connect_consecutive_vertices() {
        let airspace = AirspaceBuilder::default()
            .category(AirspaceCategory::Tma)
            .name("TMA")
            .floor(VerticalLimit::ft_amsl(1500.0))
            .ceiling(VerticalLimit::FlightLevel(65))
            .boundary(square())
            .build()
            .unwrap();
        let solid = Solid::from_airspace(&airspace, &BoundarySampler::default(), &NoTerrain);

        assert!(!solid.is_extruded());
        assert_eq!(solid.samples().len(), 5);
        let walls: Vec<_> = solid.walls().collect();
        assert_eq!(walls.len(), 4);

        // adjacent panels share an edge
        for (a, b) in walls.iter().tuple_windows() {
            assert_eq!(a.0[1], b.0[0]);
            assert_eq!(a.0[2], b.0[3]);
        }
        // and the last one wraps back to the first vertex
        assert_eq!(walls[3].0[1].0, solid.samples()[0].position);
    }

    #[test]
    fn vertex_order_is_kept() {
        let ring: Vec<_> = (0..5)
            .map(|i| LatLon::new(f64::from(i), 0.0))
            .collect();
        let solid = Solid::build(&ring, &[0.0; 5], &[100.0; 5], false);
        let positions: Vec<_> = solid.samples().iter().map(|s| s.position).collect();
        assert_eq!(positions, ring);
    }

    #[test]
    fn ceiling_below_floor_is_degenerate() {
        let airspace = AirspaceBuilder::default()
            .category(AirspaceCategory::Danger)
            .name("ED-D 1")
            .floor(VerticalLimit::ft_agl(1000.0))
            .ceiling(VerticalLimit::ft_amsl(1000.0))
            .boundary(square())
            .build()
            .unwrap();
        let solid = Solid::from_airspace(&airspace, &BoundarySampler::default(), &FlatTerrain(500.0));
        assert!(solid.is_degenerate());
        assert!(solid.agl_covered());
    }

    #[test]
    fn unresolved_agl_is_reported() {
        let airspace = AirspaceBuilder::default()
            .category(AirspaceCategory::Danger)
            .name("ED-D 2")
            .floor(VerticalLimit::ft_agl(500.0))
            .ceiling(VerticalLimit::FlightLevel(100))
            .boundary(square())
            .build()
            .unwrap();
        let solid = Solid::from_airspace(&airspace, &BoundarySampler::default(), &NoTerrain);
        assert!(!solid.agl_covered());
        assert!(!solid.is_degenerate());
    }
}

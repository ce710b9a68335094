use std::collections::BTreeMap;

use crate::airspace::{Airspace, AirspaceCategory};
use crate::waypoint::{Waypoint, WaypointType};

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryMap<K: Ord, V> {
    map: BTreeMap<K, Vec<V>>,
}

pub type Airspaces = CategoryMap<AirspaceCategory, Airspace>;
pub type Waypoints = CategoryMap<WaypointType, Waypoint>;

impl<K: Ord, V> Default for CategoryMap<K, V> {
    fn default() -> Self {
        CategoryMap {
            map: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> CategoryMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: K, record: V) {
        self.map.entry(category).or_default().push(record);
    }

    pub fn len(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.values().all(Vec::is_empty)
    }

    pub fn get(&self, category: &K) -> &[V] {
        self.map.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.map
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k, v.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map
            .iter()
            .flat_map(|(k, records)| records.iter().map(move |r| (k, r)))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.map.values().flatten()
    }
}

impl<K: Ord, V> Extend<(K, V)> for CategoryMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for CategoryMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = CategoryMap::new();
        map.extend(iter);
        map
    }
}

impl Airspaces {
    pub fn push_airspace(&mut self, airspace: Airspace) {
        self.insert(airspace.category, airspace);
    }
}

impl Waypoints {
    pub fn push_waypoint(&mut self, waypoint: Waypoint) {
        self.insert(waypoint.kind, waypoint);
    }
}

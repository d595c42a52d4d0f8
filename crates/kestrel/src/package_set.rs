use kestrel_solve::{Map, SolvableId};

use crate::package::Package;
use crate::sack::Sack;

/// A set of packages of one sack, backed by a dense bitmap over solvable ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSet {
    map: Map,
}

impl PackageSet {
    /// An empty set sized for the sack.
    pub fn new(sack: &Sack) -> Self {
        Self {
            map: Map::new(sack.pool().nsolvables()),
        }
    }

    pub(crate) fn from_map(map: Map) -> Self {
        Self { map }
    }

    pub(crate) fn as_map(&self) -> &Map {
        &self.map
    }

    /// Adds a package.
    pub fn add(&mut self, package: &Package<'_>) {
        self.add_id(package.id());
    }

    /// Adds a solvable by id.
    pub fn add_id(&mut self, id: SolvableId) {
        self.map.grow(id.index() + 1);
        self.map.set(id);
    }

    /// Removes a solvable by id.
    pub fn remove_id(&mut self, id: SolvableId) {
        self.map.clear(id);
    }

    /// Whether the set holds the package.
    pub fn contains(&self, package: &Package<'_>) -> bool {
        self.map.contains(package.id())
    }

    /// Whether the set holds the solvable id.
    pub fn contains_id(&self, id: SolvableId) -> bool {
        self.map.contains(id)
    }

    /// The number of packages in the set.
    pub fn len(&self) -> usize {
        self.map.count()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over the member ids, ascending.
    pub fn ids(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.map.iter()
    }

    /// `self ∪ other`.
    pub fn union_with(&mut self, other: &PackageSet) {
        self.map.grow(other.map.len());
        self.map.union_with(&other.map);
    }

    /// `self ∩ other`.
    pub fn intersect_with(&mut self, other: &PackageSet) {
        self.map.intersect_with(&other.map);
    }

    /// `self ∖ other`.
    pub fn subtract(&mut self, other: &PackageSet) {
        self.map.subtract(&other.map);
    }
}

impl FromIterator<SolvableId> for PackageSet {
    fn from_iter<I: IntoIterator<Item = SolvableId>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

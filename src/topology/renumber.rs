//! Renumbering: a bijection between original vertex ids and internal,
//! per-rank contiguous ids.
//!
//! How vertices are assigned to ranks is delegated to a [`Renumberer`]; the
//! map itself only checks that the assignment is a partition of the vertex set
//! and numbers each rank's vertices consecutively, rank 0 first. The resulting
//! [`RenumberMap`] is identical on every rank.

use crate::debug_invariants::DebugInvariants;
use crate::graph_error::GraphError;
use crate::topology::partition::VertexPartition;
use crate::topology::vertex::mix64;
use hashbrown::HashMap;

/// Assigns original vertex ids to ranks.
pub trait Renumberer {
    /// Split `vertices` (sorted, distinct) into `n_parts` groups. Group `r`
    /// becomes rank `r`'s range, numbered in the order returned.
    fn assign(&self, vertices: &[u64], n_parts: usize) -> Vec<Vec<u64>>;
}

/// Default assignment: owner is a hash of the original id, ranks keep their
/// vertices in ascending original order.
#[derive(Copy, Clone, Debug, Default)]
pub struct HashRenumberer;

impl Renumberer for HashRenumberer {
    fn assign(&self, vertices: &[u64], n_parts: usize) -> Vec<Vec<u64>> {
        let mut groups = vec![Vec::new(); n_parts];
        if n_parts == 0 {
            return groups;
        }
        for &v in vertices {
            groups[(mix64(v) % n_parts as u64) as usize].push(v);
        }
        groups
    }
}

#[derive(Clone, Debug)]
pub struct RenumberMap {
    partition: VertexPartition,
    internal_to_original: Vec<u64>,
    original_to_internal: HashMap<u64, u64>,
}

impl RenumberMap {
    /// Renumber the distinct ids in `vertices` across `n_parts` ranks.
    pub fn build<R, I>(vertices: I, n_parts: usize, renumberer: &R) -> Result<Self, GraphError>
    where
        R: Renumberer + ?Sized,
        I: IntoIterator<Item = u64>,
    {
        if n_parts == 0 {
            return Err(GraphError::ZeroRanks);
        }
        let mut distinct: Vec<u64> = vertices.into_iter().collect();
        distinct.sort_unstable();
        distinct.dedup();

        let groups = renumberer.assign(&distinct, n_parts);
        if groups.len() != n_parts {
            return Err(GraphError::InvalidRenumberMap(format!(
                "renumberer produced {} groups for {n_parts} ranks",
                groups.len()
            )));
        }
        let map = Self::from_groups(groups)?;
        if map.internal_to_original.len() != distinct.len() {
            return Err(GraphError::InvalidRenumberMap(format!(
                "{} vertices assigned, {} expected",
                map.internal_to_original.len(),
                distinct.len()
            )));
        }
        if let Some(&stray) = map
            .internal_to_original
            .iter()
            .find(|v| distinct.binary_search(v).is_err())
        {
            return Err(GraphError::InvalidRenumberMap(format!(
                "vertex {stray} is not part of the graph"
            )));
        }
        Ok(map)
    }

    /// Number `groups[r]` consecutively as rank `r`'s range.
    pub fn from_groups(groups: Vec<Vec<u64>>) -> Result<Self, GraphError> {
        let counts: Vec<u64> = groups.iter().map(|g| g.len() as u64).collect();
        let partition = VertexPartition::from_counts(&counts)?;
        let internal_to_original: Vec<u64> = groups.into_iter().flatten().collect();
        let mut original_to_internal = HashMap::with_capacity(internal_to_original.len());
        for (internal, &original) in internal_to_original.iter().enumerate() {
            if original_to_internal.insert(original, internal as u64).is_some() {
                return Err(GraphError::InvalidRenumberMap(format!(
                    "vertex {original} assigned twice"
                )));
            }
        }
        let map = Self {
            partition,
            internal_to_original,
            original_to_internal,
        };
        map.debug_assert_invariants();
        Ok(map)
    }

    pub fn partition(&self) -> &VertexPartition {
        &self.partition
    }

    pub fn n_vertices(&self) -> u64 {
        self.internal_to_original.len() as u64
    }

    pub fn internal_of(&self, original: u64) -> Result<u64, GraphError> {
        self.original_to_internal
            .get(&original)
            .copied()
            .ok_or_else(|| GraphError::InvalidRenumberMap(format!("unknown original vertex {original}")))
    }

    pub fn original_of(&self, internal: u64) -> Result<u64, GraphError> {
        self.internal_to_original
            .get(internal as usize)
            .copied()
            .ok_or(GraphError::VertexOutOfRange(internal))
    }

    /// Original ids in internal order.
    pub fn originals(&self) -> &[u64] {
        &self.internal_to_original
    }
}

impl DebugInvariants for RenumberMap {
    fn debug_assert_invariants(&self) {
        crate::assert_invariants!(self.validate_invariants(), "RenumberMap");
    }

    fn validate_invariants(&self) -> Result<(), GraphError> {
        self.partition.validate_invariants()?;
        if self.partition.n_vertices() != self.n_vertices() {
            return Err(GraphError::InvalidRenumberMap(format!(
                "partition covers {} vertices, map holds {}",
                self.partition.n_vertices(),
                self.n_vertices()
            )));
        }
        if self.original_to_internal.len() != self.internal_to_original.len() {
            return Err(GraphError::InvalidRenumberMap("map is not one-to-one".into()));
        }
        for (internal, original) in self.internal_to_original.iter().enumerate() {
            if self.original_to_internal.get(original) != Some(&(internal as u64)) {
                return Err(GraphError::InvalidRenumberMap(format!(
                    "vertex {original} does not round-trip"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;
    impl Renumberer for Broken {
        fn assign(&self, vertices: &[u64], n_parts: usize) -> Vec<Vec<u64>> {
            let mut g = vec![Vec::new(); n_parts];
            g[0] = vertices.to_vec();
            g[0].push(vertices[0]);
            g
        }
    }

    #[test]
    fn ranges_are_contiguous_and_bijective() {
        let map = RenumberMap::build([10u64, 3, 77, 3, 42, 8], 3, &HashRenumberer).unwrap();
        assert_eq!(map.n_vertices(), 5);
        assert_eq!(map.partition().n_parts(), 3);
        for &orig in &[3u64, 8, 10, 42, 77] {
            let internal = map.internal_of(orig).unwrap();
            assert_eq!(map.original_of(internal).unwrap(), orig);
            let owner = map.partition().owner_of(internal).unwrap();
            assert_eq!(owner as u64, mix64(orig) % 3);
        }
        assert!(map.validate_invariants().is_ok());
    }

    #[test]
    fn duplicate_assignment_is_rejected() {
        let res = RenumberMap::build([1u64, 2], 2, &Broken);
        assert!(matches!(res, Err(GraphError::InvalidRenumberMap(_))));
    }

    #[test]
    fn zero_ranks_is_rejected() {
        assert!(matches!(
            RenumberMap::build([1u64], 0, &HashRenumberer),
            Err(GraphError::ZeroRanks)
        ));
    }
}

//! Small graphs bundled with the crate.

use crate::topology::graph::RawEdgeList;

/// Zachary's karate club, upper triangle of the adjacency, 0-based.
#[rustfmt::skip]
const KARATE_EDGES: [(u64, u64); 78] = [
    (0, 1), (0, 2), (0, 3), (0, 4), (0, 5), (0, 6), (0, 7), (0, 8), (0, 10), (0, 11),
    (0, 12), (0, 13), (0, 17), (0, 19), (0, 21), (0, 31),
    (1, 2), (1, 3), (1, 7), (1, 13), (1, 17), (1, 19), (1, 21), (1, 30),
    (2, 3), (2, 7), (2, 8), (2, 9), (2, 13), (2, 27), (2, 28), (2, 32),
    (3, 7), (3, 12), (3, 13),
    (4, 6), (4, 10),
    (5, 6), (5, 10), (5, 16),
    (6, 16),
    (8, 30), (8, 32), (8, 33),
    (9, 33),
    (13, 33),
    (14, 32), (14, 33),
    (15, 32), (15, 33),
    (18, 32), (18, 33),
    (19, 33),
    (20, 32), (20, 33),
    (22, 32), (22, 33),
    (23, 25), (23, 27), (23, 29), (23, 32), (23, 33),
    (24, 25), (24, 27), (24, 31),
    (25, 31),
    (26, 29), (26, 33),
    (27, 33),
    (28, 31), (28, 33),
    (29, 32), (29, 33),
    (30, 32), (30, 33),
    (31, 32), (31, 33),
    (32, 33),
];

/// Number of members in the karate club graph.
pub const KARATE_VERTICES: u64 = 34;

/// Zachary's karate club as a directed graph: both directions of each of its
/// 78 friendships, 156 edges over vertices `0..34`.
pub fn karate_club() -> RawEdgeList {
    let edges = KARATE_EDGES
        .iter()
        .flat_map(|&(u, v)| [(u, v), (v, u)])
        .collect();
    RawEdgeList::new(edges).with_num_vertices(KARATE_VERTICES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn karate_shape() {
        let g = karate_club();
        assert_eq!(g.len(), 156);
        assert_eq!(g.vertex_ids().len(), 34);
        let mut degree = vec![0usize; 34];
        for &(u, _) in &g.edges {
            degree[u as usize] += 1;
        }
        // the two leaders
        assert_eq!(degree[0], 16);
        assert_eq!(degree[33], 17);
        assert!(g.validate().is_ok());
    }
}

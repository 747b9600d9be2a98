/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides a KD-tree for deterministic k-nearest-neighbour queries over observation points.
//
// Created on: 02 Jun 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::{Mat, MatRef, Row};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A node in the KDTree.
#[derive(Debug)]
struct Node {
    coords: Row<f64>,
    index: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Candidate neighbour ordered by (distance, index).
///
/// The index participates in the ordering so that exact distance ties are
/// always resolved towards the lower observation index, keeping query
/// results deterministic.
#[derive(Debug, PartialEq)]
struct Neighbour {
    distance: f64,
    index: usize,
}

impl Eq for Neighbour {}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then(self.index.cmp(&other.index))
    }
}

/// The KDTree structure.
#[derive(Debug)]
pub(crate) struct KDTree {
    nodes: Vec<Node>,
}

impl KDTree {
    /// Constructs a new KDTree from a matrix of points (one row per point).
    pub fn new(points: MatRef<'_, f64>) -> Self {
        let mut entries: Vec<(Row<f64>, usize)> = (0..points.nrows())
            .map(|i| (points.row(i).to_owned(), i))
            .collect();

        let mut tree = KDTree { nodes: Vec::new() };
        tree.build_tree(&mut entries, 0);
        tree
    }

    /// Recursively builds the KDTree and stores nodes in a flat vector.
    fn build_tree(&mut self, entries: &mut [(Row<f64>, usize)], depth: usize) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }

        let axis = depth % entries[0].0.ncols();

        entries.sort_by(|a, b| {
            a.0[axis]
                .partial_cmp(&b.0[axis])
                .unwrap_or(Ordering::Equal)
        });

        let mid = entries.len() / 2;
        let (coords, index) = entries[mid].clone();

        let node_index = self.nodes.len();
        self.nodes.push(Node {
            coords,
            index,
            left: None,
            right: None,
        });

        self.nodes[node_index].left = self.build_tree(&mut entries[..mid], depth + 1);
        self.nodes[node_index].right = self.build_tree(&mut entries[mid + 1..], depth + 1);

        Some(node_index)
    }

    /// Finds the `k` nearest stored points to each query point.
    ///
    /// Returns `(distances, indices)`, both of shape `(n_queries, k)`, with
    /// neighbours ordered by increasing distance and exact ties broken by
    /// ascending index. `k` must not exceed the number of stored points.
    pub fn query(&self, query_points: MatRef<'_, f64>, k: usize) -> (Mat<f64>, Mat<usize>) {
        assert!(k >= 1, "neighbourhood size must be at least 1");
        assert!(
            k <= self.nodes.len(),
            "neighbourhood size {} exceeds point count {}",
            k,
            self.nodes.len()
        );

        let num_queries = query_points.nrows();
        let mut all_distances = Mat::<f64>::zeros(num_queries, k);
        let mut all_indices: Mat<usize> = Mat::from_fn(num_queries, k, |_, _| 0);

        for q in 0..num_queries {
            let query = query_points.row(q).to_owned();
            let mut heap = BinaryHeap::with_capacity(k);
            self.k_nearest_impl(0, &query, k, 0, &mut heap);

            // BinaryHeap::into_sorted_vec is ascending, closest first.
            let neighbours = heap.into_sorted_vec();

            all_distances
                .row_mut(q)
                .iter_mut()
                .zip(neighbours.iter())
                .for_each(|(slot, neighbour)| *slot = neighbour.distance);

            all_indices
                .row_mut(q)
                .iter_mut()
                .zip(neighbours.iter())
                .for_each(|(slot, neighbour)| *slot = neighbour.index);
        }

        (all_distances, all_indices)
    }

    fn k_nearest_impl(
        &self,
        node_index: usize,
        query: &Row<f64>,
        k: usize,
        depth: usize,
        heap: &mut BinaryHeap<Neighbour>,
    ) {
        if node_index >= self.nodes.len() {
            return;
        }

        let node = &self.nodes[node_index];
        let distance = euclidean_distance(query.as_ref(), node.coords.as_ref());
        let candidate = Neighbour {
            distance,
            index: node.index,
        };

        if heap.len() < k {
            heap.push(candidate);
        } else if candidate < *heap.peek().unwrap() {
            heap.pop();
            heap.push(candidate);
        }

        let axis = depth % node.coords.ncols();
        let diff = query[axis] - node.coords[axis];

        let (near_idx, far_idx) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near_idx {
            self.k_nearest_impl(near, query, k, depth + 1, heap);
        }

        if let Some(far) = far_idx {
            // The far side may only contain closer points if the splitting
            // plane is within the current worst distance.
            if heap.len() < k || diff.abs() <= heap.peek().unwrap().distance {
                self.k_nearest_impl(far, query, k, depth + 1, heap);
            }
        }
    }
}

#[inline(always)]
fn euclidean_distance(a: faer::RowRef<'_, f64>, b: faer::RowRef<'_, f64>) -> f64 {
    let mut dist = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let diff = x - y;
        dist += diff * diff;
    }
    dist.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::generate_random_points;
    use faer::mat;

    fn brute_force_knn(points: &Mat<f64>, query: faer::RowRef<'_, f64>, k: usize) -> Vec<usize> {
        let mut candidates: Vec<(f64, usize)> = (0..points.nrows())
            .map(|i| (euclidean_distance(query, points.row(i)), i))
            .collect();
        candidates.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        candidates.into_iter().take(k).map(|(_, i)| i).collect()
    }

    #[test]
    fn knn_matches_bruteforce_1d_2d_3d() {
        for (n, d, seed, k) in [
            (200usize, 1usize, 42u64, 5usize),
            (300, 2, 123, 8),
            (400, 3, 999, 12),
        ] {
            let points = generate_random_points(n, d, Some(seed));
            let tree = KDTree::new(points.as_ref());
            let queries = generate_random_points(20, d, Some(seed + 50));

            let (distances, indices) = tree.query(queries.as_ref(), k);

            for q in 0..queries.nrows() {
                let expected = brute_force_knn(&points, queries.row(q), k);
                let found: Vec<usize> = (0..k).map(|j| indices[(q, j)]).collect();
                assert_eq!(found, expected, "query {} dim {}", q, d);

                // Distances must be non-decreasing.
                for j in 1..k {
                    assert!(distances[(q, j)] >= distances[(q, j - 1)]);
                }
            }
        }
    }

    #[test]
    fn equidistant_ties_resolve_to_lowest_indices() {
        // Four points at distance 1 from the origin plus the origin itself.
        let points = mat![
            [0.0, 0.0],
            [1.0, 0.0],
            [-1.0, 0.0],
            [0.0, 1.0],
            [0.0, -1.0],
        ];
        let tree = KDTree::new(points.as_ref());
        let query = mat![[0.0, 0.0]];

        let (distances, indices) = tree.query(query.as_ref(), 3);
        assert_eq!(indices[(0, 0)], 0);
        assert_eq!(indices[(0, 1)], 1);
        assert_eq!(indices[(0, 2)], 2);
        assert_eq!(distances[(0, 0)], 0.0);
        assert_eq!(distances[(0, 1)], 1.0);
        assert_eq!(distances[(0, 2)], 1.0);
    }

    #[test]
    fn querying_all_points_returns_every_index() {
        let points = generate_random_points(30, 2, Some(5));
        let tree = KDTree::new(points.as_ref());
        let query = generate_random_points(1, 2, Some(6));

        let (_, indices) = tree.query(query.as_ref(), 30);
        let mut seen: Vec<usize> = (0..30).map(|j| indices[(0, j)]).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn duplicate_points_are_both_reported() {
        let points = mat![[0.3, 0.7], [0.3, 0.7], [0.9, 0.9]];
        let tree = KDTree::new(points.as_ref());
        let query = mat![[0.3, 0.7]];

        let (distances, indices) = tree.query(query.as_ref(), 2);
        assert_eq!(indices[(0, 0)], 0);
        assert_eq!(indices[(0, 1)], 1);
        assert_eq!(distances[(0, 0)], 0.0);
        assert_eq!(distances[(0, 1)], 0.0);
    }
}

//! Nearest-neighbour index over trajectory displacements
//!
//! A static 2-d tree stored implicitly in one vector: for any sub-range the
//! median element is the node, the left half holds smaller coordinates on the
//! split axis and the right half larger ones. Built once, never mutated.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::seq::SliceRandom;
use rand::Rng;

use super::trajectory::Displacement;

/// One query hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the trajectory in the bank
    pub index: usize,
    /// Euclidean distance between the query and the trajectory's displacement
    pub distance: f64,
}

/// Static k-d tree over displacement vectors
#[derive(Debug, Clone)]
pub struct DisplacementIndex {
    /// `(displacement, bank index)` in implicit tree order
    nodes: Vec<(Displacement, usize)>,
}

impl DisplacementIndex {
    /// Build the tree. Position `i` in `displacements` is reported as `index = i`.
    pub fn build(displacements: &[Displacement]) -> Self {
        let mut nodes: Vec<(Displacement, usize)> = displacements
            .iter()
            .copied()
            .enumerate()
            .map(|(i, d)| (d, i))
            .collect();
        arrange(&mut nodes, 0);
        Self { nodes }
    }

    /// Number of indexed displacements
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The `k` closest displacements, nearest first.
    ///
    /// Returns `min(k, len)` hits; ties are broken by bank index.
    pub fn nearest(&self, query: Displacement, k: usize) -> Vec<Neighbor> {
        if k == 0 || self.nodes.is_empty() {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        search(&self.nodes, 0, query, k, &mut heap);

        let mut hits: Vec<Candidate> = heap.into_vec();
        hits.sort();
        hits.into_iter()
            .map(|c| Neighbor {
                index: c.index,
                distance: c.distance_squared.sqrt(),
            })
            .collect()
    }

    /// One of the `k` closest displacements, chosen uniformly.
    ///
    /// Spreads repeated moves over several similar recordings instead of
    /// replaying the single best match every time.
    pub fn nearest_random<R: Rng + ?Sized>(
        &self,
        query: Displacement,
        k: usize,
        rng: &mut R,
    ) -> Option<Neighbor> {
        self.nearest(query, k).choose(rng).copied()
    }
}

/// Depth-first k-nearest search with plane pruning
fn search(
    nodes: &[(Displacement, usize)],
    depth: usize,
    query: Displacement,
    k: usize,
    heap: &mut BinaryHeap<Candidate>,
) {
    if nodes.is_empty() {
        return;
    }

    let axis = depth % 2;
    let mid = nodes.len() / 2;
    let (point, index) = nodes[mid];

    heap.push(Candidate {
        distance_squared: query.distance_squared(&point),
        index,
    });
    if heap.len() > k {
        heap.pop();
    }

    let diff = query.axis(axis) - point.axis(axis);
    let (near, far) = if diff < 0.0 {
        (&nodes[..mid], &nodes[mid + 1..])
    } else {
        (&nodes[mid + 1..], &nodes[..mid])
    };

    search(near, depth + 1, query, k, heap);

    // The far side can only help if the splitting plane is closer than the current worst hit
    let worst = heap.peek().map_or(f64::INFINITY, |c| c.distance_squared);
    if heap.len() < k || diff * diff <= worst {
        search(far, depth + 1, query, k, heap);
    }
}

/// Recursively place medians so each sub-range forms a subtree
fn arrange(nodes: &mut [(Displacement, usize)], depth: usize) {
    if nodes.len() <= 1 {
        return;
    }
    let axis = depth % 2;
    let mid = nodes.len() / 2;
    nodes.select_nth_unstable_by(mid, |a, b| a.0.axis(axis).total_cmp(&b.0.axis(axis)));

    let (left, rest) = nodes.split_at_mut(mid);
    arrange(left, depth + 1);
    arrange(&mut rest[1..], depth + 1);
}

/// Heap entry ordered by distance, then bank index (max-heap keeps the worst on top)
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_squared: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_squared
            .total_cmp(&other.distance_squared)
            .then(self.index.cmp(&other.index))
    }
}

//! HNSW (Hierarchical Navigable Small World) graph over snapshot vectors.
//!
//! The graph stores only topology; vectors stay in the snapshot and are
//! passed to every call. Node `i` is row `i` of the snapshot. Levels come
//! from a hash of the record id, so the same records always produce the same
//! graph.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use super::embedding::dot;

const M: usize = 16;
const M_MAX: usize = M;
const M_MAX_0: usize = M * 2;
const EF_CONSTRUCTION: usize = 200;

fn ml_factor() -> f64 {
    1.0 / (M as f64).ln()
}

#[derive(Debug, Clone, Default)]
pub struct HnswGraph {
    levels: Vec<usize>,
    neighbors: Vec<Vec<Vec<usize>>>,
    entry_point: Option<usize>,
    max_level: usize,
}

/// Nearest-first when popped from a max-heap
#[derive(Clone, Copy)]
struct Candidate {
    idx: usize,
    distance: f32,
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
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Farthest-first when popped from a max-heap
#[derive(Clone, Copy)]
struct FarCandidate {
    idx: usize,
    distance: f32,
}

impl PartialEq for FarCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FarCandidate {}

impl PartialOrd for FarCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FarCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.idx.cmp(&other.idx))
    }
}

/// Vectors are unit length, so cosine distance is `1 - dot`.
fn distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - dot(a, b)
}

/// FNV-1a over the id, mapped into (0, 1].
fn level_for(id: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let r = ((hash >> 11) as f64 + 1.0) / (1u64 << 53) as f64;
    (-r.ln() * ml_factor()).floor() as usize
}

impl HnswGraph {
    /// Build a graph over `vectors`; `ids[i]` names `vectors[i]`.
    pub fn build(ids: &[&str], vectors: &[Vec<f32>]) -> Self {
        let mut graph = Self::default();
        for (idx, id) in ids.iter().enumerate() {
            graph.insert(idx, level_for(id), vectors);
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    fn insert(&mut self, node_idx: usize, level: usize, vectors: &[Vec<f32>]) {
        self.levels.push(level);
        self.neighbors.push(vec![Vec::new(); level + 1]);

        let Some(mut ep) = self.entry_point else {
            self.entry_point = Some(node_idx);
            self.max_level = level;
            return;
        };

        let query = &vectors[node_idx];

        for lc in (level + 1..=self.max_level).rev() {
            ep = self.search_layer_single(query, ep, lc, vectors);
        }

        for lc in (0..=level.min(self.max_level)).rev() {
            let m_max = if lc == 0 { M_MAX_0 } else { M_MAX };
            let found = self.search_layer(query, ep, EF_CONSTRUCTION, lc, vectors);
            let selected = select_nearest(&found, m_max);

            self.neighbors[node_idx][lc] = selected.clone();

            for &neighbor_idx in &selected {
                if lc > self.levels[neighbor_idx] {
                    continue;
                }
                self.neighbors[neighbor_idx][lc].push(node_idx);
                if self.neighbors[neighbor_idx][lc].len() > m_max {
                    let anchor = &vectors[neighbor_idx];
                    let candidates: Vec<Candidate> = self.neighbors[neighbor_idx][lc]
                        .iter()
                        .map(|&n| Candidate {
                            idx: n,
                            distance: distance(anchor, &vectors[n]),
                        })
                        .collect();
                    self.neighbors[neighbor_idx][lc] = select_nearest(&candidates, m_max);
                }
            }

            if let Some(&nearest) = selected.first() {
                ep = nearest;
            }
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(node_idx);
        }
    }

    fn search_layer_single(
        &self,
        query: &[f32],
        ep: usize,
        level: usize,
        vectors: &[Vec<f32>],
    ) -> usize {
        let mut current = ep;
        let mut current_dist = distance(query, &vectors[current]);

        loop {
            let mut changed = false;
            if let Some(layer) = self.neighbors[current].get(level) {
                for &neighbor in layer {
                    let dist = distance(query, &vectors[neighbor]);
                    if dist < current_dist {
                        current = neighbor;
                        current_dist = dist;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        current
    }

    fn search_layer(
        &self,
        query: &[f32],
        ep: usize,
        ef: usize,
        level: usize,
        vectors: &[Vec<f32>],
    ) -> Vec<Candidate> {
        let mut visited = HashSet::new();
        let mut candidates = BinaryHeap::new();
        let mut results = BinaryHeap::new();

        let dist = distance(query, &vectors[ep]);
        visited.insert(ep);
        candidates.push(Candidate { idx: ep, distance: dist });
        results.push(FarCandidate { idx: ep, distance: dist });

        while let Some(Candidate { idx: c_idx, distance: c_dist }) = candidates.pop() {
            let worst_dist = results.peek().map(|r| r.distance).unwrap_or(f32::MAX);
            if c_dist > worst_dist && results.len() >= ef {
                break;
            }

            let Some(layer) = self.neighbors[c_idx].get(level) else {
                continue;
            };
            for &neighbor in layer {
                if !visited.insert(neighbor) {
                    continue;
                }

                let dist = distance(query, &vectors[neighbor]);
                let worst = results.peek().map(|r| r.distance).unwrap_or(f32::MAX);

                if dist < worst || results.len() < ef {
                    candidates.push(Candidate { idx: neighbor, distance: dist });
                    results.push(FarCandidate { idx: neighbor, distance: dist });
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results
            .into_sorted_vec()
            .into_iter()
            .map(|fc| Candidate {
                idx: fc.idx,
                distance: fc.distance,
            })
            .collect()
    }

    /// Candidate row indices near `query`, nearest first. At most `ef` rows.
    pub fn search(&self, query: &[f32], ef: usize, vectors: &[Vec<f32>]) -> Vec<usize> {
        let Some(mut ep) = self.entry_point else {
            return Vec::new();
        };

        for lc in (1..=self.max_level).rev() {
            ep = self.search_layer_single(query, ep, lc, vectors);
        }

        self.search_layer(query, ep, ef.max(1), 0, vectors)
            .into_iter()
            .map(|c| c.idx)
            .collect()
    }
}

fn select_nearest(candidates: &[Candidate], m: usize) -> Vec<usize> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.idx.cmp(&b.idx)));
    sorted.into_iter().take(m).map(|c| c.idx).collect()
}

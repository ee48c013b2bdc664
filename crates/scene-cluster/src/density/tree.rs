//! Mutual reachability spanning tree and single-linkage hierarchy.

use crate::matrix::DistanceMatrix;

/// Distance between two distinct positions, infinite when unreachable.
pub(super) fn pair_distance(matrix: &DistanceMatrix, i: usize, j: usize) -> f64 {
    let d = matrix.get(i, j).max(matrix.get(j, i));
    if d >= matrix.sentinel() {
        f64::INFINITY
    } else {
        d
    }
}

/// Core distance of every position: distance to its `min_samples`-th
/// nearest other position.
pub(super) fn core_distances(matrix: &DistanceMatrix, min_samples: usize) -> Vec<f64> {
    let n = matrix.len();
    let k = min_samples.clamp(1, n - 1);
    let mut others = Vec::with_capacity(n - 1);

    (0..n)
        .map(|i| {
            others.clear();
            others.extend((0..n).filter(|&j| j != i).map(|j| pair_distance(matrix, i, j)));
            let (_, kth, _) = others.select_nth_unstable_by(k - 1, f64::total_cmp);
            *kth
        })
        .collect()
}

fn mutual_reachability(matrix: &DistanceMatrix, core: &[f64], i: usize, j: usize) -> f64 {
    pair_distance(matrix, i, j).max(core[i]).max(core[j])
}

/// Spanning tree edge between two positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct SpanningEdge {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

/// Minimum spanning tree of the mutual reachability graph (dense Prim).
///
/// Starts at position 0; on equal weights the lowest position is taken.
pub(super) fn minimum_spanning_tree(matrix: &DistanceMatrix, core: &[f64]) -> Vec<SpanningEdge> {
    let n = matrix.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut source = vec![0; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));
    let mut current = 0;
    in_tree[current] = true;

    for _ in 1..n {
        let mut next = None;
        let mut next_weight = f64::INFINITY;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let weight = mutual_reachability(matrix, core, current, j);
            if weight < best[j] {
                best[j] = weight;
                source[j] = current;
            }
            if next.is_none() || best[j] < next_weight {
                next = Some(j);
                next_weight = best[j];
            }
        }
        let Some(next) = next else {
            break;
        };
        edges.push(SpanningEdge {
            from: source[next],
            to: next,
            weight: next_weight,
        });
        in_tree[next] = true;
        current = next;
    }

    edges
}

/// Merge node of the single-linkage hierarchy.
///
/// Leaves are positions `0..n`; merge `i` creates node `n + i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

struct LinkageSets {
    parent: Vec<Option<usize>>,
    size: Vec<usize>,
    next: usize,
}

impl LinkageSets {
    fn new(n: usize) -> Self {
        let total = 2 * n - 1;
        let mut size = vec![0; total];
        size[..n].fill(1);
        Self {
            parent: vec![None; total],
            size,
            next: n,
        }
    }

    fn find(&mut self, node: usize) -> usize {
        let mut root = node;
        while let Some(parent) = self.parent[root] {
            root = parent;
        }
        let mut walk = node;
        while let Some(parent) = self.parent[walk] {
            if parent == root {
                break;
            }
            self.parent[walk] = Some(root);
            walk = parent;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) -> usize {
        let node = self.next;
        self.size[node] = self.size[a] + self.size[b];
        self.parent[a] = Some(node);
        self.parent[b] = Some(node);
        self.next += 1;
        node
    }
}

/// Single-linkage hierarchy from spanning tree edges.
pub(super) fn single_linkage(n: usize, mut edges: Vec<SpanningEdge>) -> Vec<Merge> {
    edges.sort_by(|a, b| a.weight.total_cmp(&b.weight));

    let mut sets = LinkageSets::new(n);
    edges
        .into_iter()
        .map(|edge| {
            let left = sets.find(edge.from);
            let right = sets.find(edge.to);
            let node = sets.union(left, right);
            Merge {
                left,
                right,
                distance: edge.weight,
                size: sets.size[node],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: f64 = f64::INFINITY;

    fn matrix(rows: Vec<Vec<f64>>) -> DistanceMatrix {
        DistanceMatrix::from_rows(rows, INF).unwrap()
    }

    #[test]
    fn test_pair_distance_takes_farther_direction() {
        let m = matrix(vec![vec![0.0, 0.3], vec![0.5, 0.0]]);
        assert_eq!(pair_distance(&m, 0, 1), 0.5);
        assert_eq!(pair_distance(&m, 1, 0), 0.5);

        let m = matrix(vec![vec![0.0, 0.3], vec![INF, 0.0]]);
        assert_eq!(pair_distance(&m, 0, 1), INF);
    }

    #[test]
    fn test_core_distances() {
        let m = matrix(vec![
            vec![0.0, 1.0, 2.0, INF],
            vec![1.0, 0.0, 4.0, INF],
            vec![2.0, 4.0, 0.0, INF],
            vec![INF, INF, INF, 0.0],
        ]);
        assert_eq!(core_distances(&m, 1), vec![1.0, 1.0, 2.0, INF]);
        assert_eq!(core_distances(&m, 2), vec![2.0, 4.0, 4.0, INF]);
        // Clamped to n - 1 others.
        assert_eq!(core_distances(&m, 10), vec![INF, INF, INF, INF]);
    }

    #[test]
    fn test_spanning_tree_and_linkage() {
        let m = matrix(vec![
            vec![0.0, 1.0, 5.0],
            vec![1.0, 0.0, 2.0],
            vec![5.0, 2.0, 0.0],
        ]);
        let core = core_distances(&m, 1);
        assert_eq!(core, vec![1.0, 1.0, 2.0]);

        let tree = minimum_spanning_tree(&m, &core);
        assert_eq!(
            tree,
            vec![
                SpanningEdge {
                    from: 0,
                    to: 1,
                    weight: 1.0
                },
                SpanningEdge {
                    from: 1,
                    to: 2,
                    weight: 2.0
                },
            ]
        );

        let hierarchy = single_linkage(3, tree);
        assert_eq!(
            hierarchy,
            vec![
                Merge {
                    left: 0,
                    right: 1,
                    distance: 1.0,
                    size: 2
                },
                Merge {
                    left: 3,
                    right: 2,
                    distance: 2.0,
                    size: 3
                },
            ]
        );
    }

    #[test]
    fn test_disconnected_points_merge_at_infinity() {
        let m = matrix(vec![
            vec![0.0, 0.1, INF],
            vec![0.1, 0.0, INF],
            vec![INF, INF, 0.0],
        ]);
        let core = core_distances(&m, 1);
        let hierarchy = single_linkage(3, minimum_spanning_tree(&m, &core));

        assert_eq!(hierarchy.len(), 2);
        assert_eq!(hierarchy[0].distance, 0.1);
        assert_eq!(hierarchy[1].distance, INF);
        assert_eq!(hierarchy[1].size, 3);
    }
}

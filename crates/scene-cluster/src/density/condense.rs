//! Condensed cluster tree, stability and excess-of-mass selection.
//!
//! Condensed cluster ids start at `n` (the root); points keep their
//! positions `0..n`. A child cluster always has a larger id than its parent.

use std::collections::VecDeque;

use scene_types::NOISE_LABEL;

use super::tree::Merge;

/// One row of the condensed tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct CondensedEdge {
    /// Cluster id
    pub parent: usize,
    /// Point position (`< n`) or cluster id (`>= n`)
    pub child: usize,
    /// Density at which the child leaves the parent
    pub lambda: f64,
    pub child_size: usize,
}

fn lambda_of(distance: f64) -> f64 {
    if distance.is_infinite() {
        0.0
    } else if distance > 0.0 {
        (1.0 / distance).min(f64::MAX)
    } else {
        f64::MAX
    }
}

/// Nodes of the hierarchy below `root`, breadth first, `root` included.
fn descendants(hierarchy: &[Merge], n: usize, root: usize) -> Vec<usize> {
    let mut order = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        if node >= n {
            let merge = &hierarchy[node - n];
            queue.push_back(merge.left);
            queue.push_back(merge.right);
        }
    }
    order
}

fn node_size(hierarchy: &[Merge], n: usize, node: usize) -> usize {
    if node >= n {
        hierarchy[node - n].size
    } else {
        1
    }
}

/// Condense the single-linkage hierarchy: splits smaller than
/// `min_cluster_size` are points falling out of their parent cluster.
pub(super) fn condense(hierarchy: &[Merge], n: usize, min_cluster_size: usize) -> Vec<CondensedEdge> {
    let root = n + hierarchy.len() - 1;
    let mut relabel = vec![0; root + 1];
    relabel[root] = n;
    let mut next_label = n + 1;
    let mut ignore = vec![false; root + 1];
    let mut result = Vec::new();

    for node in descendants(hierarchy, n, root) {
        if ignore[node] || node < n {
            continue;
        }
        let merge = hierarchy[node - n];
        let lambda = lambda_of(merge.distance);
        let parent = relabel[node];
        let left_big = node_size(hierarchy, n, merge.left) >= min_cluster_size;
        let right_big = node_size(hierarchy, n, merge.right) >= min_cluster_size;

        let mut fall_out = |side: usize, result: &mut Vec<CondensedEdge>| {
            for sub in descendants(hierarchy, n, side) {
                if sub < n {
                    result.push(CondensedEdge {
                        parent,
                        child: sub,
                        lambda,
                        child_size: 1,
                    });
                }
                ignore[sub] = true;
            }
        };

        match (left_big, right_big) {
            (true, true) => {
                for side in [merge.left, merge.right] {
                    relabel[side] = next_label;
                    next_label += 1;
                    result.push(CondensedEdge {
                        parent,
                        child: relabel[side],
                        lambda,
                        child_size: node_size(hierarchy, n, side),
                    });
                }
            }
            (false, false) => {
                fall_out(merge.left, &mut result);
                fall_out(merge.right, &mut result);
            }
            (true, false) => {
                relabel[merge.left] = parent;
                fall_out(merge.right, &mut result);
            }
            (false, true) => {
                relabel[merge.right] = parent;
                fall_out(merge.left, &mut result);
            }
        }
    }

    result
}

/// Number of condensed clusters, root included.
fn cluster_count(tree: &[CondensedEdge], n: usize) -> usize {
    tree.iter()
        .map(|edge| edge.child.max(edge.parent) + 1)
        .max()
        .map_or(1, |top| top.max(n + 1) - n)
}

/// Stability of every condensed cluster, indexed by `id - n`.
fn stabilities(tree: &[CondensedEdge], n: usize, count: usize) -> Vec<f64> {
    let mut birth = vec![0.0; count];
    for edge in tree.iter().filter(|edge| edge.child >= n) {
        birth[edge.child - n] = edge.lambda;
    }

    let mut stability = vec![0.0; count];
    for edge in tree {
        let p = edge.parent - n;
        stability[p] += (edge.lambda - birth[p]) * edge.child_size as f64;
    }
    stability
}

/// Excess-of-mass selection. Returns a flag per cluster (`id - n`).
/// The root is never selected.
pub(super) fn select_clusters(tree: &[CondensedEdge], n: usize) -> Vec<bool> {
    let count = cluster_count(tree, n);
    let mut stability = stabilities(tree, n, count);

    let mut children = vec![Vec::new(); count];
    for edge in tree.iter().filter(|edge| edge.child >= n) {
        children[edge.parent - n].push(edge.child - n);
    }

    let mut selected = vec![true; count];
    selected[0] = false;

    for cluster in (1..count).rev() {
        let subtree: f64 = children[cluster].iter().map(|&c| stability[c]).sum();
        if subtree > stability[cluster] {
            selected[cluster] = false;
            stability[cluster] = subtree;
        } else {
            let mut queue: VecDeque<usize> = children[cluster].iter().copied().collect();
            while let Some(c) = queue.pop_front() {
                selected[c] = false;
                queue.extend(children[c].iter().copied());
            }
        }
    }

    selected
}

/// Label every point with its selected cluster, numbered `0..` in cluster
/// id order. Points outside every selected cluster, or that only reach one
/// at zero density, are noise.
pub(super) fn assign_labels(tree: &[CondensedEdge], n: usize, selected: &[bool]) -> Vec<i32> {
    let count = selected.len();

    let mut parent_of = vec![None; count];
    for edge in tree.iter().filter(|edge| edge.child >= n) {
        parent_of[edge.child - n] = Some(edge.parent - n);
    }

    // Parents precede children, so one ascending pass resolves owners.
    let mut owner: Vec<Option<usize>> = vec![None; count];
    for cluster in 0..count {
        owner[cluster] = if selected[cluster] {
            Some(cluster)
        } else {
            parent_of[cluster].and_then(|p| owner[p])
        };
    }

    let mut point_owner = vec![None; n];
    for edge in tree.iter().filter(|edge| edge.child < n && edge.lambda > 0.0) {
        point_owner[edge.child] = owner[edge.parent - n];
    }

    let mut used: Vec<usize> = point_owner.iter().flatten().copied().collect();
    used.sort_unstable();
    used.dedup();

    point_owner
        .iter()
        .map(|owner| match owner {
            Some(cluster) => used
                .binary_search(cluster)
                .map_or(NOISE_LABEL, |label| label as i32),
            None => NOISE_LABEL,
        })
        .collect()
}

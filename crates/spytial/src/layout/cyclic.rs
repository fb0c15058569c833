//! Cyclic arrangement of a binary relation.
//!
//! The relation is split into fragments, one per connected component,
//! each ordered along its edges. Members of a fragment are placed at evenly
//! spaced angles on a unit circle and every pair whose angular positions
//! differ noticeably becomes a left-of or above requirement.

use std::f64::consts::TAU;

use indexmap::IndexMap;
use petgraph::{
    Direction as EdgeDirection, Undirected,
    graph::{DiGraph, NodeIndex},
    visit::Dfs,
};

use spytial_parser::spec::Rotation;

/// Separation on the unit circle below which two members count as level.
const LEVEL_EPSILON: f64 = 1e-6;

/// A relative requirement between two fragment members, by node id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Placement {
    LeftOf(String, String),
    Above(String, String),
}

/// Splits the pairs into fragments, each listed in traversal order.
pub(super) fn fragments<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<Vec<&'a str>> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut indices: IndexMap<&str, NodeIndex> = IndexMap::new();
    for (source, target) in pairs {
        let source = *indices
            .entry(source)
            .or_insert_with(|| graph.add_node(source));
        let target = *indices
            .entry(target)
            .or_insert_with(|| graph.add_node(target));
        graph.update_edge(source, target, ());
    }

    let undirected = graph.clone().into_edge_type::<Undirected>();
    let mut assigned = vec![false; graph.node_count()];
    let mut result = Vec::new();

    for start in graph.node_indices() {
        if assigned[start.index()] {
            continue;
        }

        let mut component = Vec::new();
        let mut dfs = Dfs::new(&undirected, start);
        while let Some(node) = dfs.next(&undirected) {
            component.push(node);
        }
        component.sort();

        // Paths start at a member without predecessors; cycles at their first member.
        let root = component
            .iter()
            .copied()
            .find(|node| {
                graph
                    .neighbors_directed(*node, EdgeDirection::Incoming)
                    .next()
                    .is_none()
            })
            .unwrap_or(start);

        let mut ordered = Vec::with_capacity(component.len());
        for seed in std::iter::once(root).chain(component.iter().copied()) {
            if assigned[seed.index()] {
                continue;
            }
            let mut walk = Dfs::new(&graph, seed);
            while let Some(node) = walk.next(&graph) {
                if !assigned[node.index()] {
                    assigned[node.index()] = true;
                    ordered.push(graph[node]);
                }
            }
        }
        result.push(ordered);
    }
    result
}

/// Pairwise placements for the members of one fragment laid on a circle.
pub(super) fn placements(fragment: &[&str], rotation: Rotation) -> Vec<Placement> {
    let count = fragment.len();
    if count < 2 {
        return Vec::new();
    }

    let sign = match rotation {
        Rotation::Clockwise => 1.0,
        Rotation::Counterclockwise => -1.0,
    };
    // Screen coordinates: y grows downwards, so increasing angles turn clockwise.
    let positions: Vec<(f64, f64)> = (0..count)
        .map(|i| {
            let angle = sign * TAU * i as f64 / count as f64;
            (angle.cos(), angle.sin())
        })
        .collect();

    let mut result = Vec::new();
    for i in 0..count {
        for j in i + 1..count {
            let (xi, yi) = positions[i];
            let (xj, yj) = positions[j];
            if (xi - xj).abs() > LEVEL_EPSILON {
                let (left, right) = if xi < xj { (i, j) } else { (j, i) };
                result.push(Placement::LeftOf(
                    fragment[left].to_string(),
                    fragment[right].to_string(),
                ));
            }
            if (yi - yj).abs() > LEVEL_EPSILON {
                let (top, bottom) = if yi < yj { (i, j) } else { (j, i) };
                result.push(Placement::Above(
                    fragment[top].to_string(),
                    fragment[bottom].to_string(),
                ));
            }
        }
    }
    result
}

use crate::data::{PatternIndex, TimePattern};
use log::trace;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::BTreeSet;

/// True iff some day is shared by both patterns with overlapping windows.
pub fn patterns_clash(a: &TimePattern, b: &TimePattern) -> bool {
    a.slots.iter().any(|day_slots| {
        day_slots
            .windows
            .iter()
            .any(|window| b.windows_on(day_slots.day).any(|other| window.overlaps(other)))
    })
}

/// Groups pattern indices into clash-connected components.
///
/// Components are transitive closures of the pairwise clash relation, so a
/// group may hold two patterns that do not clash with each other directly.
/// Groups come back ordered by their smallest index.
pub fn find_conflict_groups(patterns: &[TimePattern]) -> Vec<BTreeSet<PatternIndex>> {
    let mut graph = UnGraph::<(), ()>::new_undirected();
    let nodes: Vec<NodeIndex> = patterns.iter().map(|_| graph.add_node(())).collect();
    for i in 0..patterns.len() {
        for j in (i + 1)..patterns.len() {
            if patterns_clash(&patterns[i], &patterns[j]) {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }

    // On an undirected graph the strongly connected components are the
    // connected components.
    let mut groups: Vec<BTreeSet<PatternIndex>> = kosaraju_scc(&graph)
        .into_iter()
        .map(|component| component.into_iter().map(|node| node.index()).collect())
        .collect();
    groups.sort_by_key(|group| group.first().copied());
    trace!(
        "Found {} conflict groups among {} patterns ({} clashing pairs).",
        groups.len(),
        patterns.len(),
        graph.edge_count()
    );
    groups
}

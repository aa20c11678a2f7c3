//! Louvain community detection over the undirected view of the repost network.

use std::collections::{BTreeMap, HashMap};

use fakecheck_common::SourceId;

use crate::corpus_graph::RepostNetwork;

const MIN_GAIN: f64 = 1e-12;
const MAX_PASSES: usize = 100;

/// Undirected weighted graph in adjacency form. Self-loop weight is kept apart
/// and counts twice towards a node's degree.
struct Level {
    adj: Vec<BTreeMap<usize, f64>>,
    self_loops: Vec<f64>,
}

impl Level {
    fn from_network(network: &RepostNetwork) -> Self {
        let n = network.node_count();
        let mut adj = vec![BTreeMap::new(); n];
        for (a, b, w) in network.weighted_edges() {
            if a == b {
                continue;
            }
            *adj[a].entry(b).or_insert(0.0) += w;
            *adj[b].entry(a).or_insert(0.0) += w;
        }
        Self {
            adj,
            self_loops: vec![0.0; n],
        }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    fn degree(&self, i: usize) -> f64 {
        self.adj[i].values().sum::<f64>() + 2.0 * self.self_loops[i]
    }

    /// Local moving phase. Returns each node's community, densely relabeled in
    /// order of first appearance, and whether any node moved.
    fn local_moving(&self, resolution: f64) -> (Vec<usize>, bool) {
        let n = self.len();
        let degrees: Vec<f64> = (0..n).map(|i| self.degree(i)).collect();
        let two_m: f64 = degrees.iter().sum();
        let mut community: Vec<usize> = (0..n).collect();
        if two_m == 0.0 {
            return (community, false);
        }

        let mut totals = degrees.clone();
        let mut moved_any = false;

        for _ in 0..MAX_PASSES {
            let mut moved = false;
            for i in 0..n {
                let k_i = degrees[i];
                let current = community[i];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for (&j, &w) in &self.adj[i] {
                    *links.entry(community[j]).or_insert(0.0) += w;
                }

                totals[current] -= k_i;
                let gain = |c: usize, w: f64| w - resolution * totals[c] * k_i / two_m;

                let mut best = current;
                let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
                for (&c, &w) in &links {
                    let g = gain(c, w);
                    if g > best_gain + MIN_GAIN {
                        best = c;
                        best_gain = g;
                    }
                }
                totals[best] += k_i;

                if best != current {
                    community[i] = best;
                    moved = true;
                    moved_any = true;
                }
            }
            if !moved {
                break;
            }
        }

        (relabel(&community), moved_any)
    }

    /// Collapse each community into a single node.
    fn aggregate(&self, community: &[usize]) -> Self {
        let count = community.iter().max().map_or(0, |m| m + 1);
        let mut adj = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];

        for i in 0..self.len() {
            let ci = community[i];
            self_loops[ci] += self.self_loops[i];
            for (&j, &w) in &self.adj[i] {
                let cj = community[j];
                if ci == cj {
                    // each internal edge is seen from both ends
                    self_loops[ci] += w / 2.0;
                } else {
                    *adj[ci].entry(cj).or_insert(0.0) += w;
                }
            }
        }
        Self { adj, self_loops }
    }
}

fn relabel(community: &[usize]) -> Vec<usize> {
    let mut labels: HashMap<usize, usize> = HashMap::new();
    community
        .iter()
        .map(|c| {
            let next = labels.len();
            *labels.entry(*c).or_insert(next)
        })
        .collect()
}

/// Partition the repost network into communities.
///
/// Indices are dense from 0, numbered in order of each community's lowest
/// source id. `None` when the network has no edges.
pub fn louvain(network: &RepostNetwork, resolution: f64) -> Option<HashMap<SourceId, usize>> {
    if network.is_empty() {
        return None;
    }

    let mut level = Level::from_network(network);
    let mut membership: Vec<usize> = (0..level.len()).collect();

    loop {
        let (community, moved) = level.local_moving(resolution);
        if !moved {
            break;
        }
        for m in membership.iter_mut() {
            *m = community[*m];
        }
        let before = level.len();
        level = level.aggregate(&community);
        if level.len() <= 1 || level.len() >= before {
            break;
        }
    }

    let membership = relabel(&membership);
    Some(
        network
            .source_ids()
            .into_iter()
            .zip(membership)
            .collect(),
    )
}

/// Newman modularity of a partition over the undirected repost network.
pub fn modularity(
    network: &RepostNetwork,
    communities: &HashMap<SourceId, usize>,
    resolution: f64,
) -> f64 {
    let level = Level::from_network(network);
    let ids = network.source_ids();
    let degrees: Vec<f64> = (0..level.len()).map(|i| level.degree(i)).collect();
    let two_m: f64 = degrees.iter().sum();
    if two_m == 0.0 {
        return 0.0;
    }

    let community_of = |i: usize| communities.get(&ids[i]).copied();
    let mut internal: HashMap<usize, f64> = HashMap::new();
    let mut totals: HashMap<usize, f64> = HashMap::new();
    for i in 0..level.len() {
        let Some(ci) = community_of(i) else {
            continue;
        };
        *totals.entry(ci).or_insert(0.0) += degrees[i];
        for (&j, &w) in &level.adj[i] {
            if community_of(j) == Some(ci) {
                *internal.entry(ci).or_insert(0.0) += w;
            }
        }
    }

    totals
        .iter()
        .map(|(c, tot)| {
            let inside = internal.get(c).copied().unwrap_or(0.0);
            inside / two_m - resolution * (tot / two_m).powi(2)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(edges: &[(SourceId, SourceId, f64)]) -> RepostNetwork {
        let weights: BTreeMap<(SourceId, SourceId), f64> =
            edges.iter().map(|&(a, b, w)| ((a, b), w)).collect();
        RepostNetwork::from_weights(&weights)
    }

    #[test]
    fn empty_network_has_no_communities() {
        assert!(louvain(&RepostNetwork::default(), 1.0).is_none());
    }

    #[test]
    fn two_dense_groups_split_on_weak_bridge() {
        let net = network(&[
            (1, 2, 5.0),
            (2, 3, 5.0),
            (3, 1, 5.0),
            (4, 5, 5.0),
            (5, 6, 5.0),
            (6, 4, 5.0),
            (3, 4, 1.0),
        ]);
        let communities = louvain(&net, 1.0).unwrap();

        assert_eq!(communities[&1], 0);
        assert_eq!(communities[&2], 0);
        assert_eq!(communities[&3], 0);
        assert_eq!(communities[&4], 1);
        assert_eq!(communities[&5], 1);
        assert_eq!(communities[&6], 1);
        assert!(modularity(&net, &communities, 1.0) > 0.3);
    }

    #[test]
    fn indices_follow_lowest_source_id() {
        let net = network(&[(20, 21, 3.0), (21, 20, 3.0), (7, 8, 3.0), (8, 7, 3.0)]);
        let communities = louvain(&net, 1.0).unwrap();

        assert_eq!(communities[&7], 0);
        assert_eq!(communities[&8], 0);
        assert_eq!(communities[&20], 1);
        assert_eq!(communities[&21], 1);
    }

    #[test]
    fn every_connected_source_is_assigned() {
        let net = network(&[(1, 2, 1.0), (3, 4, 1.0), (2, 3, 1.0)]);
        let communities = louvain(&net, 1.0).unwrap();
        assert_eq!(communities.len(), 4);

        let mut indices: Vec<usize> = communities.values().copied().collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices, (0..indices.len()).collect::<Vec<_>>());
    }

    #[test]
    fn louvain_does_not_lower_modularity() {
        let net = network(&[(1, 2, 2.0), (2, 3, 1.0), (3, 4, 2.0), (4, 1, 1.0), (1, 3, 1.0)]);
        let singletons: HashMap<SourceId, usize> =
            net.source_ids().into_iter().enumerate().map(|(i, s)| (s, i)).collect();
        let communities = louvain(&net, 1.0).unwrap();
        assert!(modularity(&net, &communities, 1.0) >= modularity(&net, &singletons, 1.0));
    }
}

//! Source influence over the repost network: PageRank and betweenness.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::Serialize;

use fakecheck_common::SourceId;

use crate::corpus_graph::RepostNetwork;

const PAGERANK_TOLERANCE: f64 = 1e-6;
const PAGERANK_MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InfluenceScores {
    pub pagerank: HashMap<SourceId, f64>,
    pub centrality: HashMap<SourceId, f64>,
}

impl InfluenceScores {
    pub fn compute(network: &RepostNetwork, damping: f64) -> Option<Self> {
        if network.is_empty() {
            return None;
        }
        Some(Self {
            pagerank: pagerank(network, damping),
            centrality: betweenness(network),
        })
    }

    /// Sources by descending PageRank, ties by ascending id.
    pub fn ranked(&self) -> Vec<(SourceId, f64)> {
        let mut out: Vec<(SourceId, f64)> = self.pagerank.iter().map(|(s, r)| (*s, *r)).collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        out
    }
}

/// Weighted PageRank. Rank flows from a reposting source to the source it
/// reposted; sources with no outgoing reposts spread their rank uniformly.
pub fn pagerank(network: &RepostNetwork, damping: f64) -> HashMap<SourceId, f64> {
    let n = network.node_count();
    if n == 0 {
        return HashMap::new();
    }
    let n_f = n as f64;

    let mut out_weight = vec![0.0; n];
    let edges: Vec<(usize, usize, f64)> = network.weighted_edges().collect();
    for &(from, _, w) in &edges {
        out_weight[from] += w;
    }

    let mut rank = vec![1.0 / n_f; n];
    for _ in 0..PAGERANK_MAX_ITERATIONS {
        let dangling: f64 = (0..n).filter(|&i| out_weight[i] == 0.0).map(|i| rank[i]).sum();
        let base = (1.0 - damping) / n_f + damping * dangling / n_f;
        let mut next = vec![base; n];
        for &(from, to, w) in &edges {
            next[to] += damping * rank[from] * w / out_weight[from];
        }

        let err: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if err < n_f * PAGERANK_TOLERANCE {
            break;
        }
    }

    network.source_ids().into_iter().zip(rank).collect()
}

/// Brandes betweenness on the directed, unweighted repost network, normalized
/// by `(n - 1)(n - 2)`.
pub fn betweenness(network: &RepostNetwork) -> HashMap<SourceId, f64> {
    let graph = &network.graph;
    let n = graph.node_count();
    let mut centrality = vec![0.0; n];

    let successors: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            let mut s: Vec<usize> = graph
                .neighbors_directed(NodeIndex::new(i), Direction::Outgoing)
                .map(|j| j.index())
                .collect();
            s.sort_unstable();
            s.dedup();
            s
        })
        .collect();

    for s in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0; n];
        let mut dist: Vec<Option<usize>> = vec![None; n];
        sigma[s] = 1.0;
        dist[s] = Some(0);

        let mut queue = VecDeque::from([s]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = dist[v].unwrap_or(0);
            for &w in &successors[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for c in centrality.iter_mut() {
            *c *= scale;
        }
    }

    network.source_ids().into_iter().zip(centrality).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn network(edges: &[(SourceId, SourceId, f64)]) -> RepostNetwork {
        let weights: BTreeMap<(SourceId, SourceId), f64> =
            edges.iter().map(|&(a, b, w)| ((a, b), w)).collect();
        RepostNetwork::from_weights(&weights)
    }

    #[test]
    fn empty_network_has_no_influence() {
        assert!(InfluenceScores::compute(&RepostNetwork::default(), 0.85).is_none());
    }

    #[test]
    fn pagerank_sums_to_one_and_favors_the_reposted() {
        // 2, 3 and 4 all repost 1
        let net = network(&[(2, 1, 1.0), (3, 1, 2.0), (4, 1, 1.0), (4, 3, 1.0)]);
        let pr = pagerank(&net, 0.85);

        let total: f64 = pr.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(pr[&1] > pr[&2]);
        assert!(pr[&1] > pr[&3]);
        assert!(pr[&3] > pr[&2]);
    }

    #[test]
    fn pagerank_of_a_two_cycle_is_even() {
        let net = network(&[(1, 2, 1.0), (2, 1, 1.0)]);
        let pr = pagerank(&net, 0.85);
        assert!((pr[&1] - 0.5).abs() < 1e-9);
        assert!((pr[&2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn betweenness_of_a_path_peaks_in_the_middle() {
        let net = network(&[(1, 2, 1.0), (2, 3, 1.0)]);
        let bc = betweenness(&net);

        // one pair (1 -> 3) goes through 2, normalized by (3-1)(3-2)
        assert!((bc[&2] - 0.5).abs() < 1e-12);
        assert_eq!(bc[&1], 0.0);
        assert_eq!(bc[&3], 0.0);
    }

    #[test]
    fn betweenness_splits_over_equal_paths() {
        let net = network(&[(1, 2, 1.0), (1, 3, 1.0), (2, 4, 1.0), (3, 4, 1.0)]);
        let bc = betweenness(&net);
        assert!((bc[&2] - bc[&3]).abs() < 1e-12);
        assert!((bc[&2] - 0.5 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn ranked_orders_by_pagerank() {
        let net = network(&[(2, 1, 1.0), (3, 1, 1.0)]);
        let scores = InfluenceScores::compute(&net, 0.85).unwrap();
        assert_eq!(scores.ranked()[0].0, 1);
    }
}

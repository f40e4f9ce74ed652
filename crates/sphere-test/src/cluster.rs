//! Greedy hierarchical merging of overlapping sphere gene sets.

use std::collections::BTreeSet;

use rayon::prelude::*;

/// A set of gene indices.
pub type GeneSet = BTreeSet<usize>;

/// `|a ∩ b| / min(|a|, |b|)`; 0 when either set is empty.
pub fn overlap_ratio(a: &GeneSet, b: &GeneSet) -> f64 {
    let min_size = a.len().min(b.len());
    if min_size == 0 {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let common = small.iter().filter(|g| large.contains(g)).count();
    common as f64 / min_size as f64
}

/// Result of [`cluster_by_gene_overlap`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterOutcome {
    /// Clusters at the fixed point, possibly sharing genes.
    pub clusters: Vec<GeneSet>,
    /// Highest pairwise overlap ratio seen in the final scan.
    pub max_overlap_ratio: f64,
    /// Number of merges performed.
    pub merges: usize,
}

/// Repeatedly merge the most-overlapping pair of clusters while its overlap
/// ratio is at least `overlap_threshold`.
///
/// Ties go to the first pair in scan order (lowest `i`, then lowest `j`).
/// Stops when fewer than two clusters remain or the best ratio falls below
/// the threshold.
pub fn cluster_by_gene_overlap<I>(gene_sets: I, overlap_threshold: f64) -> ClusterOutcome
where
    I: IntoIterator<Item = GeneSet>,
{
    let mut clusters: Vec<GeneSet> = gene_sets.into_iter().collect();
    let mut merges = 0;

    loop {
        let Some((i, j, ratio)) = best_pair(&clusters) else {
            return ClusterOutcome {
                clusters,
                max_overlap_ratio: 0.0,
                merges,
            };
        };

        if ratio < overlap_threshold {
            return ClusterOutcome {
                clusters,
                max_overlap_ratio: ratio,
                merges,
            };
        }

        // i < j: remove the later one first so i still points at its cluster.
        let second = clusters.swap_remove(j);
        let mut first = clusters.swap_remove(i);
        first.extend(second);
        clusters.push(first);
        merges += 1;
    }
}

/// The pair with maximum overlap ratio, or `None` for fewer than two clusters.
fn best_pair(clusters: &[GeneSet]) -> Option<(usize, usize, f64)> {
    if clusters.len() < 2 {
        return None;
    }

    // Best partner for each row in parallel, then an ordered reduction so the
    // earliest pair wins ties regardless of scheduling.
    let rows: Vec<Option<(usize, f64)>> = (0..clusters.len() - 1)
        .into_par_iter()
        .map(|i| {
            let mut best: Option<(usize, f64)> = None;
            for j in (i + 1)..clusters.len() {
                let ratio = overlap_ratio(&clusters[i], &clusters[j]);
                if best.map_or(true, |(_, r)| ratio > r) {
                    best = Some((j, ratio));
                }
            }
            best
        })
        .collect();

    let mut best: Option<(usize, usize, f64)> = None;
    for (i, row) in rows.into_iter().enumerate() {
        if let Some((j, ratio)) = row {
            if best.map_or(true, |(_, _, r)| ratio > r) {
                best = Some((i, j, ratio));
            }
        }
    }
    best
}

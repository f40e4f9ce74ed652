//! Concrete sphere tests.
//!
//! Each test pairs a gene payload type with a [`sphere_test::SphereStatistic`].

mod motif;
mod profile;
mod scalar;
mod taxon;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FieldsError;

pub use motif::{MotifGene, MotifSet, MotifSimilarity};
pub use profile::{profile_distance, ProfileDistance, ProfileGene};
pub use scalar::{ScalarGene, ScalarSpread, REPLICATION_MIN_ORDER_GAP};
pub use taxon::{TaxonEnrichment, TaxonFrequencies, TaxonGene};

/// The tests this application knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    /// Species-count spread, low is extreme.
    Conservation,
    /// Maximum taxon log enrichment, high is extreme.
    Taxon,
    /// Mean pairwise motif Jaccard distance, two-tailed.
    MotifDistance,
    /// Mean pairwise motif Jaccard index, high is extreme.
    MotifIndex,
    /// Mean pairwise histone profile distance, low is extreme.
    Promoter,
    /// Replication-timing spread, high is extreme.
    ReplicationTiming,
}

impl TestKind {
    pub const ALL: [TestKind; 6] = [
        TestKind::Conservation,
        TestKind::Taxon,
        TestKind::MotifDistance,
        TestKind::MotifIndex,
        TestKind::Promoter,
        TestKind::ReplicationTiming,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Conservation => "conservation",
            TestKind::Taxon => "taxon",
            TestKind::MotifDistance => "motif-distance",
            TestKind::MotifIndex => "motif-index",
            TestKind::Promoter => "promoter",
            TestKind::ReplicationTiming => "replication-timing",
        }
    }

    /// Default name of the field table a run of this test produces.
    pub fn fields_name(self) -> &'static str {
        match self {
            TestKind::Conservation => "ConservationFields",
            TestKind::Taxon => "TaxonFields",
            TestKind::MotifDistance => "MotifFields",
            TestKind::MotifIndex => "JaccardIndexMotifFields",
            TestKind::Promoter => "PromoterFields",
            TestKind::ReplicationTiming => "ReplicationTimingFields",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = FieldsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| FieldsError::UnknownTest(s.to_string()))
    }
}

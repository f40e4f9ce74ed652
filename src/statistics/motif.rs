//! Transcription-factor motif similarity between genes.

use glam::Vec3;
use sphere_test::{mean_pairwise, Gene, Polarity, SphereStatistic, SphereTestError, Tails};

/// Fixed-width set of motif flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MotifSet {
    width: usize,
    words: Vec<u64>,
}

impl MotifSet {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            words: vec![0; width.div_ceil(64)],
        }
    }

    pub fn from_flags(flags: &[bool]) -> Self {
        let mut set = Self::new(flags.len());
        for (i, &flag) in flags.iter().enumerate() {
            if flag {
                set.insert(i);
            }
        }
        set
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Set motif `i`. Panics when `i >= width`.
    pub fn insert(&mut self, i: usize) {
        assert!(i < self.width, "motif {} out of range 0..{}", i, self.width);
        self.words[i / 64] |= 1 << (i % 64);
    }

    pub fn contains(&self, i: usize) -> bool {
        i < self.width && self.words[i / 64] & (1 << (i % 64)) != 0
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// `|a ∩ b| / |a ∪ b|`, 0 when both sets are empty.
    pub fn jaccard_index(&self, other: &Self) -> Result<f64, SphereTestError> {
        if self.width != other.width {
            return Err(SphereTestError::size_mismatch(
                "motif set width",
                self.width,
                other.width,
            ));
        }
        let (mut common, mut union) = (0u32, 0u32);
        for (a, b) in self.words.iter().zip(&other.words) {
            common += (a & b).count_ones();
            union += (a | b).count_ones();
        }
        if union == 0 {
            return Ok(0.0);
        }
        Ok(common as f64 / union as f64)
    }

    /// `1 - jaccard_index`.
    pub fn jaccard_distance(&self, other: &Self) -> Result<f64, SphereTestError> {
        Ok(1.0 - self.jaccard_index(other)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotifGene {
    pub name: String,
    pub position: Vec3,
    pub motifs: MotifSet,
}

impl Gene for MotifGene {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotifMeasure {
    Index,
    Distance,
}

/// Mean pairwise Jaccard similarity (or distance) of motif sets.
#[derive(Debug, Clone)]
pub struct MotifSimilarity {
    measure: MotifMeasure,
}

impl MotifSimilarity {
    /// Mean pairwise Jaccard distance, two-tailed: spheres with unusually
    /// similar or unusually dissimilar motif content both stand out.
    pub fn jaccard_distance() -> Self {
        Self {
            measure: MotifMeasure::Distance,
        }
    }

    /// Mean pairwise Jaccard index; high shared motif content stands out.
    pub fn jaccard_index() -> Self {
        Self {
            measure: MotifMeasure::Index,
        }
    }
}

impl SphereStatistic<MotifGene> for MotifSimilarity {
    fn description(&self) -> &str {
        match self.measure {
            MotifMeasure::Index => "Average Jaccard index of TF motifs",
            MotifMeasure::Distance => "Average Jaccard distance of TF motifs",
        }
    }

    fn statistic(&self, genes: &[&MotifGene]) -> Result<f64, SphereTestError> {
        match self.measure {
            MotifMeasure::Index => mean_pairwise(genes, |a, b| a.motifs.jaccard_index(&b.motifs)),
            MotifMeasure::Distance => {
                mean_pairwise(genes, |a, b| a.motifs.jaccard_distance(&b.motifs))
            }
        }
    }

    fn polarity(&self) -> Polarity {
        match self.measure {
            MotifMeasure::Index => Polarity::Greater,
            MotifMeasure::Distance => Polarity::Less,
        }
    }

    fn tails(&self) -> Tails {
        match self.measure {
            MotifMeasure::Index => Tails::One,
            MotifMeasure::Distance => Tails::Two,
        }
    }
}

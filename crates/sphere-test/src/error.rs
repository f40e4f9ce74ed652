//! Error types for the sphere test.

use thiserror::Error;

/// Errors that can occur while sampling, testing or clustering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SphereTestError {
    /// A statistic was asked to summarize zero genes.
    #[error("empty gene list provided to the test statistic")]
    EmptyGeneSet,

    /// Two collections that must line up do not.
    #[error("{what}: expected {expected}, got {actual}")]
    SizeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Rejection sampling ran out of attempts before collecting enough spheres.
    #[error(
        "sampling exhausted after {attempts} attempts: accepted {accepted} of {target} spheres"
    )]
    SamplingExhausted {
        accepted: usize,
        target: usize,
        attempts: usize,
    },

    /// A sampler was built over an empty pool of genes.
    #[error("cannot sample from an empty gene pool")]
    EmptyPool,

    /// A contiguous window does not fit in the pool.
    #[error("window of {window} genes does not fit in a pool of {pool}")]
    WindowTooLarge { window: usize, pool: usize },

    /// Two genes share the same name.
    #[error("duplicate gene name: {0}")]
    DuplicateGene(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Gene payloads that a statistic cannot interpret.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SphereTestError {
    /// Shorthand for [`SphereTestError::SizeMismatch`].
    pub fn size_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_message_names_both_sizes() {
        let err = SphereTestError::size_mismatch("profile length of YAL001C", 9, 7);
        assert_eq!(err.to_string(), "profile length of YAL001C: expected 9, got 7");
    }
}

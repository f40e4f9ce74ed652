//! Gene fields: spatial sphere tests over genes in a 3D genome model.
//!
//! The statistical engine lives in the `sphere-test` crate. This crate adds
//! the concrete tests, tab-separated inputs and outputs, a synthetic
//! population generator and the end-to-end pipeline behind the
//! `gene-fields` binary.

pub mod error;
pub mod input;
pub mod pipeline;
pub mod report;
pub mod statistics;
pub mod synthetic;
pub mod util;

pub use error::{FieldsError, Result};
pub use pipeline::{run, run_test, PopulationSource, RunOptions, RunReport};
pub use statistics::TestKind;

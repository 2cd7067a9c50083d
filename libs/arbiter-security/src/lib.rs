#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod subject;

pub use subject::{Subject, SubjectBuilder};

//! Feature derivation and the fitted feature transformer.
//!
//! `damage` and `temporal` run on raw training rows only; `transformer` runs
//! on both the training and the serving path.

pub mod damage;
pub mod temporal;
pub mod transformer;

pub use damage::{parse_damage, ParsedDamage};
pub use temporal::TemporalFeatures;
pub use transformer::{FeatureTransformer, FeatureVector, FittedTransformer};

//! Labeled factor networks.
//!
//! A network is a set of tensor factors, each with one label per dimension,
//! plus the order of the output labels. Labels shared by two dimensions are
//! contracted; labels occurring once are free and survive to the output.

mod builder;
mod label;
mod labelset;
mod network;

pub use builder::{IndexGraphBuilder, from_ncon};
pub use label::{IndexLabel, labels};
pub use labelset::LabelSet;
pub use network::{ContractionNetwork, Factor, Labels, Occurrence};

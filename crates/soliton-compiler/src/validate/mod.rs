//! Validation of the analysed model.

mod references;
mod structure;

pub use references::validate_relations;
pub use structure::validate_structure;

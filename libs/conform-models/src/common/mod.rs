mod complex;
mod element_definition;
mod error;
mod structure_definition;

pub use complex::*;
pub use element_definition::*;
pub use error::*;
pub use structure_definition::*;

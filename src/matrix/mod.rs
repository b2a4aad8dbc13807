pub mod csc;
pub mod error;

pub use csc::{CooBuilder, SymmetricCsc, expand_to_full_with_sources};
pub use error::CscError;

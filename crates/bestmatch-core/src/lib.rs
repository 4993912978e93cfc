pub mod corpus;
pub mod error;

pub use corpus::*;
pub use error::CorpusError;

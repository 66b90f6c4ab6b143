pub mod executor;
pub mod index;
pub mod query;
pub mod traverse;

pub use executor::Executor;
pub use index::TripleIndex;
pub use query::Query;

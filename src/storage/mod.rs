pub mod loader;

pub use loader::{load_file, load_str, write_triples, LoadFailure, LoadReport};

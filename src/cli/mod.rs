pub mod repl;

pub use repl::{print_entities, Repl};

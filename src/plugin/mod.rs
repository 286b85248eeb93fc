pub mod resolver;
pub mod scanner;
pub mod state;
pub mod sync;

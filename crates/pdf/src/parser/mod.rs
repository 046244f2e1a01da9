pub mod backend;
pub mod runs;

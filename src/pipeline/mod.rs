mod analyzer;
mod session;

pub use analyzer::{Analyzer, Extraction, TestGeneration};
pub use session::{Session, Step};

pub mod aha;
pub mod config;
pub mod summarizer;
pub mod sync;

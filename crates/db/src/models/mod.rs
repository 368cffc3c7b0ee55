pub mod config;
pub mod initiative;
pub mod sync_log;

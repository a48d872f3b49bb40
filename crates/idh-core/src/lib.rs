pub mod config;
pub mod logging;

pub mod buffer;
pub mod control;
pub mod identity;
pub mod retry;
pub mod scheduler;
pub mod storage;

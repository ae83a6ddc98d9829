pub mod config;
pub mod logging;

pub mod batch;
pub mod control;
pub mod download;
pub mod extract;
pub mod fetch;
pub mod naming;
pub mod source;
pub mod storage;

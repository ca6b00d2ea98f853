// src/system/mod.rs

pub mod compose;
pub mod executor;
pub mod transport;

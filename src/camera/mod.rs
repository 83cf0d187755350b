// Camera domain: raw frame types and capture sources.

pub mod backend;
pub mod error;
pub mod synthetic;
pub mod types;

pub mod error;
pub mod store;
pub mod types;

pub use error::SettingsError;
pub use store::SettingsStore;
pub use types::{EdgeSettings, PipelineSettings};

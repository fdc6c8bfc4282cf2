//! Pipeline module - load, reconcile, normalize, select and score debt records

pub mod cache;
pub mod config;
pub mod error;
pub mod features;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod record;
pub mod runner;
pub mod scorer;
pub mod target;

pub use cache::{Dataset, DatasetCache};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, Stage};
pub use features::*;
pub use loader::*;
pub use model::ModelBundle;
pub use normalize::*;
pub use reconcile::*;
pub use record::*;
pub use runner::{CleanedDataset, Pipeline};
pub use scorer::*;
pub use target::*;

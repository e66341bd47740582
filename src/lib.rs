//! Cleaning, filtering and aggregation of vector-control inspection exports.
//!
//! The pipeline is: [`loader`] reads and decodes the upload, [`normalize`]
//! types its columns, [`filters`] derives views (with optional
//! [`sectors`] unification), [`reports`] aggregates them and [`render`]
//! bounds what is surfaced for display. [`processor::DataProcessor`] ties
//! these together for one session.

pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod processor;
pub mod registry;
pub mod render;
pub mod reports;
pub mod schema;
pub mod sectors;
pub mod table;
pub mod types;
pub mod util;

pub use config::ProcessorConfig;
pub use error::{ProcessorError, Result};
pub use filters::{get_filtered_data, ActivityType, DateRange, FilterScalar, FilterSet, FilterValue};
pub use normalize::{normalize, NormalizeReport};
pub use processor::DataProcessor;
pub use render::{safe_render, RenderView, SafeRender};
pub use table::{Cell, Column, ColumnData, RawColumn, RawTable, Table};

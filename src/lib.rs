pub mod aging;
pub mod analysis;
pub mod bottleneck;
pub mod charts;
pub mod config;
pub mod error;
pub mod faker;
pub mod filter;
pub mod groups;
pub mod insights;
pub mod kpi;
pub mod logging;
pub mod reader;
pub mod reporter;
pub mod schema;
pub mod stats;

//! Publication metadata pipeline: normalize a local catalog, enrich it from the DOI
//! registry, derive per-surface views and format citations.

pub mod cite;
pub mod error;
pub mod identifier;
pub mod names;
pub mod normalize;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod surface;
pub mod view;

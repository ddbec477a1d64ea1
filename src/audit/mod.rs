//! Completeness aggregation engine.
//!
//! Equipment tables are normalized, every absent attribute value becomes a
//! [`types::MissingAttributeEntry`], entries from all tables are merged per
//! site, and each site receives a completeness rate and a quality tier.

pub mod aggregate;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod score;
pub mod tier;
pub mod types;
pub mod utility;

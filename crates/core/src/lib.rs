#![forbid(unsafe_code)]

//! Classification engine for the Snow-Town ecosystem dashboard.
//!
//! Everything in this crate is pure: counters in, discrete presentation
//! states out. Derived values (tiers, flow states, severities) are meant to be
//! recomputed from the latest snapshot on every render pass.

pub mod activity;
pub mod contracts;
pub mod error;
pub mod flow;
pub mod growth;
pub mod model;
pub mod routing;
pub mod scene;
pub mod status;
pub mod supersede;
pub mod timestamp;
pub mod topology;

pub use activity::{normalize_activity, truncate_feed};
pub use error::ContractViolation;
pub use flow::{
    EdgeFlowState, EdgeThresholds, aggregate_loop_health, classify_edge_state,
    loop_health_for_edges,
};
pub use growth::{GrowthTier, TierTable, classify_tier};
pub use routing::{NavTarget, route_event};
pub use scene::{HealthBanner, Scene, derive_scene};
pub use status::{Severity, SourceDot, map_status, source_dot, source_dots};
pub use supersede::{LatestWins, Ticket};
pub use timestamp::Timestamp;
pub use topology::{NodeStyle, node_style};

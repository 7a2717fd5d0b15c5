//! Hit-error bar core: timing windows, the tick pool, statistics and the
//! session that drives them from live telemetry.

pub mod backend;
pub mod config;
pub mod pool;
pub mod session;
pub mod stats;
pub mod timing;
pub mod types;
pub mod worker;
pub mod ws;

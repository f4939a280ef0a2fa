pub mod commit;
pub mod coupling;
pub mod hotspot;
pub mod metrics;
pub mod report;
pub mod request;

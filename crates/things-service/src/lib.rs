#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod things;

pub use things::ThingsService;

/// Tracing target for service-level operations.
pub const TRACING_TARGET_SERVICE: &str = "things_service::things";

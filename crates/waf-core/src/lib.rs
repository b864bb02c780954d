//! WAF Filter Core
//!
//! Lifecycle and request-inspection layer for the Envoy WAF filter.
//!
//! ## Components
//!
//! - **Config**: Plugin configuration decoding and validation
//! - **Engine**: Capability traits for the external rule engine
//! - **Controller**: Plugin-wide state machine owning engine, rule set and transaction
//! - **Request**: Per-request inspection hook
//!
//! The crate has no dependency on the proxy-wasm host; the
//! `waf-envoy-filter` crate adapts host callbacks onto it.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod request;

pub use config::{FailureMode, ReloadPolicy, WafConfig};
pub use controller::{ControllerState, WafController};
pub use engine::{
    ConnectionInfo, EngineBuilder, InspectedRequest, PassthroughEngine, RuleEngine, Transaction,
    Verdict,
};
pub use error::{ConfigError, EngineError, Result, WafError};
pub use request::{FilterAction, RequestContext, RequestHeaders, RequestPhase, DENY_STATUS};

//! One-shot connectivity probe for Arrow Flight endpoints.
//!
//! The probe parses an endpoint, connects, sends a single `DoGet` ticket,
//! reads the entire response into memory and reports its shape and schema.
//!
//! ## Example
//!
//! ```rust,ignore
//! use flight_probe::{report, run_probe, RequestDescriptor};
//!
//! let result = run_probe("grpc://localhost:8815", &RequestDescriptor::default()).await?;
//! report(&result);
//! # Ok::<(), flight_probe::ProbeError>(())
//! ```

pub mod arrow;
pub mod client;
pub mod config;
pub mod error;
pub mod location;
pub mod report;
pub mod request;

pub use client::{materialize_all, run_probe, FlightProbe, ResultSet};
pub use config::ProbeConfig;
pub use error::{ErrorKind, ProbeError};
pub use location::{parse_endpoint, Location, Transport};
pub use report::{render_report, report};
pub use request::{RequestDescriptor, DEFAULT_ACTION};

//! Region pollers and the multi-region aggregator.
//!
//! Everything provider-specific sits behind [`provider::RegionConnector`];
//! the AWS implementation lives in [`aws`] behind the `aws` feature.

pub mod aggregator;
#[cfg(feature = "aws")]
pub mod aws;
pub mod credentials;
pub mod provider;
pub mod region;

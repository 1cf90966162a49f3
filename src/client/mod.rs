//! HTTP plumbing shared by the platform backends.
//!
//! The fetcher walks every page of a list endpoint through the rate
//! governor, which enforces a global minimum spacing between outbound
//! requests regardless of which metric is being resolved.

mod fetcher;
mod rate;

pub use fetcher::{ApiClient, FetchError, PER_PAGE};
pub use rate::RateGovernor;

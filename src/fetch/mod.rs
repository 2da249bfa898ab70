//! Paced, retrying page retrieval: the rate gate, the blocking HTTP fetcher
//! and its error type.

pub mod client;
pub mod error;
pub mod gate;

pub use client::{Fetch, FetchedPage, HttpFetcher};
pub use error::FetchError;
pub use gate::{Deadline, RateGate};

pub mod types;
pub mod client;

pub use types::{is_loaded_status, FetchError, FetchResponse, HomepageFetcher};
pub use client::{FetcherConfig, HttpFetcher, CACHE_BUST_PARAM};

pub type Result<T> = std::result::Result<T, FetchError>;

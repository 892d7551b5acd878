pub mod client;
pub mod rate_limiter;
pub mod rows;

pub use client::PostgrestStore;

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod error;
#[cfg(test)]
pub mod fixtures;
pub mod normalize;
pub mod types;

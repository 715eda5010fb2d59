pub mod analysis;
pub mod config;
pub mod core;
pub mod feed;
pub mod models;
#[cfg(test)]
pub mod test_helpers;

pub mod categories;
pub mod features;
pub mod levels;
pub mod scoring;

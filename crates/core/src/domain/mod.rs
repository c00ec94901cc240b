pub mod investment;
pub mod narrative;
pub mod snapshot;

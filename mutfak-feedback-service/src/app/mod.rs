pub mod migrate;
pub mod relay;
pub mod sweep;

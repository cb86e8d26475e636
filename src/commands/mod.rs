/// Probe command functionality
pub mod probe;

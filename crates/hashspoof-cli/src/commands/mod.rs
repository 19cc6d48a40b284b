pub mod digest;
pub mod spoof;

pub mod spoof;

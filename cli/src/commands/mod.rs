pub mod config;
pub mod simulate;
pub mod table;
#[cfg(all(target_os = "linux", feature = "linux"))]
pub mod watch;

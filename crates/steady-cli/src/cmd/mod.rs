pub mod build;
pub mod transform;
pub mod watch;

pub mod init;
pub mod replay;
pub mod thread;

pub use init::{init, InitArgs};
pub use replay::{replay, ReplayArgs};
pub use thread::{thread, ThreadArgs};

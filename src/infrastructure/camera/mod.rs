//! Camera infrastructure module

mod command;
mod file;

pub use command::CommandCamera;
pub use file::FileCamera;

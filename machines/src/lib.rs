pub mod apple1;
pub mod telnet;

pub use apple1::{Apple1Config, Apple1System, LoadImage, MachineError};
pub use telnet::TelnetServer;

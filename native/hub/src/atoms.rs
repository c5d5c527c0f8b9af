// L4 原子层模块入口

pub mod host;
pub mod interface_settings;
pub mod network_interfaces;

pub use host::{ExecOutput, FileStat, Host, LocalHost, run_checked};
pub use interface_settings::{InterfaceMode, Settings};
pub use network_interfaces::{InterfaceCategory, InterfaceDescriptor};

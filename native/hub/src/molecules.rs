// L3 分子层模块入口

pub mod core_update;
pub mod interface_management;
pub mod local_servers;
pub mod log_viewer;
pub mod rule_lists;

pub use core_update::{KernelManager, KernelReport, KernelStatus};
pub use interface_management::{InterfaceManager, InterfaceOverview};
pub use local_servers::LocalServers;
pub use log_viewer::{LogTail, LogUpdate};
pub use rule_lists::{RuleList, RuleLists};

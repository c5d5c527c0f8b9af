// L2 协调层模块入口

pub mod panel_coordinator;

pub use panel_coordinator::PanelCoordinator;

// Clash 守护进程相关服务
//
// - service：通过 ubus 与 init.d 脚本控制系统服务
// - config：配置文件读写与控制面板地址

pub mod config;
pub mod service;

pub use config::{ClashConfig, ControllerSettings, dashboard_url};
pub use service::{ServiceAction, ServiceController, ToggleOutcome};

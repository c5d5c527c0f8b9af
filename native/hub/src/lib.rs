// SSClash 面板核心库
//
// 分层结构：
// - atoms：原子层，纯逻辑与宿主抽象（接口分类、设置编解码、自动探测）
// - molecules：分子层，组合原子完成具体业务（接口选择、规则列表、核心更新）
// - clash：代理守护进程相关服务（系统服务控制、配置文件）
// - services：路径与运行配置
// - coordinator：显式状态句柄，串联以上各层

pub mod atoms;
pub mod clash;
pub mod coordinator;
pub mod error;
pub mod molecules;
pub mod services;

pub use coordinator::PanelCoordinator;
pub use error::{HubError, HubResult};

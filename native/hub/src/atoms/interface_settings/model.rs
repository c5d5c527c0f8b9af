// 接口设置数据模型

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// 接口处理模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceMode {
    // 处理所有接口，列表中的接口直连绕过代理
    #[default]
    Exclude,
    // 只处理列表中的接口
    Explicit,
}

impl InterfaceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InterfaceMode::Exclude => "exclude",
            InterfaceMode::Explicit => "explicit",
        }
    }

    // 每种模式对应的自动探测器：排除模式探测 WAN，显式模式探测 LAN
    pub fn auto_detect_kind(self) -> AutoDetectKind {
        match self {
            InterfaceMode::Exclude => AutoDetectKind::Wan,
            InterfaceMode::Explicit => AutoDetectKind::Lan,
        }
    }
}

impl fmt::Display for InterfaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "exclude" => Ok(InterfaceMode::Exclude),
            "explicit" => Ok(InterfaceMode::Explicit),
            other => Err(format!("未知的接口模式：{}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoDetectKind {
    Lan,
    Wan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub mode: InterfaceMode,
    pub auto_detect_lan: bool,
    pub auto_detect_wan: bool,
    pub block_quic: bool,
    pub detected_lan: String,
    pub detected_wan: String,
    pub included_interfaces: Vec<String>,
    pub excluded_interfaces: Vec<String>,
    pub enable_hwid: bool,
    pub hwid_user_agent: String,
    pub hwid_device_os: String,
}

pub const DEFAULT_HWID_USER_AGENT: &str = "SSClash";
pub const DEFAULT_HWID_DEVICE_OS: &str = "OpenWrt";

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: InterfaceMode::Exclude,
            auto_detect_lan: true,
            auto_detect_wan: true,
            block_quic: true,
            detected_lan: String::new(),
            detected_wan: String::new(),
            included_interfaces: Vec::new(),
            excluded_interfaces: Vec::new(),
            enable_hwid: false,
            hwid_user_agent: DEFAULT_HWID_USER_AGENT.to_string(),
            hwid_device_os: DEFAULT_HWID_DEVICE_OS.to_string(),
        }
    }
}

impl Settings {
    pub fn auto_detect_enabled(&self, kind: AutoDetectKind) -> bool {
        match kind {
            AutoDetectKind::Lan => self.auto_detect_lan,
            AutoDetectKind::Wan => self.auto_detect_wan,
        }
    }

    // 上次保存时记录的探测结果，空字符串视为未探测到
    pub fn detected(&self, kind: AutoDetectKind) -> Option<&str> {
        let name = match kind {
            AutoDetectKind::Lan => self.detected_lan.as_str(),
            AutoDetectKind::Wan => self.detected_wan.as_str(),
        };
        (!name.is_empty()).then_some(name)
    }

    // 指定模式下手动维护的接口列表
    pub fn manual_list(&self, mode: InterfaceMode) -> &[String] {
        match mode {
            InterfaceMode::Explicit => &self.included_interfaces,
            InterfaceMode::Exclude => &self.excluded_interfaces,
        }
    }

    // 当前模式下的接口列表
    pub fn active_list(&self) -> &[String] {
        self.manual_list(self.mode)
    }
}

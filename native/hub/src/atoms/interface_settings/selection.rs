// 有效接口集计算
//
// 排除模式：有效集合中的接口绕过代理直连
// 显式模式：有效集合中的接口是代理唯一处理的接口
//
// 自动探测启用时，探测到的接口隐式属于有效集合，但不会写入手动列表

use super::model::{
    AutoDetectKind, DEFAULT_HWID_DEVICE_OS, DEFAULT_HWID_USER_AGENT, InterfaceMode, Settings,
};
use crate::atoms::network_interfaces::DetectedInterfaces;
use crate::error::{HubError, HubResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveInterfaces {
    pub mode: InterfaceMode,
    // 手动选择的接口（不含自动探测到的接口）
    pub manual: Vec<String>,
    // 自动探测到的接口
    pub automatic: Option<String>,
}

impl EffectiveInterfaces {
    pub fn names(&self) -> BTreeSet<String> {
        self.manual
            .iter()
            .cloned()
            .chain(self.automatic.iter().cloned())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.is_automatic(name) || self.manual.iter().any(|n| n == name)
    }

    pub fn is_automatic(&self, name: &str) -> bool {
        self.automatic.as_deref() == Some(name)
    }
}

fn dedup_preserving_order(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| !name.is_empty() && seen.insert(name.as_str()))
        .cloned()
        .collect()
}

// 从选择中剔除自动探测到的接口，得到需要持久化的手动列表
pub fn strip_automatic(selection: &[String], detected: Option<&str>) -> Vec<String> {
    let manual = dedup_preserving_order(selection);
    match detected.filter(|name| !name.is_empty()) {
        Some(detected) => manual.into_iter().filter(|name| name != detected).collect(),
        None => manual,
    }
}

pub fn effective_interfaces(
    mode: InterfaceMode,
    manual: &[String],
    auto_detect_enabled: bool,
    detected: Option<&str>,
) -> EffectiveInterfaces {
    let automatic = detected
        .filter(|name| auto_detect_enabled && !name.is_empty())
        .map(str::to_string);

    EffectiveInterfaces {
        mode,
        manual: strip_automatic(manual, automatic.as_deref()),
        automatic,
    }
}

impl Settings {
    pub fn effective_interfaces(&self) -> EffectiveInterfaces {
        let kind = self.mode.auto_detect_kind();
        effective_interfaces(
            self.mode,
            self.active_list(),
            self.auto_detect_enabled(kind),
            self.detected(kind),
        )
    }

    // 切换到指定模式时应勾选的接口：该模式的手动列表加上记录的探测结果
    pub fn selection_for_mode(&self, mode: InterfaceMode) -> Vec<String> {
        let mut selection = self.manual_list(mode).to_vec();
        if let Some(detected) = self.detected(mode.auto_detect_kind())
            && !selection.iter().any(|name| name == detected)
        {
            selection.push(detected.to_string());
        }
        selection
    }
}

// 保存前由界面状态收集的设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDraft {
    pub mode: InterfaceMode,
    pub auto_detect_lan: bool,
    pub auto_detect_wan: bool,
    pub block_quic: bool,
    // 当前勾选的接口，可能包含自动探测到的接口
    pub selection: Vec<String>,
    pub enable_hwid: bool,
    pub hwid_user_agent: String,
    pub hwid_device_os: String,
}

impl SettingsDraft {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            mode: settings.mode,
            auto_detect_lan: settings.auto_detect_lan,
            auto_detect_wan: settings.auto_detect_wan,
            block_quic: settings.block_quic,
            selection: settings.selection_for_mode(settings.mode),
            enable_hwid: settings.enable_hwid,
            hwid_user_agent: settings.hwid_user_agent.clone(),
            hwid_device_os: settings.hwid_device_os.clone(),
        }
    }

    pub fn set_auto_detect(&mut self, kind: AutoDetectKind, enabled: bool) {
        match kind {
            AutoDetectKind::Lan => self.auto_detect_lan = enabled,
            AutoDetectKind::Wan => self.auto_detect_wan = enabled,
        }
    }

        // 设置文件按行、列表按逗号切分，含这些字符的值无法原样读回
    pub fn validate(&self) -> HubResult<()> {
        for name in &self.selection {
            validate_interface_name(name)?;
        }
        validate_text("HWID User-Agent", &self.hwid_user_agent)?;
        validate_text("HWID 设备系统", &self.hwid_device_os)
    }

    // 生成待保存的设置：记录本次探测结果，剔除当前模式的自动接口，清空非当前模式的列表
    pub fn into_settings(self, detected: &DetectedInterfaces) -> Settings {
        let detected_lan = if self.auto_detect_lan {
            detected.lan.clone().unwrap_or_default()
        } else {
            String::new()
        };
        let detected_wan = if self.auto_detect_wan {
            detected.wan.clone().unwrap_or_default()
        } else {
            String::new()
        };

        let automatic = match self.mode.auto_detect_kind() {
            AutoDetectKind::Lan => detected_lan.as_str(),
            AutoDetectKind::Wan => detected_wan.as_str(),
        };
        let manual = strip_automatic(&self.selection, Some(automatic));

        let (included_interfaces, excluded_interfaces) = match self.mode {
            InterfaceMode::Explicit => (manual, Vec::new()),
            InterfaceMode::Exclude => (Vec::new(), manual),
        };

        Settings {
            mode: self.mode,
            auto_detect_lan: self.auto_detect_lan,
            auto_detect_wan: self.auto_detect_wan,
            block_quic: self.block_quic,
            detected_lan,
            detected_wan,
            included_interfaces,
            excluded_interfaces,
            enable_hwid: self.enable_hwid,
            hwid_user_agent: text_or_default(&self.hwid_user_agent, DEFAULT_HWID_USER_AGENT),
            hwid_device_os: text_or_default(&self.hwid_device_os, DEFAULT_HWID_DEVICE_OS),
        }
    }
}

// 空值回退为默认值
pub(crate) fn text_or_default(value: &str, default: &str) -> String {
    match value.trim() {
        "" => default.to_string(),
        trimmed => trimmed.to_string(),
    }
}

// 接口名不能为空，不能含逗号、等号或空白
pub fn validate_interface_name(name: &str) -> HubResult<()> {
    if name.is_empty() || name.chars().any(|c| c == ',' || c == '=' || c.is_whitespace()) {
        return Err(HubError::InvalidInput(format!("非法的接口名：{:?}", name)));
    }
    Ok(())
}

fn validate_text(field: &str, value: &str) -> HubResult<()> {
    if value.contains(['\n', '\r']) {
        return Err(HubError::InvalidInput(format!("{}不能包含换行", field)));
    }
    Ok(())
}

// 列表文件：每行一个接口名，非空时以换行结尾
pub fn encode_interface_list(names: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }
    let mut content = names.join("\n");
    content.push('\n');
    content
}

pub fn decode_interface_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

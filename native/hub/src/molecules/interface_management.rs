// 接口选择流程：加载接口与设置、保存、切换模式、关闭自动探测、状态摘要

use crate::atoms::host::Host;
use crate::atoms::interface_settings::{
    AutoDetectKind, EffectiveInterfaces, InterfaceMode, Settings, SettingsDraft, SettingsStore,
    validate_interface_name,
};
use crate::atoms::network_interfaces::{
    DetectedInterfaces, DetectionPolicy, InterfaceDescriptor, InterfaceDetector, discover_interfaces,
};
use crate::error::HubResult;
use crate::services::PathService;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceOverview {
    pub interfaces: Vec<InterfaceDescriptor>,
    pub settings: Settings,
    // 当前模式下应勾选的接口
    pub selection: Vec<String>,
    pub effective: EffectiveInterfaces,
}

pub struct InterfaceManager<'a, H: Host + ?Sized> {
    host: &'a H,
    paths: &'a PathService,
    policy: &'a DetectionPolicy,
}

impl<'a, H: Host + ?Sized> InterfaceManager<'a, H> {
    pub fn new(host: &'a H, paths: &'a PathService, policy: &'a DetectionPolicy) -> Self {
        Self {
            host,
            paths,
            policy,
        }
    }

    fn store(&self) -> SettingsStore<'a, H> {
        SettingsStore::new(self.host, self.paths)
    }

    fn detector(&self) -> InterfaceDetector<'a, H> {
        InterfaceDetector::new(self.host, self.paths.route_table(), self.policy)
    }

    // 接口枚举与设置读取并行进行
    pub async fn load(&self) -> HubResult<InterfaceOverview> {
        let store = self.store();
        let (interfaces, settings) = tokio::join!(
            discover_interfaces(self.host, self.paths.sys_net_dir()),
            store.load()
        );
        let settings = settings?;

        Ok(InterfaceOverview {
            interfaces,
            selection: settings.selection_for_mode(settings.mode),
            effective: settings.effective_interfaces(),
            settings,
        })
    }

    pub async fn detect(&self) -> DetectedInterfaces {
        self.detector().detect_all().await
    }

    // 只运行已启用的探测器
    async fn detect_enabled(&self, draft: &SettingsDraft) -> DetectedInterfaces {
        let detector = self.detector();
        let lan = async {
            if draft.auto_detect_lan {
                detector.detect_lan().await
            } else {
                None
            }
        };
        let wan = async {
            if draft.auto_detect_wan {
                detector.detect_wan().await
            } else {
                None
            }
        };
        let (lan, wan) = tokio::join!(lan, wan);
        DetectedInterfaces { lan, wan }
    }

    // 保存前重新探测；写入失败时返回错误，调用方持有的设置保持不变
    pub async fn save(&self, draft: SettingsDraft) -> HubResult<Settings> {
        draft.validate()?;
        let detected = self.detect_enabled(&draft).await;
        let settings = draft.into_settings(&detected);
        self.store().save(&settings).await?;
        Ok(settings)
    }

    pub async fn load_exclusions(&self) -> HubResult<Vec<String>> {
        self.store().load_exclusion_list().await
    }

    pub async fn save_exclusions(&self, names: &[String]) -> HubResult<()> {
        for name in names {
            validate_interface_name(name)?;
        }
        self.store().save_exclusion_list(names).await
    }
}

// 切换模式后应勾选的接口
pub fn switch_mode(settings: &Settings, mode: InterfaceMode) -> Vec<String> {
    settings.selection_for_mode(mode)
}

// 关闭自动探测时，从当前选择中移除记录的探测结果
pub fn disable_auto_detect(settings: &Settings, kind: AutoDetectKind, selection: &[String]) -> Vec<String> {
    match settings.detected(kind) {
        Some(detected) => selection
            .iter()
            .filter(|name| name.as_str() != detected)
            .cloned()
            .collect(),
        None => selection.to_vec(),
    }
}

// 当前状态摘要
pub fn status_lines(settings: &Settings, selection: &[String]) -> Vec<String> {
    let kind = settings.mode.auto_detect_kind();
    let auto_enabled = settings.auto_detect_enabled(kind);
    let detected = settings.detected(kind);
    let label = match kind {
        AutoDetectKind::Lan => "LAN",
        AutoDetectKind::Wan => "WAN",
    };

    let mut lines = vec![match settings.mode {
        InterfaceMode::Explicit => "模式：显式（只处理选中的接口）".to_string(),
        InterfaceMode::Exclude => "模式：排除（处理除选中接口外的所有接口）".to_string(),
    }];

    if auto_enabled && let Some(detected) = detected {
        lines.push(format!("自动探测的 {}：{} ✓", label, detected));
    }

    let manual: Vec<&str> = selection
        .iter()
        .map(String::as_str)
        .filter(|name| Some(*name) != detected)
        .collect();
    if !manual.is_empty() {
        let title = match settings.mode {
            InterfaceMode::Explicit => "手动选择",
            InterfaceMode::Exclude => "手动排除",
        };
        lines.push(format!("{}：{}", title, manual.join(", ")));
    }

    if !auto_enabled && selection.is_empty() {
        lines.push(match settings.mode {
            InterfaceMode::Explicit => "未配置任何接口".to_string(),
            InterfaceMode::Exclude => "未配置任何排除项".to_string(),
        });
    }
    lines
}

// 探测提示
pub fn detection_hint(settings: &Settings) -> String {
    match (settings.mode, settings.detected(settings.mode.auto_detect_kind())) {
        (InterfaceMode::Explicit, Some(name)) => format!("可用的 LAN 网桥：{}", name),
        (InterfaceMode::Explicit, None) => "未探测到 LAN 网桥".to_string(),
        (InterfaceMode::Exclude, Some(name)) => format!("可用的 WAN 接口：{}", name),
        (InterfaceMode::Exclude, None) => "未探测到 WAN 接口".to_string(),
    }
}

// 设置持久化：设置文件与两个接口列表文件，整文件覆盖写入

use super::codec::{decode, encode};
use super::model::Settings;
use super::selection::{decode_interface_list, encode_interface_list};
use crate::atoms::host::Host;
use crate::error::{HubError, HubResult};
use crate::services::PathService;
use std::io;

pub struct SettingsStore<'a, H: Host + ?Sized> {
    host: &'a H,
    paths: &'a PathService,
}

impl<'a, H: Host + ?Sized> SettingsStore<'a, H> {
    pub fn new(host: &'a H, paths: &'a PathService) -> Self {
        Self { host, paths }
    }

    // 设置文件不存在时返回默认设置
    pub async fn load(&self) -> HubResult<Settings> {
        let path = self.paths.settings_file();
        match self.host.read_file(&path).await {
            Ok(content) => Ok(decode(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("设置文件不存在，使用默认设置：{}", path.display());
                Ok(Settings::default())
            }
            Err(e) => Err(HubError::persistence("读取设置", &path, e)),
        }
    }

    // 先写设置文件，再写两个列表文件；非当前模式的列表由调用方清空
    pub async fn save(&self, settings: &Settings) -> HubResult<()> {
        let path = self.paths.settings_file();
        self.host
            .write_file(&path, &encode(settings))
            .await
            .map_err(|e| HubError::persistence("写入设置", &path, e))?;

        let included = self.paths.included_list_file();
        self.host
            .write_file(&included, &encode_interface_list(&settings.included_interfaces))
            .await
            .map_err(|e| HubError::persistence("写入接口列表", &included, e))?;

        let excluded = self.paths.excluded_list_file();
        self.host
            .write_file(&excluded, &encode_interface_list(&settings.excluded_interfaces))
            .await
            .map_err(|e| HubError::persistence("写入接口列表", &excluded, e))?;

        log::info!(
            "接口设置已保存：模式 {}，包含 {} 个，排除 {} 个",
            settings.mode,
            settings.included_interfaces.len(),
            settings.excluded_interfaces.len()
        );
        Ok(())
    }

    // 旧版接口页面直接维护的排除列表
    pub async fn load_exclusion_list(&self) -> HubResult<Vec<String>> {
        let path = self.paths.excluded_list_file();
        let content = self
            .host
            .read_or_default(&path, "")
            .await
            .map_err(|e| HubError::persistence("读取排除列表", &path, e))?;
        Ok(decode_interface_list(&content))
    }

    pub async fn save_exclusion_list(&self, names: &[String]) -> HubResult<()> {
        let path = self.paths.excluded_list_file();
        self.host
            .write_file(&path, &encode_interface_list(names))
            .await
            .map_err(|e| HubError::persistence("写入排除列表", &path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::host::mock::MockHost;
    use crate::atoms::interface_settings::InterfaceMode;

    #[tokio::test]
    async fn test_missing_settings_file_yields_defaults() {
        let host = MockHost::new();
        let paths = PathService::default();
        let store = SettingsStore::new(&host, &paths);

        assert_eq!(store.load().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let host = MockHost::new().with_file(
            "/opt/clash/settings",
            "INTERFACE_MODE=explicit\nINCLUDED_INTERFACES=br-lan,wlan0\n",
        );
        let paths = PathService::default();
        let settings = SettingsStore::new(&host, &paths).load().await.unwrap();

        assert_eq!(settings.mode, InterfaceMode::Explicit);
        assert_eq!(settings.included_interfaces, vec!["br-lan", "wlan0"]);
        assert!(settings.auto_detect_wan);
        assert_eq!(settings.hwid_device_os, "OpenWrt");
    }

    #[tokio::test]
    async fn test_save_writes_settings_and_exclusive_lists() {
        let host = MockHost::new();
        let paths = PathService::default();
        let store = SettingsStore::new(&host, &paths);

        let settings = Settings {
            mode: InterfaceMode::Explicit,
            included_interfaces: vec!["wlan0".to_string(), "eth1".to_string()],
            ..Settings::default()
        };
        store.save(&settings).await.unwrap();

        assert_eq!(host.file("/opt/clash/included_interfaces").unwrap(), "wlan0\neth1\n");
        assert_eq!(host.file("/opt/clash/excluded_interfaces").unwrap(), "");
        assert_eq!(store.load().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_write_failure_is_persistence_error() {
        let host = MockHost::new().fail_writes_to("/opt/clash/settings");
        let paths = PathService::default();
        let store = SettingsStore::new(&host, &paths);

        let err = store.save(&Settings::default()).await.unwrap_err();
        assert_eq!(err.kind(), "Persistence");
        // 设置文件写入失败后不再写列表文件
        assert!(host.file("/opt/clash/excluded_interfaces").is_none());
    }

    #[tokio::test]
    async fn test_exclusion_list_round_trip() {
        let host = MockHost::new();
        let paths = PathService::default();
        let store = SettingsStore::new(&host, &paths);

        assert!(store.load_exclusion_list().await.unwrap().is_empty());
        store
            .save_exclusion_list(&["eth0".to_string(), "wan".to_string()])
            .await
            .unwrap();
        assert_eq!(store.load_exclusion_list().await.unwrap(), vec!["eth0", "wan"]);
    }
}

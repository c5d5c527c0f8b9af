// 内核管理分子模块：安装状态、版本探测、最新发布与下载安装

pub mod updater;

use crate::atoms::host::Host;
use crate::error::{HubError, HubResult};
use crate::services::PathService;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub use updater::{Architecture, GitHubAsset, GitHubRelease, map_architecture, resolve_architecture};

// 按优先级依次尝试的版本号模式
static VERSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Mihomo\s+Meta\s+(v[\d.]+)",
        r"(?i)Mihomo\s+[^v]*?(v[\d.]+)",
        r"(?i)(v\d+\.\d+\.\d+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static SEMVER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"v?(\d+\.\d+\.\d+)").ok());

pub const ACTION_DOWNLOAD_UPDATE: &str = "Download Update";
pub const ACTION_REINSTALL: &str = "Reinstall Kernel";
pub const ACTION_DOWNLOAD_LATEST: &str = "Download Latest Kernel";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelStatus {
    pub installed: bool,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelReport {
    pub status: KernelStatus,
    pub architecture: Architecture,
    pub latest: Option<String>,
    pub update_available: bool,
    pub action: &'static str,
    pub download_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub version: String,
    pub arch: String,
    pub size: u64,
}

// 从 `clash -v` 输出中提取版本号
pub fn probe_version(output: &str) -> Option<String> {
    let output = output.trim();
    if output.is_empty() {
        return None;
    }

    for pattern in VERSION_PATTERNS.iter() {
        if let Some(version) = pattern.captures(output).and_then(|c| c.get(1)) {
            return Some(version.as_str().to_string());
        }
    }

    if output.to_lowercase().contains("mihomo") {
        let first_line = output.lines().next().unwrap_or_default().trim();
        if first_line.chars().count() < 100 {
            return Some(first_line.to_string());
        }
        return Some("Mihomo (version detected)".to_string());
    }
    None
}

// 无法获取版本号时以文件大小代替
pub fn installed_size_label(size: u64) -> String {
    let mb = (size as f64 / 1024.0 / 1024.0).round() as u64;
    format!("Installed ({} MB)", mb)
}

pub fn normalize_version(version: &str) -> String {
    SEMVER
        .as_ref()
        .and_then(|re| re.captures(version))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| version.trim().to_string())
}

pub fn build_report(
    status: KernelStatus,
    architecture: Architecture,
    latest: Option<String>,
) -> KernelReport {
    let (update_available, action) = match (&latest, status.installed) {
        (Some(latest), true) => {
            let local = normalize_version(status.version.as_deref().unwrap_or_default());
            if local != normalize_version(latest) {
                (true, ACTION_DOWNLOAD_UPDATE)
            } else {
                (false, ACTION_REINSTALL)
            }
        }
        (None, true) => (false, ACTION_REINSTALL),
        (_, false) => (false, ACTION_DOWNLOAD_LATEST),
    };

    KernelReport {
        download_enabled: latest.is_some(),
        status,
        architecture,
        latest,
        update_available,
        action,
    }
}

pub struct KernelManager<'a, H: Host + ?Sized> {
    host: &'a H,
    paths: &'a PathService,
}

impl<'a, H: Host + ?Sized> KernelManager<'a, H> {
    pub fn new(host: &'a H, paths: &'a PathService) -> Self {
        Self { host, paths }
    }

    pub async fn kernel_status(&self) -> KernelStatus {
        let binary = self.paths.kernel_binary();
        let stat = match self.host.stat(&binary).await {
            Ok(Some(stat)) => stat,
            Ok(None) => {
                return KernelStatus {
                    installed: false,
                    version: None,
                };
            }
            Err(e) => {
                log::warn!("无法检查内核文件：{}", e);
                return KernelStatus {
                    installed: false,
                    version: None,
                };
            }
        };

        let program = binary.to_string_lossy();
        let probed = match self.host.exec(&program, &["-v"]).await {
            Ok(output) => {
                let text = if output.stdout.trim().is_empty() {
                    output.stderr
                } else {
                    output.stdout
                };
                probe_version(&text)
            }
            Err(e) => {
                log::debug!("执行 {} -v 失败：{}", program, e);
                None
            }
        };

        KernelStatus {
            installed: true,
            version: Some(probed.unwrap_or_else(|| installed_size_label(stat.size))),
        }
    }

    pub async fn architecture(&self) -> Architecture {
        let content = match self.host.read_file(self.paths.openwrt_release()).await {
            Ok(content) => Some(content),
            Err(e) => {
                log::warn!("读取 {} 失败：{}", self.paths.openwrt_release().display(), e);
                None
            }
        };
        resolve_architecture(content.as_deref())
    }

    pub async fn latest_release(&self) -> HubResult<GitHubRelease> {
        updater::fetch_latest_release(self.paths.release_api()).await
    }

    // 状态、架构与最新发布并行获取；发布查询失败时禁用下载
    pub async fn kernel_report(&self) -> KernelReport {
        let (status, architecture, release) = tokio::join!(
            self.kernel_status(),
            self.architecture(),
            self.latest_release()
        );

        let latest = match release {
            Ok(release) => Some(release.tag_name),
            Err(e) => {
                log::error!("检查最新版本失败：{}", e);
                None
            }
        };
        build_report(status, architecture, latest)
    }

    pub async fn install_latest(&self) -> HubResult<InstallReport> {
        let (architecture, release) = tokio::join!(self.architecture(), self.latest_release());
        let release = release?;
        let arch = architecture.arch;

        let asset = updater::select_asset(&release, &arch).ok_or_else(|| {
            HubError::Release(format!(
                "未找到适用于 {} 的内核文件：{}",
                arch,
                updater::asset_name(&arch, &release.tag_name)
            ))
        })?;
        log::info!("开始下载内核：{}", asset.name);

        let compressed = updater::download_file(&asset.browser_download_url).await?;
        let kernel = updater::decompress_gz(&compressed)?;
        updater::replace_kernel(&self.paths.kernel_binary(), &kernel).await?;

        log::info!("内核安装成功：{}（{}）", release.tag_name, arch);
        Ok(InstallReport {
            version: release.tag_name.clone(),
            arch,
            size: kernel.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::host::mock::MockHost;

    fn arch(name: &str) -> Architecture {
        Architecture {
            arch: name.to_string(),
            warning: None,
        }
    }

    fn installed(version: &str) -> KernelStatus {
        KernelStatus {
            installed: true,
            version: Some(version.to_string()),
        }
    }

    #[test]
    fn test_probe_version() {
        assert_eq!(
            probe_version("Mihomo Meta v1.19.0 linux arm64 with go1.23.2").as_deref(),
            Some("v1.19.0")
        );
        assert_eq!(
            probe_version("Mihomo alpha-abc123 v1.18.10 linux").as_deref(),
            Some("v1.18.10")
        );
        assert_eq!(probe_version("clash v1.2.3").as_deref(), Some("v1.2.3"));
        assert_eq!(probe_version("mihomo build unknown\nmore").as_deref(), Some("mihomo build unknown"));
        assert_eq!(probe_version("segmentation fault"), None);
        assert_eq!(probe_version(""), None);
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("v1.19.0"), "1.19.0");
        assert_eq!(normalize_version("Mihomo Meta v1.19.0"), "1.19.0");
        assert_eq!(normalize_version("  Installed (12 MB) "), "Installed (12 MB)");
    }

    #[test]
    fn test_report_actions() {
        let update = build_report(installed("v1.18.0"), arch("arm64"), Some("v1.19.0".to_string()));
        assert!(update.update_available);
        assert_eq!(update.action, ACTION_DOWNLOAD_UPDATE);
        assert!(update.download_enabled);

        let current = build_report(installed("v1.19.0"), arch("arm64"), Some("v1.19.0".to_string()));
        assert!(!current.update_available);
        assert_eq!(current.action, ACTION_REINSTALL);

        let missing = KernelStatus {
            installed: false,
            version: None,
        };
        let fresh = build_report(missing.clone(), arch("amd64"), Some("v1.19.0".to_string()));
        assert_eq!(fresh.action, ACTION_DOWNLOAD_LATEST);

        let offline = build_report(missing, arch("amd64"), None);
        assert!(!offline.download_enabled);
        assert_eq!(offline.action, ACTION_DOWNLOAD_LATEST);

        let offline_installed = build_report(installed("v1.19.0"), arch("amd64"), None);
        assert_eq!(offline_installed.action, ACTION_REINSTALL);
        assert!(!offline_installed.download_enabled);
    }

    #[tokio::test]
    async fn test_kernel_status() {
        let paths = PathService::default();

        let absent = KernelManager::new(&MockHost::new(), &paths).kernel_status().await;
        assert!(!absent.installed);

        let host = MockHost::new()
            .with_file("/opt/clash/bin/clash", "binary")
            .with_command("/opt/clash/bin/clash -v", "Mihomo Meta v1.19.0 linux arm64\n");
        let status = KernelManager::new(&host, &paths).kernel_status().await;
        assert_eq!(status, installed("v1.19.0"));

        // 无法执行时以文件大小代替版本号
        let host = MockHost::new().with_file("/opt/clash/bin/clash", "binary");
        let status = KernelManager::new(&host, &paths).kernel_status().await;
        assert_eq!(status, installed("Installed (0 MB)"));
    }

    #[tokio::test]
    async fn test_architecture_from_release_file() {
        let host = MockHost::new().with_file(
            "/etc/openwrt_release",
            "DISTRIB_ARCH='mipsel_24kc'\nDISTRIB_TARGET='ramips/mt7621'\n",
        );
        let paths = PathService::default();

        let architecture = KernelManager::new(&host, &paths).architecture().await;
        assert_eq!(architecture.arch, "mipsle-softfloat");
    }
}

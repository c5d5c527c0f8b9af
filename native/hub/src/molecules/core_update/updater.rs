// 内核下载与替换
//
// 目的：查询 mihomo 最新发布、下载对应架构的 .gz 文件、解压并替换内核

use crate::error::{HubError, HubResult};
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tokio::fs as async_fs;

const USER_AGENT: &str = "ssclash";
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

// 发布信息查询客户端
static API_CLIENT: Lazy<Result<reqwest::Client, String>> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| format!("HTTP 客户端初始化失败：{}", e))
});

// 下载客户端，内核文件较大，总超时更长
static DOWNLOAD_CLIENT: Lazy<Result<reqwest::Client, String>> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| format!("HTTP 客户端初始化失败：{}", e))
});

// GitHub Release API 响应
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
}

// 系统架构及无法识别时的告警
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Architecture {
    pub arch: String,
    pub warning: Option<String>,
}

pub const FALLBACK_ARCH: &str = "amd64";

// 读取 /etc/openwrt_release 中的 DISTRIB_ARCH
pub fn parse_distrib_arch(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let value = line.trim().strip_prefix("DISTRIB_ARCH=")?;
        let value = value.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

// OpenWrt 架构名映射为 mihomo 发布文件使用的架构名
pub fn map_architecture(distrib_arch: &str) -> Option<&'static str> {
    let arch = distrib_arch;

    if arch.starts_with("aarch64_") {
        return Some("arm64");
    }
    if arch == "x86_64" || arch.starts_with("x86_64_") {
        return Some("amd64");
    }
    if arch.starts_with("i386_") {
        return Some("386");
    }
    if arch.starts_with("riscv64_") {
        return Some("riscv64");
    }
    if arch.starts_with("loongarch64_") {
        return Some("loong64");
    }
    if arch.starts_with("arm_") {
        if arch.contains("_neon-vfp") {
            return Some("armv7");
        }
        if arch.contains("_neon") || arch.contains("_vfp") {
            return Some("armv6");
        }
        return Some("armv5");
    }
    if arch.starts_with("mips64el_") {
        return Some("mips64le");
    }
    if arch.starts_with("mips64_") {
        return Some("mips64");
    }
    if arch.starts_with("mipsel_") {
        return Some(if arch.contains("hardfloat") {
            "mipsle-hardfloat"
        } else {
            "mipsle-softfloat"
        });
    }
    if arch.starts_with("mips_") {
        return Some(if arch.contains("hardfloat") {
            "mips-hardfloat"
        } else {
            "mips-softfloat"
        });
    }
    None
}

// 无法识别时回退到 amd64 并给出告警
pub fn resolve_architecture(openwrt_release: Option<&str>) -> Architecture {
    let distrib_arch = openwrt_release.and_then(parse_distrib_arch);
    match distrib_arch.as_deref().and_then(map_architecture) {
        Some(arch) => Architecture {
            arch: arch.to_string(),
            warning: None,
        },
        None => {
            let warning = match distrib_arch {
                Some(raw) => format!("无法识别的架构 {}，使用 {}", raw, FALLBACK_ARCH),
                None => format!("无法读取系统架构，使用 {}", FALLBACK_ARCH),
            };
            log::warn!("{}", warning);
            Architecture {
                arch: FALLBACK_ARCH.to_string(),
                warning: Some(warning),
            }
        }
    }
}

pub fn asset_name(arch: &str, version: &str) -> String {
    format!("mihomo-linux-{}-{}.gz", arch, version)
}

// 按精确文件名匹配资源
pub fn select_asset<'r>(release: &'r GitHubRelease, arch: &str) -> Option<&'r GitHubAsset> {
    let expected = asset_name(arch, &release.tag_name);
    release.assets.iter().find(|asset| asset.name == expected)
}

fn client(cell: &'static Lazy<Result<reqwest::Client, String>>) -> HubResult<&'static reqwest::Client> {
    cell.as_ref().map_err(|e| HubError::Release(e.clone()))
}

// 获取最新的 Release 信息，预发布版本视为不可用
pub async fn fetch_latest_release(url: &str) -> HubResult<GitHubRelease> {
    log::info!("获取最新版本信息：{}", url);

    let response = client(&API_CLIENT)?
        .get(url)
        .header("Accept", "application/vnd.github.v3+json")
        .send()
        .await
        .map_err(|e| HubError::Release(format!("HTTP 请求失败：{}", e)))?;

    if !response.status().is_success() {
        return Err(HubError::Release(format!(
            "获取版本信息失败：HTTP {}",
            response.status()
        )));
    }

    let release: GitHubRelease = response
        .json()
        .await
        .map_err(|e| HubError::Release(format!("JSON 解析失败：{}", e)))?;

    check_release(release)
}

pub fn check_release(release: GitHubRelease) -> HubResult<GitHubRelease> {
    if release.prerelease {
        return Err(HubError::Release(format!(
            "最新版本 {} 是预发布版本",
            release.tag_name
        )));
    }
    Ok(release)
}

// 流式下载文件
pub async fn download_file(url: &str) -> HubResult<Vec<u8>> {
    log::info!("下载链接：{}", url);

    let response = client(&DOWNLOAD_CLIENT)?
        .get(url)
        .send()
        .await
        .map_err(|e| HubError::Download(format!("下载失败：{}", e)))?;

    if !response.status().is_success() {
        return Err(HubError::Download(format!(
            "下载失败：HTTP {}",
            response.status()
        )));
    }

    let total = response.content_length().unwrap_or(0);
    let mut downloaded = 0u64;
    let mut next_report = 0.25;
    let mut bytes = Vec::with_capacity(preallocation(total));

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| HubError::Download(format!("下载中断：{}", e)))?;
        bytes.extend_from_slice(&chunk);
        downloaded += chunk.len() as u64;

        if total > 0 && downloaded as f64 / total as f64 >= next_report {
            log::info!(
                "下载中 {:.1}/{:.1} MB",
                downloaded as f64 / 1024.0 / 1024.0,
                total as f64 / 1024.0 / 1024.0
            );
            next_report += 0.25;
        }
    }

    Ok(bytes)
}

// Content-Length 不可信，预分配设上限
fn preallocation(content_length: u64) -> usize {
    usize::try_from(content_length.min(MAX_PREALLOCATION)).unwrap_or(0)
}

// 解压 GZ 文件
pub fn decompress_gz(file_bytes: &[u8]) -> HubResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(file_bytes);
    let mut bytes = Vec::new();
    decoder
        .read_to_end(&mut bytes)
        .map_err(|e| HubError::Download(format!("解压失败：{}", e)))?;
    if bytes.is_empty() {
        return Err(HubError::Download("解压结果为空".to_string()));
    }
    Ok(bytes)
}

async fn path_exists(path: &Path) -> bool {
    async_fs::try_exists(path).await.unwrap_or(false)
}

// 替换内核文件：备份旧内核，写入新内核并设置可执行权限，失败时恢复备份
pub async fn replace_kernel(kernel_path: &Path, kernel_bytes: &[u8]) -> HubResult<()> {
    log::info!("开始替换内核文件：{}", kernel_path.display());

    let io_err = |action: &str, e: std::io::Error| {
        HubError::Download(format!("{}失败：{}（{}）", action, kernel_path.display(), e))
    };

    if let Some(parent) = kernel_path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err("创建内核目录", e))?;
    }

    let file_name = kernel_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clash".to_string());
    let backup_path = kernel_path.with_file_name(format!("{}_old", file_name));

    // 1. 备份旧内核
    let has_backup = path_exists(kernel_path).await;
    if has_backup {
        log::info!("备份旧内核：{}", backup_path.display());
        async_fs::rename(kernel_path, &backup_path)
            .await
            .map_err(|e| io_err("备份旧内核", e))?;
    }

    // 2. 写入新内核并设置可执行权限
    match write_executable(kernel_path, kernel_bytes).await {
        Ok(()) => {
            log::info!("新内核写入成功");
            if has_backup {
                let _ = async_fs::remove_file(&backup_path).await;
            }
            Ok(())
        }
        Err(e) => {
            log::error!("写入新内核失败：{}", e);

            if has_backup {
                log::info!("尝试恢复旧内核");
                if path_exists(kernel_path).await {
                    let _ = async_fs::remove_file(kernel_path).await;
                }
                async_fs::rename(&backup_path, kernel_path)
                    .await
                    .map_err(|e| io_err("恢复旧内核", e))?;
                log::info!("已恢复旧内核");
            }

            Err(io_err("替换内核", e))
        }
    }
}

async fn write_executable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    async_fs::write(path, bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = async_fs::metadata(path).await?.permissions();
        perms.set_mode(0o755);
        async_fs::set_permissions(path, perms).await?;
        log::info!("已设置可执行权限");
    }

    Ok(())
}

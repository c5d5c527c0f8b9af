// 路由器文件路径管理
// 负责管理所有目录和文件路径，避免路径逻辑分散

use std::path::{Path, PathBuf};

pub const DEFAULT_CLASH_ROOT: &str = "/opt/clash";
pub const DEFAULT_TMP_ROOT: &str = "/tmp/clash";
pub const DEFAULT_INIT_SCRIPT: &str = "/etc/init.d/clash";
pub const DEFAULT_RELEASE_API: &str =
    "https://api.github.com/repos/MetaCubeX/mihomo/releases/latest";

// 环境变量覆盖
pub const ENV_CLASH_ROOT: &str = "SSCLASH_ROOT";
pub const ENV_TMP_ROOT: &str = "SSCLASH_TMP_ROOT";
pub const ENV_INIT_SCRIPT: &str = "SSCLASH_INIT_SCRIPT";
pub const ENV_RELEASE_API: &str = "SSCLASH_RELEASE_API";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathService {
    // 持久化根目录（设置、配置、规则列表、内核）
    clash_root: PathBuf,
    // tmpfs 运行时目录
    tmp_root: PathBuf,
    init_script: PathBuf,
    logread: PathBuf,
    openwrt_release: PathBuf,
    route_table: PathBuf,
    sys_net_dir: PathBuf,
    release_api: String,
}

impl Default for PathService {
    fn default() -> Self {
        Self::with_roots(DEFAULT_CLASH_ROOT, DEFAULT_TMP_ROOT)
    }
}

impl PathService {
    pub fn with_roots(clash_root: impl Into<PathBuf>, tmp_root: impl Into<PathBuf>) -> Self {
        Self {
            clash_root: clash_root.into(),
            tmp_root: tmp_root.into(),
            init_script: PathBuf::from(DEFAULT_INIT_SCRIPT),
            logread: PathBuf::from("/sbin/logread"),
            openwrt_release: PathBuf::from("/etc/openwrt_release"),
            route_table: PathBuf::from("/proc/net/route"),
            sys_net_dir: PathBuf::from("/sys/class/net"),
            release_api: DEFAULT_RELEASE_API.to_string(),
        }
    }

    // 从环境变量构建，未设置或为空的变量使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut service = Self::with_roots(
            get(ENV_CLASH_ROOT).unwrap_or_else(|| DEFAULT_CLASH_ROOT.to_string()),
            get(ENV_TMP_ROOT).unwrap_or_else(|| DEFAULT_TMP_ROOT.to_string()),
        );
        if let Some(script) = get(ENV_INIT_SCRIPT) {
            service.init_script = PathBuf::from(script);
        }
        if let Some(api) = get(ENV_RELEASE_API) {
            service.release_api = api;
        }
        service
    }

    pub fn with_release_api(mut self, url: impl Into<String>) -> Self {
        self.release_api = url.into();
        self
    }

    pub fn clash_root(&self) -> &Path {
        &self.clash_root
    }

    pub fn tmp_root(&self) -> &Path {
        &self.tmp_root
    }

    pub fn init_script(&self) -> &Path {
        &self.init_script
    }

    pub fn logread(&self) -> &Path {
        &self.logread
    }

    pub fn openwrt_release(&self) -> &Path {
        &self.openwrt_release
    }

    pub fn route_table(&self) -> &Path {
        &self.route_table
    }

    pub fn sys_net_dir(&self) -> &Path {
        &self.sys_net_dir
    }

    pub fn release_api(&self) -> &str {
        &self.release_api
    }

    pub fn settings_file(&self) -> PathBuf {
        self.clash_root.join("settings")
    }

    pub fn included_list_file(&self) -> PathBuf {
        self.clash_root.join("included_interfaces")
    }

    pub fn excluded_list_file(&self) -> PathBuf {
        self.clash_root.join("excluded_interfaces")
    }

    pub fn config_file(&self) -> PathBuf {
        self.clash_root.join("config.yaml")
    }

    pub fn rulesets_dir(&self) -> PathBuf {
        self.clash_root.join("lst")
    }

    pub fn local_servers_persistent(&self) -> PathBuf {
        self.clash_root
            .join("proxy_providers_persistent")
            .join("local.txt")
    }

    pub fn local_servers_runtime(&self) -> PathBuf {
        self.tmp_root.join("proxy_providers").join("local.txt")
    }

    pub fn kernel_binary(&self) -> PathBuf {
        self.clash_root.join("bin").join("clash")
    }
}

// Clash 配置文件：读取、保存并应用，以及控制面板地址计算

use super::service::{ServiceController, ToggleOutcome};
use crate::atoms::host::Host;
use crate::error::{HubError, HubResult};
use crate::services::PathService;
use serde::Serialize;
use serde_yaml_ng::Value;
use url::Url;

pub const DEFAULT_CONTROLLER_PORT: &str = "9090";

// 控制面板相关的顶层配置项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerSettings {
    pub external_controller: Option<String>,
    pub external_controller_tls: Option<String>,
    pub secret: Option<String>,
    pub external_ui: Option<String>,
    pub external_ui_name: Option<String>,
}

// 标量转为字符串，空字符串视为未设置
fn scalar(root: &Value, key: &str) -> Option<String> {
    let value = match root.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

impl ControllerSettings {
    pub fn from_yaml(content: &str) -> HubResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let root: Value = serde_yaml_ng::from_str(content)
            .map_err(|e| HubError::Config(format!("配置文件解析失败：{}", e)))?;

        Ok(Self {
            external_controller: scalar(&root, "external-controller"),
            external_controller_tls: scalar(&root, "external-controller-tls"),
            secret: scalar(&root, "secret"),
            external_ui: scalar(&root, "external-ui"),
            external_ui_name: scalar(&root, "external-ui-name"),
        })
    }
}

// 解析 host:port，通配地址替换为面板所在主机
pub fn normalize_host_port(addr: Option<&str>, fallback_host: &str) -> (String, String) {
    let mut host = fallback_host.to_string();
    let mut port = DEFAULT_CONTROLLER_PORT.to_string();

    if let Some(addr) = addr {
        let cleaned = addr.replace(['"', '\''], "");
        let cleaned = cleaned.trim();
        let cleaned = cleaned.strip_prefix('[').unwrap_or(cleaned);
        let cleaned = cleaned.strip_suffix(']').unwrap_or(cleaned);

        if let Some((h, p)) = cleaned.rsplit_once(':') {
            host = h.trim_end_matches(']').to_string();
            port = p.to_string();
        }
    }

    if matches!(host.as_str(), "" | "0.0.0.0" | "::") {
        host = fallback_host.to_string();
    }
    (host, port)
}

// 面板路径：external-ui-name 优先，其次是不含路径分隔符的 external-ui
pub fn ui_path(external_ui_name: Option<&str>, external_ui: Option<&str>) -> String {
    if let Some(name) = external_ui_name {
        return format!("/{}/", name.trim_matches('/'));
    }
    if let Some(ui) = external_ui
        && !ui.contains(['/', '\\', '.'])
    {
        return format!("/{}/", ui.trim());
    }
    "/ui/".to_string()
}

pub fn dashboard_url(settings: &ControllerSettings, panel_host: &str) -> HubResult<Url> {
    let use_tls = settings.external_controller_tls.is_some();
    let addr = if use_tls {
        settings.external_controller_tls.as_deref()
    } else {
        settings.external_controller.as_deref()
    };
    let (host, port) = normalize_host_port(addr, panel_host);
    let scheme = if use_tls { "https" } else { "http" };
    let path = ui_path(
        settings.external_ui_name.as_deref(),
        settings.external_ui.as_deref(),
    );

    let authority = if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    };
    let mut url = Url::parse(&format!("{}://{}{}", scheme, authority, path))
        .map_err(|e| HubError::Config(format!("无法生成控制面板地址：{}", e)))?;

    {
        let mut query = url.query_pairs_mut();
        if let Some(secret) = &settings.secret {
            query.append_pair("secret", secret);
        }
        query.append_pair("hostname", &host);
        query.append_pair("port", &port);
    }
    Ok(url)
}

pub struct ClashConfig<'a, H: Host + ?Sized> {
    host: &'a H,
    paths: &'a PathService,
}

impl<'a, H: Host + ?Sized> ClashConfig<'a, H> {
    pub fn new(host: &'a H, paths: &'a PathService) -> Self {
        Self { host, paths }
    }

    // 配置文件不存在时返回空内容
    pub async fn load(&self) -> HubResult<String> {
        let path = self.paths.config_file();
        self.host
            .read_or_default(&path, "")
            .await
            .map_err(|e| HubError::persistence("读取配置", &path, e))
    }

    // 写入配置后重载服务，并等待服务恢复运行
    pub async fn save_and_apply(&self, content: &str) -> HubResult<ToggleOutcome> {
        let path = self.paths.config_file();
        let normalized = format!("{}\n", content.trim());
        self.host
            .write_file(&path, &normalized)
            .await
            .map_err(|e| HubError::persistence("保存配置", &path, e))?;
        log::info!("配置已保存：{}", path.display());

        let service = ServiceController::new(self.host, self.paths);
        service.reload().await?;
        Ok(service.wait_for(true).await)
    }

    // 服务未运行时面板不可用
    pub async fn dashboard(&self, panel_host: &str) -> HubResult<Url> {
        let service = ServiceController::new(self.host, self.paths);
        if !service.is_running().await {
            return Err(HubError::Exec("服务未运行".to_string()));
        }
        let settings = ControllerSettings::from_yaml(&self.load().await?)?;
        dashboard_url(&settings, panel_host)
    }
}

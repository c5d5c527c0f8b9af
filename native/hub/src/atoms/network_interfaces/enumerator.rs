// 网络接口枚举：合并多个来源的接口名，任一来源失败只记录日志。
// 返回空列表表示"未知"，而不是"系统没有接口"。

use super::classifier::{InterfaceDescriptor, classify_all};
use crate::atoms::host::Host;
use std::collections::HashSet;
use std::path::Path;

// 解析 `ip link show`：`3: eth0@if5: <BROADCAST,...>`
pub fn parse_ip_link(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (index, rest) = line.split_once(':')?;
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let rest = rest.trim_start();
            let end = rest.find([':', '@']).unwrap_or(rest.len());
            let name = rest[..end].trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

// 解析 `brctl show`，只取每行首列的网桥名，跳过表头与端口续行
pub fn parse_brctl_show(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .filter_map(|line| {
            let (name, _) = line.split_once(char::is_whitespace)?;
            (!name.is_empty() && name != "bridge").then(|| name.to_string())
        })
        .collect()
}

async fn exec_lines<H, F>(host: &H, program: &str, args: &[&str], parse: F) -> Vec<String>
where
    H: Host + ?Sized,
    F: Fn(&str) -> Vec<String>,
{
    match host.exec(program, args).await {
        Ok(output) if output.success() => parse(&output.stdout),
        Ok(output) => {
            log::debug!("{} 返回错误码 {}", program, output.code);
            Vec::new()
        }
        Err(e) => {
            log::warn!("执行 {} 失败：{}", program, e);
            Vec::new()
        }
    }
}

// 按来源顺序收集接口名并去重（保留首次出现的位置）
pub async fn enumerate_interface_names<H: Host + ?Sized>(host: &H, sys_net_dir: &Path) -> Vec<String> {
    let mut sources: Vec<Vec<String>> = Vec::with_capacity(4);

    match host.list_dir(sys_net_dir).await {
        Ok(names) => sources.push(names),
        Err(e) => log::warn!("读取 {} 失败：{}", sys_net_dir.display(), e),
    }

    sources.push(exec_lines(host, "ip", &["link", "show"], parse_ip_link).await);
    sources.push(exec_lines(host, "brctl", &["show"], parse_brctl_show).await);

    match host.system_interfaces().await {
        Ok(names) => sources.push(names),
        Err(e) => log::warn!("系统网络设备 API 不可用：{}", e),
    }

    let mut seen = HashSet::new();
    let names: Vec<String> = sources
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && name != "lo")
        .filter(|name| seen.insert(name.clone()))
        .collect();

    if names.is_empty() {
        log::warn!("未发现任何网络接口");
    } else {
        log::info!("发现{}个网络接口：{}", names.len(), names.join(", "));
    }

    names
}

pub async fn discover_interfaces<H: Host + ?Sized>(
    host: &H,
    sys_net_dir: &Path,
) -> Vec<InterfaceDescriptor> {
    classify_all(enumerate_interface_names(host, sys_net_dir).await)
}

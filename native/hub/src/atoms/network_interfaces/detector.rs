// LAN/WAN 接口自动探测：按策略逐层尝试，任一层失败只记录日志，全部失败返回 None。

use super::classifier::{InterfaceCategory, classify};
use crate::atoms::host::Host;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

// LAN 网桥探测方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LanStrategy {
    // 逻辑网络 lan 对应的三层设备（需处于 up 状态）
    LogicalNetwork,
    // 名称类似网桥、已启用且带有私有 IPv4 地址的接口
    PrivateBridgeScan,
    // 直接使用 br-lan
    LiteralBrLan,
}

// WAN 接口探测方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WanStrategy {
    // 逻辑网络 wan / wan6 对应的设备
    LogicalNetwork,
    // 已启用且名称归类为 WAN 的接口
    NamePatternScan,
    // 内核路由表中的默认路由接口
    DefaultRoute,
}

// 探测回退顺序，各版本面板不一致，因此作为可配置策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionPolicy {
    pub lan: Vec<LanStrategy>,
    pub wan: Vec<WanStrategy>,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            lan: vec![
                LanStrategy::LogicalNetwork,
                LanStrategy::PrivateBridgeScan,
                LanStrategy::LiteralBrLan,
            ],
            wan: vec![
                WanStrategy::LogicalNetwork,
                WanStrategy::NamePatternScan,
                WanStrategy::DefaultRoute,
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectedInterfaces {
    pub lan: Option<String>,
    pub wan: Option<String>,
}

// ubus network.interface.<name> status 的有用字段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogicalNetworkStatus {
    #[serde(default)]
    pub up: bool,
    pub l3_device: Option<String>,
    pub device: Option<String>,
}

impl LogicalNetworkStatus {
    pub fn device_name(&self) -> Option<&str> {
        self.l3_device
            .as_deref()
            .or(self.device.as_deref())
            .filter(|name| !name.is_empty() && *name != "lo")
    }
}

pub fn parse_network_status(json: &str) -> Option<LogicalNetworkStatus> {
    match serde_json::from_str(json) {
        Ok(status) => Some(status),
        Err(e) => {
            log::debug!("解析逻辑网络状态失败：{}", e);
            None
        }
    }
}

// `ip addr show` 中单个接口的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAddresses {
    pub name: String,
    pub is_up: bool,
    pub ipv4: Vec<Ipv4Addr>,
}

// 解析接口头部行：`2: br-lan: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 ...`
fn parse_link_header(line: &str) -> Option<(String, bool)> {
    let (index, rest) = line.split_once(':')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let rest = rest.trim_start();
    let end = rest.find([':', '@'])?;
    let name = rest[..end].trim();
    if name.is_empty() {
        return None;
    }

    let is_up = rest
        .split_once('<')
        .and_then(|(_, flags)| flags.split_once('>'))
        .is_some_and(|(flags, _)| flags.split(',').any(|flag| flag == "UP"));

    Some((name.to_string(), is_up))
}

pub fn parse_ip_addr(output: &str) -> Vec<LinkAddresses> {
    let mut links: Vec<LinkAddresses> = Vec::new();

    for line in output.lines() {
        if let Some((name, is_up)) = parse_link_header(line) {
            links.push(LinkAddresses {
                name,
                is_up,
                ipv4: Vec::new(),
            });
            continue;
        }

        let Some(current) = links.last_mut() else {
            continue;
        };

        if let Some(address) = line.trim_start().strip_prefix("inet ") {
            let address = address.split_whitespace().next().unwrap_or_default();
            let address = address.split('/').next().unwrap_or_default();
            if let Ok(ip) = address.parse::<Ipv4Addr>() {
                current.ipv4.push(ip);
            }
        }
    }

    links
}

// 读取 /proc/net/route，返回目的地址为 00000000 的接口
pub fn parse_default_route(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        let destination = fields.next()?;
        (iface != "Iface" && destination == "00000000").then(|| iface.to_string())
    })
}

fn is_bridge_like(name: &str) -> bool {
    name.starts_with("br-") || name.starts_with("bridge") || name == "lan"
}

pub struct InterfaceDetector<'a, H: Host + ?Sized> {
    host: &'a H,
    route_table: &'a Path,
    policy: &'a DetectionPolicy,
}

impl<'a, H: Host + ?Sized> InterfaceDetector<'a, H> {
    pub fn new(host: &'a H, route_table: &'a Path, policy: &'a DetectionPolicy) -> Self {
        Self {
            host,
            route_table,
            policy,
        }
    }

    pub async fn detect_all(&self) -> DetectedInterfaces {
        let (lan, wan) = tokio::join!(self.detect_lan(), self.detect_wan());
        DetectedInterfaces { lan, wan }
    }

    pub async fn detect_lan(&self) -> Option<String> {
        for strategy in &self.policy.lan {
            let found = match strategy {
                LanStrategy::LogicalNetwork => self.lan_from_logical_network().await,
                LanStrategy::PrivateBridgeScan => self.lan_from_address_scan().await,
                LanStrategy::LiteralBrLan => self.lan_from_literal_bridge().await,
            };
            if let Some(name) = found {
                log::info!("探测到 LAN 网桥：{}（{:?}）", name, strategy);
                return Some(name);
            }
        }
        log::warn!("未能探测到 LAN 网桥");
        None
    }

    pub async fn detect_wan(&self) -> Option<String> {
        for strategy in &self.policy.wan {
            let found = match strategy {
                WanStrategy::LogicalNetwork => self.wan_from_logical_network().await,
                WanStrategy::NamePatternScan => self.wan_from_name_scan().await,
                WanStrategy::DefaultRoute => self.wan_from_route_table().await,
            };
            if let Some(name) = found {
                log::info!("探测到 WAN 接口：{}（{:?}）", name, strategy);
                return Some(name);
            }
        }
        log::warn!("未能探测到 WAN 接口");
        None
    }

    async fn logical_network(&self, network: &str) -> Option<LogicalNetworkStatus> {
        let object = format!("network.interface.{}", network);
        match self.host.exec("ubus", &["call", &object, "status"]).await {
            Ok(output) if output.success() => parse_network_status(&output.stdout),
            Ok(output) => {
                log::debug!("查询逻辑网络 {} 失败，退出码 {}", network, output.code);
                None
            }
            Err(e) => {
                log::warn!("逻辑网络探测不可用，使用回退方式：{}", e);
                None
            }
        }
    }

    async fn links(&self) -> Vec<LinkAddresses> {
        match self.host.exec("ip", &["addr", "show"]).await {
            Ok(output) if output.success() => parse_ip_addr(&output.stdout),
            Ok(output) => {
                log::warn!("ip addr show 返回错误码 {}", output.code);
                Vec::new()
            }
            Err(e) => {
                log::warn!("执行 ip addr show 失败：{}", e);
                Vec::new()
            }
        }
    }

    async fn lan_from_logical_network(&self) -> Option<String> {
        let status = self.logical_network("lan").await?;
        if !status.up {
            return None;
        }
        status.device_name().map(str::to_string)
    }

    async fn lan_from_address_scan(&self) -> Option<String> {
        self.links()
            .await
            .into_iter()
            .find(|link| {
                link.is_up
                    && link.name != "lo"
                    && is_bridge_like(&link.name)
                    && link.ipv4.iter().any(Ipv4Addr::is_private)
            })
            .map(|link| link.name)
    }

    async fn lan_from_literal_bridge(&self) -> Option<String> {
        self.links()
            .await
            .into_iter()
            .find(|link| link.name == "br-lan" && link.is_up)
            .map(|link| link.name)
    }

    async fn wan_from_logical_network(&self) -> Option<String> {
        for network in ["wan", "wan6"] {
            if let Some(name) = self
                .logical_network(network)
                .await
                .as_ref()
                .and_then(LogicalNetworkStatus::device_name)
            {
                return Some(name.to_string());
            }
        }
        None
    }

    async fn wan_from_name_scan(&self) -> Option<String> {
        self.links()
            .await
            .into_iter()
            .find(|link| link.is_up && classify(&link.name).category == InterfaceCategory::Wan)
            .map(|link| link.name)
    }

    async fn wan_from_route_table(&self) -> Option<String> {
        match self.host.read_file(self.route_table).await {
            Ok(content) => parse_default_route(&content),
            Err(e) => {
                log::error!("读取路由表失败：{}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::host::mock::MockHost;

    const IP_ADDR: &str = "\
1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536 qdisc noqueue state UNKNOWN group default qlen 1000
    inet 127.0.0.1/8 scope host lo
2: eth0@if5: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc mq state UP qlen 1000
    inet 203.0.113.7/24 brd 203.0.113.255 scope global eth0
3: br-guest: <BROADCAST,MULTICAST> mtu 1500 qdisc noqueue state DOWN
    inet 192.168.2.1/24 brd 192.168.2.255 scope global br-guest
4: br-lan: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc noqueue state UP
    inet 192.168.1.1/24 brd 192.168.1.255 scope global br-lan
    inet6 fd00::1/60 scope global noprefixroute
5: pppoe-wan: <POINTOPOINT,MULTICAST,NOARP,UP,LOWER_UP> mtu 1492 qdisc fq_codel state UNKNOWN
    inet 100.64.3.2 peer 100.64.0.1/32 scope global pppoe-wan
";

    const ROUTE: &str = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
br-lan\t0001A8C0\t00000000\t0001\t0\t0\t0\t00FFFFFF\t0\t0\t0
eth1\t00000000\t0100A8C0\t0003\t0\t0\t0\t00000000\t0\t0\t0
";

    #[test]
    fn test_parse_ip_addr() {
        let links = parse_ip_addr(IP_ADDR);
        let names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["lo", "eth0", "br-guest", "br-lan", "pppoe-wan"]);

        assert!(!links[2].is_up);
        assert!(links[3].is_up);
        assert_eq!(links[3].ipv4, vec![Ipv4Addr::new(192, 168, 1, 1)]);
        assert_eq!(links[4].ipv4, vec![Ipv4Addr::new(100, 64, 3, 2)]);
    }

    #[test]
    fn test_parse_default_route_skips_header() {
        assert_eq!(parse_default_route(ROUTE), Some("eth1".to_string()));
        assert_eq!(parse_default_route("Iface\tDestination\n"), None);
        assert_eq!(parse_default_route(""), None);
    }

    #[test]
    fn test_parse_network_status_prefers_l3_device() {
        let status =
            parse_network_status(r#"{"up":true,"l3_device":"pppoe-wan","device":"eth1"}"#).unwrap();
        assert_eq!(status.device_name(), Some("pppoe-wan"));

        let status = parse_network_status(r#"{"up":false,"device":"br-lan"}"#).unwrap();
        assert!(!status.up);
        assert_eq!(status.device_name(), Some("br-lan"));

        assert!(parse_network_status("Command failed: Not found").is_none());
    }

    #[tokio::test]
    async fn test_lan_from_logical_network() {
        let host = MockHost::new().with_command(
            "ubus call network.interface.lan status",
            r#"{"up":true,"l3_device":"br-lan"}"#,
        );
        let policy = DetectionPolicy::default();
        let detector = InterfaceDetector::new(&host, Path::new("/proc/net/route"), &policy);

        assert_eq!(detector.detect_lan().await, Some("br-lan".to_string()));
    }

    #[tokio::test]
    async fn test_lan_falls_back_to_private_bridge_scan() {
        // ubus 不可用时扫描地址，跳过未启用的 br-guest
        let host = MockHost::new()
            .with_failing_command("ubus call network.interface.lan status")
            .with_command("ip addr show", IP_ADDR);
        let policy = DetectionPolicy::default();
        let detector = InterfaceDetector::new(&host, Path::new("/proc/net/route"), &policy);

        assert_eq!(detector.detect_lan().await, Some("br-lan".to_string()));
    }

    #[tokio::test]
    async fn test_lan_down_logical_network_is_ignored() {
        let host = MockHost::new()
            .with_command(
                "ubus call network.interface.lan status",
                r#"{"up":false,"l3_device":"br-lan"}"#,
            )
            .with_command("ip addr show", "");
        let policy = DetectionPolicy::default();
        let detector = InterfaceDetector::new(&host, Path::new("/proc/net/route"), &policy);

        assert_eq!(detector.detect_lan().await, None);
    }

    #[tokio::test]
    async fn test_wan_logical_network_then_wan6() {
        let host = MockHost::new()
            .with_command_code("ubus call network.interface.wan status", 4, "Not found")
            .with_command(
                "ubus call network.interface.wan6 status",
                r#"{"up":true,"l3_device":"eth1"}"#,
            );
        let policy = DetectionPolicy::default();
        let detector = InterfaceDetector::new(&host, Path::new("/proc/net/route"), &policy);

        assert_eq!(detector.detect_wan().await, Some("eth1".to_string()));
    }

    #[tokio::test]
    async fn test_wan_name_scan_then_route_table() {
        let host = MockHost::new().with_command("ip addr show", IP_ADDR);
        let policy = DetectionPolicy::default();
        let detector = InterfaceDetector::new(&host, Path::new("/proc/net/route"), &policy);
        assert_eq!(detector.detect_wan().await, Some("pppoe-wan".to_string()));

        let host = MockHost::new()
            .with_command("ip addr show", "")
            .with_file("/proc/net/route", ROUTE);
        let detector = InterfaceDetector::new(&host, Path::new("/proc/net/route"), &policy);
        assert_eq!(detector.detect_wan().await, Some("eth1".to_string()));
    }

    #[tokio::test]
    async fn test_total_failure_yields_none() {
        let host = MockHost::new();
        let policy = DetectionPolicy::default();
        let detector = InterfaceDetector::new(&host, Path::new("/proc/net/route"), &policy);

        assert_eq!(detector.detect_all().await, DetectedInterfaces::default());
    }

    #[tokio::test]
    async fn test_policy_order_is_respected() {
        // 将路由表放在最前时，不再查询 ubus
        let host = MockHost::new()
            .with_file("/proc/net/route", ROUTE)
            .with_command(
                "ubus call network.interface.wan status",
                r#"{"up":true,"l3_device":"pppoe-wan"}"#,
            );
        let policy = DetectionPolicy {
            lan: vec![],
            wan: vec![WanStrategy::DefaultRoute, WanStrategy::LogicalNetwork],
        };
        let detector = InterfaceDetector::new(&host, Path::new("/proc/net/route"), &policy);

        assert_eq!(detector.detect_wan().await, Some("eth1".to_string()));
        assert!(host.executed().is_empty());
    }
}

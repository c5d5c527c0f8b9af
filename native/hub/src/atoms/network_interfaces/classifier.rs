// 网络接口分类：按有序规则表将接口名映射为类别与图标。
// 规则自上而下匹配，首个命中的规则生效，靠前的规则会遮蔽靠后的规则。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceCategory {
    Wan,
    Ethernet,
    Wifi,
    Usb,
    Vpn,
    Virtual,
    Other,
}

impl InterfaceCategory {
    // 展示顺序
    pub const DISPLAY_ORDER: [InterfaceCategory; 7] = [
        InterfaceCategory::Wan,
        InterfaceCategory::Ethernet,
        InterfaceCategory::Wifi,
        InterfaceCategory::Usb,
        InterfaceCategory::Vpn,
        InterfaceCategory::Virtual,
        InterfaceCategory::Other,
    ];

    pub fn rank(self) -> usize {
        match self {
            InterfaceCategory::Wan => 0,
            InterfaceCategory::Ethernet => 1,
            InterfaceCategory::Wifi => 2,
            InterfaceCategory::Usb => 3,
            InterfaceCategory::Vpn => 4,
            InterfaceCategory::Virtual => 5,
            InterfaceCategory::Other => 6,
        }
    }

    // 分组标题
    pub fn title(self) -> &'static str {
        match self {
            InterfaceCategory::Wan => "WAN 接口",
            InterfaceCategory::Ethernet => "以太网接口",
            InterfaceCategory::Wifi => "无线接口",
            InterfaceCategory::Usb => "USB 接口",
            InterfaceCategory::Vpn => "VPN 接口",
            InterfaceCategory::Virtual => "虚拟接口",
            InterfaceCategory::Other => "其他接口",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub category: InterfaceCategory,
    pub icon: &'static str,
}

// 接口名匹配方式
#[derive(Debug, Clone, Copy)]
pub enum NameMatcher {
    // 形如 eth0.5 的 VLAN 子接口
    VlanSuffix,
    Prefix(&'static [&'static str]),
}

impl NameMatcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatcher::VlanSuffix => name.rsplit_once('.').is_some_and(|(_, suffix)| {
                !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit())
            }),
            NameMatcher::Prefix(prefixes) => prefixes.iter().any(|p| name.starts_with(p)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierRule {
    pub matcher: NameMatcher,
    pub category: InterfaceCategory,
    pub icon: &'static str,
}

const DEFAULT_ICON: &str = "🔗";

pub const CLASSIFIER_RULES: &[ClassifierRule] = &[
    ClassifierRule {
        matcher: NameMatcher::VlanSuffix,
        category: InterfaceCategory::Ethernet,
        icon: "🏷️",
    },
    ClassifierRule {
        matcher: NameMatcher::Prefix(&["br-", "bridge"]),
        category: InterfaceCategory::Ethernet,
        icon: "🔀",
    },
    ClassifierRule {
        matcher: NameMatcher::Prefix(&["eth", "lan", "br", "switch", "bond", "team"]),
        category: InterfaceCategory::Ethernet,
        icon: "🌐",
    },
    ClassifierRule {
        matcher: NameMatcher::Prefix(&["wlan", "wifi", "ath", "phy", "ra", "mt", "rtl", "iwl"]),
        category: InterfaceCategory::Wifi,
        icon: "📶",
    },
    ClassifierRule {
        matcher: NameMatcher::Prefix(&[
            "wan", "ppp", "modem", "3g", "4g", "5g", "lte", "gsm", "cdma", "hsdpa", "hsupa",
            "umts",
        ]),
        category: InterfaceCategory::Wan,
        icon: "🌍",
    },
    ClassifierRule {
        matcher: NameMatcher::Prefix(&[
            "tun", "tap", "vpn", "wg", "nord", "express", "surf", "pia", "ovpn", "openvpn",
            "l2tp", "pptp", "sstp", "ikev2", "ipsec",
        ]),
        category: InterfaceCategory::Vpn,
        icon: "🔐",
    },
    ClassifierRule {
        matcher: NameMatcher::Prefix(&["usb", "rndis", "cdc", "ecm", "ncm", "qmi", "rmnet", "mbim"]),
        category: InterfaceCategory::Usb,
        icon: "🔌",
    },
    ClassifierRule {
        matcher: NameMatcher::Prefix(&["veth", "macvlan", "ipvlan", "dummy", "vrf", "vcan", "vxcan"]),
        category: InterfaceCategory::Virtual,
        icon: "💭",
    },
];

pub fn classify(name: &str) -> InterfaceDescriptor {
    let (category, icon) = CLASSIFIER_RULES
        .iter()
        .find(|rule| rule.matcher.matches(name))
        .map(|rule| (rule.category, rule.icon))
        .unwrap_or((InterfaceCategory::Other, DEFAULT_ICON));

    InterfaceDescriptor {
        name: name.to_string(),
        category,
        icon,
    }
}

// 先按类别顺序，再按名称（忽略大小写，相同时按原始字节）排序
fn compare_descriptors(a: &InterfaceDescriptor, b: &InterfaceDescriptor) -> Ordering {
    a.category
        .rank()
        .cmp(&b.category.rank())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

pub fn sort_interfaces(interfaces: &mut [InterfaceDescriptor]) {
    interfaces.sort_by(compare_descriptors);
}

// 去重、过滤回环接口后分类并排序
pub fn classify_all<I, S>(names: I) -> Vec<InterfaceDescriptor>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut result: Vec<InterfaceDescriptor> = names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref().trim();
            if name.is_empty() || name == "lo" || !seen.insert(name.to_string()) {
                return None;
            }
            Some(classify(name))
        })
        .collect();

    sort_interfaces(&mut result);
    result
}

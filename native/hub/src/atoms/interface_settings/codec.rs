// 设置文件编解码：每行一个 KEY=value，字段顺序固定，末尾带换行。
// 纯函数，不涉及存储。

use super::model::{DEFAULT_HWID_DEVICE_OS, DEFAULT_HWID_USER_AGENT, InterfaceMode, Settings};
use super::selection::text_or_default;

pub const KEY_INTERFACE_MODE: &str = "INTERFACE_MODE";
pub const KEY_AUTO_DETECT_LAN: &str = "AUTO_DETECT_LAN";
pub const KEY_AUTO_DETECT_WAN: &str = "AUTO_DETECT_WAN";
pub const KEY_BLOCK_QUIC: &str = "BLOCK_QUIC";
pub const KEY_DETECTED_LAN: &str = "DETECTED_LAN";
pub const KEY_DETECTED_WAN: &str = "DETECTED_WAN";
pub const KEY_INCLUDED_INTERFACES: &str = "INCLUDED_INTERFACES";
pub const KEY_EXCLUDED_INTERFACES: &str = "EXCLUDED_INTERFACES";
pub const KEY_ENABLE_HWID: &str = "ENABLE_HWID";
pub const KEY_HWID_USER_AGENT: &str = "HWID_USER_AGENT";
pub const KEY_HWID_DEVICE_OS: &str = "HWID_DEVICE_OS";

pub fn encode(settings: &Settings) -> String {
    let lines = [
        (KEY_INTERFACE_MODE, settings.mode.as_str().to_string()),
        (KEY_AUTO_DETECT_LAN, settings.auto_detect_lan.to_string()),
        (KEY_AUTO_DETECT_WAN, settings.auto_detect_wan.to_string()),
        (KEY_BLOCK_QUIC, settings.block_quic.to_string()),
        (KEY_DETECTED_LAN, settings.detected_lan.clone()),
        (KEY_DETECTED_WAN, settings.detected_wan.clone()),
        (KEY_INCLUDED_INTERFACES, settings.included_interfaces.join(",")),
        (KEY_EXCLUDED_INTERFACES, settings.excluded_interfaces.join(",")),
        (KEY_ENABLE_HWID, settings.enable_hwid.to_string()),
        (KEY_HWID_USER_AGENT, settings.hwid_user_agent.clone()),
        (KEY_HWID_DEVICE_OS, settings.hwid_device_os.clone()),
    ];

    let mut content = String::new();
    for (key, value) in lines {
        content.push_str(key);
        content.push('=');
        content.push_str(&value);
        content.push('\n');
    }
    content
}

// 只有精确的 "true" 才为真
fn parse_bool(value: &str) -> bool {
    value == "true"
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// 未知键忽略，缺失键保留默认值，解析永不失败
pub fn decode(content: &str) -> Settings {
    let mut settings = Settings::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            KEY_INTERFACE_MODE => match value.parse::<InterfaceMode>() {
                Ok(mode) => settings.mode = mode,
                Err(e) => log::warn!("{}，保留默认模式 {}", e, settings.mode),
            },
            KEY_AUTO_DETECT_LAN => settings.auto_detect_lan = parse_bool(value),
            KEY_AUTO_DETECT_WAN => settings.auto_detect_wan = parse_bool(value),
            KEY_BLOCK_QUIC => settings.block_quic = parse_bool(value),
            KEY_DETECTED_LAN => settings.detected_lan = value.to_string(),
            KEY_DETECTED_WAN => settings.detected_wan = value.to_string(),
            KEY_INCLUDED_INTERFACES => settings.included_interfaces = parse_list(value),
            KEY_EXCLUDED_INTERFACES => settings.excluded_interfaces = parse_list(value),
            KEY_ENABLE_HWID => settings.enable_hwid = parse_bool(value),
            // HWID 空值视为未设置
            KEY_HWID_USER_AGENT => {
                settings.hwid_user_agent = text_or_default(value, DEFAULT_HWID_USER_AGENT)
            }
            KEY_HWID_DEVICE_OS => {
                settings.hwid_device_os = text_or_default(value, DEFAULT_HWID_DEVICE_OS)
            }
            other => log::debug!("忽略未知设置项：{}", other),
        }
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mode: InterfaceMode) -> Settings {
        Settings {
            mode,
            auto_detect_lan: false,
            auto_detect_wan: true,
            block_quic: false,
            detected_lan: "br-lan".to_string(),
            detected_wan: "pppoe-wan".to_string(),
            included_interfaces: vec!["eth1".to_string(), "wlan0".to_string()],
            excluded_interfaces: Vec::new(),
            enable_hwid: true,
            hwid_user_agent: "SSClash/2.1".to_string(),
            hwid_device_os: "OpenWrt 24.10".to_string(),
        }
    }

    #[test]
    fn test_encode_fixed_order_with_trailing_newline() {
        let content = encode(&Settings::default());
        assert_eq!(
            content,
            "INTERFACE_MODE=exclude\n\
             AUTO_DETECT_LAN=true\n\
             AUTO_DETECT_WAN=true\n\
             BLOCK_QUIC=true\n\
             DETECTED_LAN=\n\
             DETECTED_WAN=\n\
             INCLUDED_INTERFACES=\n\
             EXCLUDED_INTERFACES=\n\
             ENABLE_HWID=false\n\
             HWID_USER_AGENT=SSClash\n\
             HWID_DEVICE_OS=OpenWrt\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let explicit = sample(InterfaceMode::Explicit);
        assert_eq!(decode(&encode(&explicit)), explicit);

        let mut exclude = sample(InterfaceMode::Exclude);
        exclude.excluded_interfaces = exclude.included_interfaces.clone();
        exclude.included_interfaces.clear();
        assert_eq!(decode(&encode(&exclude)), exclude);

        let defaults = Settings::default();
        assert_eq!(decode(&encode(&defaults)), defaults);
    }

    #[test]
    fn test_empty_hwid_keeps_defaults() {
        let settings = decode("ENABLE_HWID=true\nHWID_USER_AGENT=\nHWID_DEVICE_OS=\n");

        assert!(settings.enable_hwid);
        assert_eq!(settings.hwid_user_agent, DEFAULT_HWID_USER_AGENT);
        assert_eq!(settings.hwid_device_os, DEFAULT_HWID_DEVICE_OS);
    }

    #[test]
    fn test_partial_content_keeps_defaults() {
        let settings = decode("INTERFACE_MODE=explicit\nAUTO_DETECT_LAN=true\n");

        assert_eq!(settings.mode, InterfaceMode::Explicit);
        assert!(settings.auto_detect_lan);
        assert!(settings.auto_detect_wan);
        assert!(settings.block_quic);
        assert!(!settings.enable_hwid);
        assert_eq!(settings.hwid_user_agent, "SSClash");
        assert!(settings.included_interfaces.is_empty());
    }

    #[test]
    fn test_malformed_booleans_are_false() {
        let settings = decode("AUTO_DETECT_LAN=TRUE\nAUTO_DETECT_WAN=1\nBLOCK_QUIC=yes\nENABLE_HWID=true\n");
        assert!(!settings.auto_detect_lan);
        assert!(!settings.auto_detect_wan);
        assert!(!settings.block_quic);
        assert!(settings.enable_hwid);
    }

    #[test]
    fn test_splits_on_first_equals_and_ignores_noise() {
        let settings = decode(
            "# comment\n\
             UNKNOWN_KEY=1\n\
             HWID_USER_AGENT=Agent=1.0\n\
             EXCLUDED_INTERFACES= eth1 , ,wlan0,\n\
             INTERFACE_MODE=bogus\n\
             garbage line\n",
        );

        assert_eq!(settings.hwid_user_agent, "Agent=1.0");
        assert_eq!(settings.excluded_interfaces, vec!["eth1", "wlan0"]);
        assert_eq!(settings.mode, InterfaceMode::Exclude);
    }

    #[test]
    fn test_windows_line_endings() {
        let settings = decode("INTERFACE_MODE=explicit\r\nINCLUDED_INTERFACES=eth1\r\n");
        assert_eq!(settings.mode, InterfaceMode::Explicit);
        assert_eq!(settings.included_interfaces, vec!["eth1"]);
    }
}

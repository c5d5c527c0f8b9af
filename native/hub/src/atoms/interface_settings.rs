// 接口设置原子模块：数据模型、KEY=value 编解码、有效接口集计算与持久化

pub mod codec;
pub mod model;
pub mod selection;
pub mod store;

pub use codec::{decode, encode};
pub use model::{AutoDetectKind, InterfaceMode, Settings};
pub use selection::{
    EffectiveInterfaces, SettingsDraft, decode_interface_list, effective_interfaces,
    encode_interface_list, strip_automatic, validate_interface_name,
};
pub use store::SettingsStore;

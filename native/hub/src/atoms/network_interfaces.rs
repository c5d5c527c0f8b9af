// 网络接口原子模块

pub mod classifier;
pub mod detector;
pub mod enumerator;

// 导出公共接口
pub use classifier::{
    CLASSIFIER_RULES, ClassifierRule, InterfaceCategory, InterfaceDescriptor, NameMatcher,
    classify, classify_all, sort_interfaces,
};
pub use detector::{
    DetectedInterfaces, DetectionPolicy, InterfaceDetector, LanStrategy, WanStrategy,
};
pub use enumerator::{discover_interfaces, enumerate_interface_names};

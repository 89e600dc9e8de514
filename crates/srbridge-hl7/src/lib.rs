//! # SR Bridge HL7
//!
//! 将中间临床记录渲染为HL7 v2.5 ORU^R01消息：
//! - 定界符与转义表（一次构建，只读共享）
//! - MSH/PID/OBR/ZDS/OBX 段组装，固定顺序拼接

pub mod composer;
pub mod escape;

pub use composer::{Hl7Composer, Hl7Settings};
pub use escape::Hl7Encoding;

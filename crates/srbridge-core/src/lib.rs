//! # SR Bridge Core
//!
//! 转换网关的核心模块，提供统一错误定义、中间临床记录模型、
//! JSON 输入适配与通用工具。

pub mod error;
pub mod json;
pub mod record;
pub mod utils;

pub use error::{BridgeError, Result};
pub use record::*;

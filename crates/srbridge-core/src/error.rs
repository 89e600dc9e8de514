//! 错误定义模块

use thiserror::Error;

/// 转换网关统一错误类型
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("数据源缺少必需字段: {0}")]
    MalformedSource(String),

    #[error("无法识别的内容节点类型: {0}")]
    UnsupportedContentNode(String),

    #[error("日期格式错误: {0}")]
    DateFormat(String),

    #[error("DICOM处理错误: {0}")]
    Dicom(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 转换网关统一结果类型
pub type Result<T> = std::result::Result<T, BridgeError>;

//! 内容节点树与所见提取
//!
//! 结构化报告的内容序列建模为带标签变体的节点树，
//! 遍历分支在编译期即可穷尽检查，不依赖运行时类型探测。

use serde::{Deserialize, Serialize};

use srbridge_core::Finding;

/// 概念编码三元组
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodedEntry {
    pub code: String,
    pub scheme: String,
    pub meaning: String,
}

/// 内容节点
///
/// 子节点保持源树顺序，顺序承载语义（如左右侧所见先于总体印象），
/// 任何环节都不得重排。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContentNode {
    /// 容器节点：只组织层级，自身不产出所见
    Container {
        name: String,
        children: Vec<ContentNode>,
    },
    /// 文本值节点：每个非空文本值恰好产出一条所见
    Text {
        name: String,
        value: String,
        children: Vec<ContentNode>,
    },
    /// 编码值节点：仅参与元数据，不产出所见
    Code {
        name: String,
        code: CodedEntry,
        children: Vec<ContentNode>,
    },
}

impl ContentNode {
    /// 子节点切片（按源树顺序）
    pub fn children(&self) -> &[ContentNode] {
        match self {
            ContentNode::Container { children, .. }
            | ContentNode::Text { children, .. }
            | ContentNode::Code { children, .. } => children,
        }
    }
}

/// 按深度优先前序遍历提取文本所见
///
/// 文本节点在被访问的位置产出一条所见，空白文本被排除；
/// 序号从1起连续编号，供OBX段与Observation数组共用。
pub fn extract_findings(nodes: &[ContentNode]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for node in nodes {
        visit(node, &mut findings);
    }
    findings
}

fn visit(node: &ContentNode, findings: &mut Vec<Finding>) {
    if let ContentNode::Text { value, .. } = node {
        let text = value.trim();
        if !text.is_empty() {
            findings.push(Finding {
                index: findings.len() + 1,
                text: text.to_string(),
            });
        }
    }
    for child in node.children() {
        visit(child, findings);
    }
}

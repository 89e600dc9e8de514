//! 结构化报告读取器
//!
//! 打开DICOM SR数据集，提取患者、检查与申请医生元数据，
//! 将 ContentSequence 构建为内容节点树，并归一化为中间临床记录。

use std::path::Path;

use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{open_file, InMemDicomObject};
use tracing::{debug, error, info, warn};

use srbridge_core::utils;
use srbridge_core::{
    BridgeError, ClinicalRecord, Gender, PatientInfo, ProcedureCode, ProviderInfo, Result,
    StudyInfo, DEFAULT_MODALITY, LOINC_SYSTEM,
};

use crate::content::{self, CodedEntry, ContentNode};

/// 结构化报告读取器
pub struct SrReader;

impl SrReader {
    /// 读取SR文件并归一化为中间临床记录
    pub fn read_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<ClinicalRecord> {
        info!("开始读取SR文件: {:?}", path);

        let obj = open_file(path.as_ref()).map_err(|e| {
            error!("DICOM文件解析失败: {:?}", e);
            BridgeError::Dicom(format!("无法解析DICOM文件: {:?}", e))
        })?;

        debug!("SR文件解析成功，开始归一化");
        Self::read_object(&obj)
    }

    /// 从已解析的数据集归一化为中间临床记录
    ///
    /// 患者ID或检查号缺失即整单拒绝，不产生部分输出。
    pub fn read_object(obj: &InMemDicomObject) -> Result<ClinicalRecord> {
        let patient_id = get_string(obj, tags::PATIENT_ID)
            .ok_or_else(|| BridgeError::MalformedSource("PatientID".to_string()))?;
        let accession_number = get_string(obj, tags::ACCESSION_NUMBER)
            .ok_or_else(|| BridgeError::MalformedSource("AccessionNumber".to_string()))?;

        let patient = Self::extract_patient(obj, patient_id);
        let study = Self::extract_study(obj, accession_number);
        let provider = Self::extract_provider(obj);

        let tree = Self::build_content_tree(obj);
        let findings = content::extract_findings(&tree);

        info!(
            "SR归一化完成: 患者ID={}, 检查号={}, 所见数={}",
            patient.id,
            study.accession_number,
            findings.len()
        );

        let record = ClinicalRecord {
            patient,
            study,
            provider,
            findings,
        };
        record.validate()?;
        Ok(record)
    }

    /// 提取患者信息
    fn extract_patient(obj: &InMemDicomObject, patient_id: String) -> PatientInfo {
        // DICOM人名格式: Family^Given^Middle...
        let name_raw = get_string(obj, tags::PATIENT_NAME).unwrap_or_default();
        let mut parts = name_raw.split('^').map(str::trim);
        let family_name = parts.next().unwrap_or_default().to_string();
        let given_names: Vec<String> = parts
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        PatientInfo {
            id: patient_id,
            family_name,
            given_names,
            gender: get_string(obj, tags::PATIENT_SEX)
                .map(|s| Gender::from_source(&s))
                .unwrap_or(Gender::Unknown),
            birth_date: get_string(obj, tags::PATIENT_BIRTH_DATE)
                .and_then(|d| utils::parse_date_lossy(&d, "PatientBirthDate")),
        }
    }

    /// 提取检查信息
    fn extract_study(obj: &InMemDicomObject, accession_number: String) -> StudyInfo {
        StudyInfo {
            study_date: get_string(obj, tags::STUDY_DATE)
                .and_then(|d| utils::parse_date_lossy(&d, "StudyDate")),
            accession_number,
            modality: get_string(obj, tags::MODALITY)
                .unwrap_or_else(|| DEFAULT_MODALITY.to_string()),
            procedure_code: Self::extract_procedure_code(obj),
            study_instance_uid: get_string(obj, tags::STUDY_INSTANCE_UID),
        }
    }

    /// 提取操作代码，缺失时回落到缺省钼靶LOINC三元组
    fn extract_procedure_code(obj: &InMemDicomObject) -> ProcedureCode {
        let defaults = ProcedureCode::default();
        match get_items(obj, tags::PROCEDURE_CODE_SEQUENCE).and_then(|items| items.first()) {
            Some(item) => ProcedureCode {
                code: get_string(item, tags::CODE_VALUE).unwrap_or(defaults.code),
                system: get_string(item, tags::CODING_SCHEME_DESIGNATOR)
                    .map(|scheme| coding_system_uri(&scheme))
                    .unwrap_or(defaults.system),
                display: get_string(item, tags::CODE_MEANING).unwrap_or(defaults.display),
            },
            None => defaults,
        }
    }

    /// 提取申请医生信息，整体缺失时返回None
    fn extract_provider(obj: &InMemDicomObject) -> Option<ProviderInfo> {
        let name = get_string(obj, tags::REFERRING_PHYSICIAN_NAME).map(|raw| {
            // 人名分量以空格连接为显示名
            raw.split('^')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        });
        let department = get_string(obj, tags::INSTITUTIONAL_DEPARTMENT_NAME);

        if name.is_none() && department.is_none() {
            return None;
        }
        Some(ProviderInfo {
            name: name.unwrap_or_default(),
            id: None,
            department,
        })
    }

    /// 构建内容节点树
    fn build_content_tree(obj: &InMemDicomObject) -> Vec<ContentNode> {
        match get_items(obj, tags::CONTENT_SEQUENCE) {
            Some(items) => Self::parse_items(items),
            None => {
                warn!("数据集不含ContentSequence，所见列表为空");
                Vec::new()
            }
        }
    }

    fn parse_items(items: &[InMemDicomObject]) -> Vec<ContentNode> {
        let mut nodes = Vec::new();
        for item in items {
            nodes.extend(Self::parse_item(item));
        }
        nodes
    }

    /// 解析单个内容项
    ///
    /// 无法分类的节点记录警告后跳过，其子节点拼接到父节点的子列表中，
    /// 单个异常节点不丢弃其下层的所见。
    fn parse_item(item: &InMemDicomObject) -> Vec<ContentNode> {
        let name = Self::concept_name(item);
        let children = get_items(item, tags::CONTENT_SEQUENCE)
            .map(Self::parse_items)
            .unwrap_or_default();
        let value_type = get_string(item, tags::VALUE_TYPE).unwrap_or_default();

        match value_type.as_str() {
            "CONTAINER" => vec![ContentNode::Container { name, children }],
            "TEXT" => {
                let value = get_string(item, tags::TEXT_VALUE).unwrap_or_default();
                vec![ContentNode::Text {
                    name,
                    value,
                    children,
                }]
            }
            "CODE" => {
                let code = Self::concept_code(item);
                vec![ContentNode::Code {
                    name,
                    code,
                    children,
                }]
            }
            other => {
                let kind = if other.is_empty() { "<missing>" } else { other };
                let e = BridgeError::UnsupportedContentNode(kind.to_string());
                warn!("跳过内容节点 ({}): {}", name, e);
                children
            }
        }
    }

    /// 概念名称（ConceptNameCodeSequence首项的CodeMeaning）
    fn concept_name(item: &InMemDicomObject) -> String {
        get_items(item, tags::CONCEPT_NAME_CODE_SEQUENCE)
            .and_then(|items| items.first())
            .and_then(|entry| get_string(entry, tags::CODE_MEANING))
            .unwrap_or_default()
    }

    /// 概念编码（ConceptCodeSequence首项）
    fn concept_code(item: &InMemDicomObject) -> CodedEntry {
        match get_items(item, tags::CONCEPT_CODE_SEQUENCE).and_then(|items| items.first()) {
            Some(entry) => CodedEntry {
                code: get_string(entry, tags::CODE_VALUE).unwrap_or_default(),
                scheme: get_string(entry, tags::CODING_SCHEME_DESIGNATOR).unwrap_or_default(),
                meaning: get_string(entry, tags::CODE_MEANING).unwrap_or_default(),
            },
            None => CodedEntry::default(),
        }
    }
}

/// 编码体系指示符 → 编码系统URI
fn coding_system_uri(designator: &str) -> String {
    if designator.eq_ignore_ascii_case("LN") || designator.to_ascii_lowercase().contains("loinc") {
        LOINC_SYSTEM.to_string()
    } else {
        designator.to_string()
    }
}

/// 获取字符串类型元素的值（裁剪空白，空值视为缺失）
pub(crate) fn get_string(obj: &InMemDicomObject, tag: Tag) -> Option<String> {
    match obj.element(tag) {
        Ok(element) => match element.value() {
            Value::Primitive(PrimitiveValue::Str(s)) => normalize(s.to_string()),
            Value::Primitive(PrimitiveValue::Strs(strings)) => {
                strings.first().and_then(|s| normalize(s.to_string()))
            }
            _ => {
                debug!("标签 {:?} 不是字符串类型", tag);
                None
            }
        },
        Err(_) => {
            debug!("未找到标签: {:?}", tag);
            None
        }
    }
}

/// 获取序列类型元素的条目
pub(crate) fn get_items(obj: &InMemDicomObject, tag: Tag) -> Option<&[InMemDicomObject]> {
    match obj.element(tag) {
        Ok(element) => element.value().items(),
        Err(_) => None,
    }
}

fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coding_system_uri() {
        assert_eq!(coding_system_uri("LN"), LOINC_SYSTEM);
        assert_eq!(coding_system_uri("http://loinc.org"), LOINC_SYSTEM);
        assert_eq!(coding_system_uri("SRT"), "SRT");
    }

    #[test]
    fn test_normalize_blank_values() {
        assert_eq!(normalize("  MG ".to_string()), Some("MG".to_string()));
        assert_eq!(normalize("   ".to_string()), None);
        assert_eq!(normalize(String::new()), None);
    }
}

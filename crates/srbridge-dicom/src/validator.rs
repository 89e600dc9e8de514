//! SR文件预检校验
//!
//! 在归一化之前对SR数据集做必备标签与格式检查。
//! 校验结果仅供调用方参考，读取器对消息级必填字段另行把关。

use std::path::Path;

use dicom::dictionary_std::tags;
use dicom::object::{open_file, InMemDicomObject};
use tracing::{debug, info};

use srbridge_core::{utils, BridgeError, Result};

use crate::reader::{get_items, get_string};

/// 校验结果
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }

    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// 是否通过校验（警告不影响通过）
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// SR数据集摘要（供校验使用的标签快照）
#[derive(Debug, Clone, Default)]
pub struct SrSummary {
    pub sop_class_uid: Option<String>,
    pub sop_instance_uid: Option<String>,
    pub study_instance_uid: Option<String>,
    pub series_instance_uid: Option<String>,
    pub patient_id: Option<String>,
    pub accession_number: Option<String>,
    pub modality: Option<String>,
    pub study_date: Option<String>,
    pub has_content_sequence: bool,
}

impl SrSummary {
    /// 从数据集提取摘要
    pub fn from_object(obj: &InMemDicomObject) -> Self {
        Self {
            sop_class_uid: get_string(obj, tags::SOP_CLASS_UID),
            sop_instance_uid: get_string(obj, tags::SOP_INSTANCE_UID),
            study_instance_uid: get_string(obj, tags::STUDY_INSTANCE_UID),
            series_instance_uid: get_string(obj, tags::SERIES_INSTANCE_UID),
            patient_id: get_string(obj, tags::PATIENT_ID),
            accession_number: get_string(obj, tags::ACCESSION_NUMBER),
            modality: get_string(obj, tags::MODALITY),
            study_date: get_string(obj, tags::STUDY_DATE),
            has_content_sequence: get_items(obj, tags::CONTENT_SEQUENCE)
                .map(|items| !items.is_empty())
                .unwrap_or(false),
        }
    }
}

/// SR校验器
pub struct SrValidator;

impl SrValidator {
    /// 打开SR文件并校验
    pub fn validate_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<ValidationResult> {
        let obj = open_file(path.as_ref())
            .map_err(|e| BridgeError::Dicom(format!("无法解析DICOM文件: {:?}", e)))?;
        Ok(Self::validate(&obj))
    }

    /// 校验SR数据集
    pub fn validate(obj: &InMemDicomObject) -> ValidationResult {
        let summary = SrSummary::from_object(obj);
        Self::validate_summary(&summary)
    }

    /// 校验数据集摘要
    pub fn validate_summary(summary: &SrSummary) -> ValidationResult {
        let mut result = ValidationResult::new();

        // 1. 必备UID
        let required_uids = [
            ("SOPClassUID", &summary.sop_class_uid),
            ("SOPInstanceUID", &summary.sop_instance_uid),
            ("StudyInstanceUID", &summary.study_instance_uid),
            ("SeriesInstanceUID", &summary.series_instance_uid),
        ];
        for (name, uid) in required_uids {
            match uid {
                Some(value) if is_valid_uid(value) => {
                    debug!("{} 验证通过: {}", name, value);
                }
                Some(value) => result.add_error(format!("{} 格式无效: {}", name, value)),
                None => result.add_error(format!("{} 缺失", name)),
            }
        }

        // 2. 消息级标识
        if summary.patient_id.is_none() {
            result.add_error("PatientID 缺失".to_string());
        }
        if summary.accession_number.is_none() {
            result.add_error("AccessionNumber 缺失".to_string());
        }

        // 3. 模态必须为SR
        match &summary.modality {
            Some(modality) if modality == "SR" => {}
            Some(modality) => {
                result.add_error(format!("模态应为SR，实际为: {}", modality));
            }
            None => result.add_error("模态信息缺失".to_string()),
        }

        // 4. 检查日期格式（可缺失，格式错误仅告警，归一化时会降级）
        if let Some(study_date) = &summary.study_date {
            if utils::parse_calendar_date(study_date).is_err() {
                result.add_warning(format!("检查日期格式无效: {}", study_date));
            }
        }

        // 5. 内容序列
        if !summary.has_content_sequence {
            result.add_warning("ContentSequence 缺失或为空，将不产出所见".to_string());
        }

        info!(
            "SR校验完成: {} 个错误, {} 个警告",
            result.errors.len(),
            result.warnings.len()
        );
        result
    }
}

/// 检查是否为有效的UID格式
fn is_valid_uid(uid: &str) -> bool {
    if uid.is_empty() || uid.len() > 64 {
        return false;
    }
    if !uid.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return false;
    }
    if uid.starts_with('.') || uid.ends_with('.') || uid.contains("..") {
        return false;
    }
    true
}

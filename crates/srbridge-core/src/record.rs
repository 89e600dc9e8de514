//! 中间临床记录模型
//!
//! 所有转换路径共享的标准化数据结构：DICOM SR 数据集与 JSON 载荷
//! 先归一化为 [`ClinicalRecord`]，再由各格式的组装器只读渲染。
//! 记录在单次转换请求内构建一次，构建后不再修改。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// 缺省钼靶报告操作代码 (LOINC)
pub const DEFAULT_PROCEDURE_CODE: &str = "24606-6";
/// LOINC 编码系统URI
pub const LOINC_SYSTEM: &str = "http://loinc.org";
/// 缺省操作代码显示名
pub const DEFAULT_PROCEDURE_DISPLAY: &str = "Mammogram Diagnostic Report";
/// 缺省检查模态（乳腺钼靶）
pub const DEFAULT_MODALITY: &str = "MG";

/// 行政性别枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    /// 从数据源字符串解析（DICOM 的 M/F/O 或 FHIR 的 male/female/other）
    ///
    /// 无法识别的取值一律归为 [`Gender::Unknown`]，不会报错。
    pub fn from_source(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Gender::Male,
            "f" | "female" => Gender::Female,
            "o" | "other" => Gender::Other,
            _ => Gender::Unknown,
        }
    }

    /// HL7 PID-8 行政性别代码
    pub fn as_hl7(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
            Gender::Unknown => "U",
        }
    }

    /// FHIR administrative-gender 取值
    pub fn as_fhir(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }
}

/// 患者基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInfo {
    pub id: String,                      // 医院内部患者ID，消息级必填
    pub family_name: String,             // 姓
    pub given_names: Vec<String>,        // 名（有序）
    pub gender: Gender,                  // 行政性别
    pub birth_date: Option<NaiveDate>,   // 出生日期
}

/// 操作代码三元组
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureCode {
    pub code: String,
    pub system: String,
    pub display: String,
}

impl Default for ProcedureCode {
    fn default() -> Self {
        Self {
            code: DEFAULT_PROCEDURE_CODE.to_string(),
            system: LOINC_SYSTEM.to_string(),
            display: DEFAULT_PROCEDURE_DISPLAY.to_string(),
        }
    }
}

/// 检查信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyInfo {
    pub study_date: Option<NaiveDate>,
    pub accession_number: String,            // 检查号，消息级唯一业务标识
    pub modality: String,
    pub procedure_code: ProcedureCode,
    pub study_instance_uid: Option<String>,  // DICOM Study Instance UID，供ZDS段引用
}

/// 申请医生信息，整体可缺省
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub id: Option<String>,
    pub department: Option<String>,
}

/// 单条文本观察所见
///
/// `index` 为遍历序号（从1开始），HL7 OBX 段编号与
/// FHIR Observation 数组顺序均以此为准。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub index: usize,
    pub text: String,
}

/// 中间临床记录
///
/// 提取与渲染之间传递的唯一制品，仅承载数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub patient: PatientInfo,
    pub study: StudyInfo,
    pub provider: Option<ProviderInfo>,
    pub findings: Vec<Finding>,
}

impl ClinicalRecord {
    /// 校验消息级必填标识
    ///
    /// 患者ID与检查号缺失属于不可恢复错误，整个转换请求被拒绝。
    pub fn validate(&self) -> Result<()> {
        if self.patient.id.trim().is_empty() {
            return Err(BridgeError::MalformedSource("PatientID".to_string()));
        }
        if self.study.accession_number.trim().is_empty() {
            return Err(BridgeError::MalformedSource("AccessionNumber".to_string()));
        }
        Ok(())
    }

    /// 按遍历顺序迭代所见文本
    pub fn finding_texts(&self) -> impl Iterator<Item = &str> {
        self.findings.iter().map(|f| f.text.as_str())
    }
}

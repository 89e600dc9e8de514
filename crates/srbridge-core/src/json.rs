//! JSON 输入适配与自定义 JSON 输出
//!
//! 同一套线格式结构服务两个方向：解析调用方提交的 JSON 载荷，
//! 以及渲染中间记录的平面 JSON 视图。两条输入路径（DICOM SR 与
//! JSON）由此共享同一个归一化产物，避免提取逻辑分叉。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};
use crate::record::{
    ClinicalRecord, Finding, Gender, PatientInfo, ProcedureCode, ProviderInfo, StudyInfo,
    DEFAULT_MODALITY,
};
use crate::utils;

/// 记录线格式（顶层）
///
/// 顶层未知键（如上传接口附带的 message_type）会被忽略。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordWire {
    pub patient: PatientWire,
    pub study: StudyWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderWire>,
    #[serde(default)]
    pub findings: Vec<FindingWire>,
}

/// 患者块线格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientWire {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Vec<NameWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

/// 人名线格式（given 列表 + family）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameWire {
    #[serde(default)]
    pub given: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

/// 检查块线格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub accession_number: String,
    #[serde(default)]
    pub modality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_code: Option<ProcedureCodeWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_instance_uid: Option<String>,
}

/// 操作代码线格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureCodeWire {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

/// 申请医生块线格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderWire {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// 所见条目线格式
///
/// 入站载荷既可能是纯字符串数组，也可能是带 type/tag 的对象数组，
/// 两种形态都取其文本值；出站渲染一律使用纯字符串。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FindingWire {
    Text(String),
    Entry(FindingEntryWire),
}

/// 对象形态的所见条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingEntryWire {
    #[serde(default)]
    pub value: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl FindingWire {
    fn text(&self) -> &str {
        match self {
            FindingWire::Text(value) => value,
            FindingWire::Entry(entry) => &entry.value,
        }
    }
}

/// 线格式 → 中间记录归一化
fn wire_to_record(wire: RecordWire) -> Result<ClinicalRecord> {
    let name = wire.patient.name.first();
    let patient = PatientInfo {
        id: wire.patient.id.trim().to_string(),
        family_name: name
            .and_then(|n| n.family.clone())
            .unwrap_or_default(),
        given_names: name.map(|n| n.given.clone()).unwrap_or_default(),
        gender: wire
            .patient
            .gender
            .as_deref()
            .map(Gender::from_source)
            .unwrap_or(Gender::Unknown),
        birth_date: wire
            .patient
            .birth_date
            .as_deref()
            .and_then(|d| utils::parse_date_lossy(d, "patient.birth_date")),
    };

    let defaults = ProcedureCode::default();
    let procedure_code = match wire.study.procedure_code {
        Some(pc) => ProcedureCode {
            code: pc.code.unwrap_or(defaults.code),
            system: pc.system.unwrap_or(defaults.system),
            display: pc.display.unwrap_or(defaults.display),
        },
        None => defaults,
    };

    let study = StudyInfo {
        study_date: wire
            .study
            .date
            .as_deref()
            .and_then(|d| utils::parse_date_lossy(d, "study.date")),
        accession_number: wire.study.accession_number.trim().to_string(),
        modality: wire
            .study
            .modality
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODALITY.to_string()),
        procedure_code,
        study_instance_uid: wire
            .study
            .study_instance_uid
            .filter(|uid| !uid.trim().is_empty()),
    };

    let provider = wire.provider.map(|p| ProviderInfo {
        name: p.name.unwrap_or_default(),
        id: p.id,
        department: p.department,
    });

    // 空白所见不进入记录；序号按保留顺序从1起编
    let findings = wire
        .findings
        .iter()
        .map(|f| f.text().trim())
        .filter(|text| !text.is_empty())
        .enumerate()
        .map(|(i, text)| Finding {
            index: i + 1,
            text: text.to_string(),
        })
        .collect();

    let record = ClinicalRecord {
        patient,
        study,
        provider,
        findings,
    };
    record.validate()?;
    Ok(record)
}

/// 中间记录 → 平面线格式
fn record_to_wire(record: &ClinicalRecord) -> RecordWire {
    RecordWire {
        patient: PatientWire {
            id: record.patient.id.clone(),
            name: vec![NameWire {
                given: record.patient.given_names.clone(),
                family: if record.patient.family_name.is_empty() {
                    None
                } else {
                    Some(record.patient.family_name.clone())
                },
            }],
            gender: Some(record.patient.gender.as_fhir().to_string()),
            birth_date: record.patient.birth_date.map(utils::fhir_date),
        },
        study: StudyWire {
            date: record.study.study_date.map(utils::fhir_date),
            accession_number: record.study.accession_number.clone(),
            modality: Some(record.study.modality.clone()),
            procedure_code: Some(ProcedureCodeWire {
                code: Some(record.study.procedure_code.code.clone()),
                system: Some(record.study.procedure_code.system.clone()),
                display: Some(record.study.procedure_code.display.clone()),
            }),
            study_instance_uid: record.study.study_instance_uid.clone(),
        },
        provider: record.provider.as_ref().map(|p| ProviderWire {
            name: Some(p.name.clone()),
            id: p.id.clone(),
            department: p.department.clone(),
        }),
        findings: record
            .findings
            .iter()
            .map(|f| FindingWire::Text(f.text.clone()))
            .collect(),
    }
}

impl ClinicalRecord {
    /// 从JSON字符串归一化为中间记录
    pub fn from_json_str(text: &str) -> Result<Self> {
        let wire: RecordWire = serde_json::from_str(text)?;
        wire_to_record(wire)
    }

    /// 从已解析的JSON值归一化为中间记录
    pub fn from_json_value(value: Value) -> Result<Self> {
        let wire: RecordWire = serde_json::from_value(value)?;
        wire_to_record(wire)
    }

    /// 从JSON文件归一化为中间记录
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// 渲染平面JSON视图（检视/调试用输出）
    pub fn to_custom_json(&self) -> Result<Value> {
        let wire = record_to_wire(self);
        serde_json::to_value(wire).map_err(BridgeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "message_type": "json",
            "patient": {
                "id": "123456",
                "name": [{"given": ["Jane"], "family": "Doe"}],
                "gender": "female",
                "birth_date": "1985-03-15"
            },
            "provider": {
                "id": "PROV001",
                "name": "Dr. Emily Carter",
                "department": "Radiology"
            },
            "study": {
                "date": "2025-05-12",
                "accession_number": "ACC20250512001",
                "modality": "MG",
                "procedure_code": {
                    "code": "24606-6",
                    "system": "http://loinc.org",
                    "display": "Mammogram Diagnostic Report"
                },
                "study_instance_uid": "1.2.840.113619.2.55.3.604688351.100.100.1"
            },
            "findings": [
                "Suspicious mass in right breast, upper outer quadrant.",
                "Left breast tissue appears normal.",
                "BI-RADS 4: Suspicious abnormality. Consider biopsy."
            ]
        })
    }

    #[test]
    fn test_normalize_sample_payload() {
        let record = ClinicalRecord::from_json_value(sample_payload()).unwrap();

        assert_eq!(record.patient.id, "123456");
        assert_eq!(record.patient.family_name, "Doe");
        assert_eq!(record.patient.given_names, vec!["Jane"]);
        assert_eq!(record.patient.gender, Gender::Female);
        assert_eq!(
            record.patient.birth_date.map(utils::hl7_date).as_deref(),
            Some("19850315")
        );
        assert_eq!(record.study.accession_number, "ACC20250512001");
        assert_eq!(record.study.modality, "MG");
        assert_eq!(record.findings.len(), 3);

        // 序号与遍历顺序一致
        let indices: Vec<usize> = record.findings.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(
            record.findings[2].text,
            "BI-RADS 4: Suspicious abnormality. Consider biopsy."
        );
    }

    #[test]
    fn test_typed_finding_entries() {
        // 带 type/tag 的对象形态同样取其文本值
        let mut payload = sample_payload();
        payload["findings"] = json!([
            {"type": "text", "tag": "RESULTTAG", "value": "Suspicious mass."},
            {"type": "html", "tag": "HTMLTAG", "value": "<b>Impression</b>"},
            "   ",
            "Plain string finding."
        ]);

        let record = ClinicalRecord::from_json_value(payload).unwrap();
        let texts: Vec<&str> = record.finding_texts().collect();
        assert_eq!(
            texts,
            vec!["Suspicious mass.", "<b>Impression</b>", "Plain string finding."]
        );
    }

    #[test]
    fn test_missing_accession_rejected() {
        let mut payload = sample_payload();
        payload["study"]
            .as_object_mut()
            .unwrap()
            .remove("accession_number");

        let result = ClinicalRecord::from_json_value(payload);
        assert!(matches!(
            result,
            Err(BridgeError::MalformedSource(field)) if field == "AccessionNumber"
        ));
    }

    #[test]
    fn test_missing_provider_tolerated() {
        let mut payload = sample_payload();
        payload.as_object_mut().unwrap().remove("provider");

        let record = ClinicalRecord::from_json_value(payload).unwrap();
        assert!(record.provider.is_none());
    }

    #[test]
    fn test_malformed_date_degrades() {
        let mut payload = sample_payload();
        payload["study"]["date"] = json!("2025135");
        payload["patient"]["birth_date"] = json!("85-03-15");

        let record = ClinicalRecord::from_json_value(payload).unwrap();
        assert!(record.study.study_date.is_none());
        assert!(record.patient.birth_date.is_none());
    }

    #[test]
    fn test_custom_json_round_trip() {
        let record = ClinicalRecord::from_json_value(sample_payload()).unwrap();
        let rendered = record.to_custom_json().unwrap();

        assert_eq!(rendered["patient"]["id"], "123456");
        assert_eq!(rendered["patient"]["gender"], "female");
        assert_eq!(rendered["study"]["accession_number"], "ACC20250512001");
        assert_eq!(rendered["study"]["date"], "2025-05-12");
        assert_eq!(rendered["provider"]["department"], "Radiology");

        // 所见渲染为纯字符串数组，顺序保持
        let findings = rendered["findings"].as_array().unwrap();
        assert_eq!(findings.len(), 3);
        assert_eq!(
            findings[1],
            json!("Left breast tissue appears normal.")
        );

        // 平面视图可直接再次归一化
        let reparsed = ClinicalRecord::from_json_value(rendered).unwrap();
        assert_eq!(reparsed.findings.len(), record.findings.len());
    }
}

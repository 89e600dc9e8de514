//! FHIR 资源线格式模型
//!
//! 按FHIR JSON线格式定义的serde结构，字段名统一重命名为camelCase，
//! 可缺省字段序列化时省略。

use serde::{Deserialize, Serialize};

/// 编码项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    pub display: String,
}

/// 可编码概念
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeableConcept {
    pub coding: Vec<Coding>,
}

/// 资源引用，形如 "<ResourceType>/<id>"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub reference: String,
}

/// 业务标识符
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub system: String,
    pub value: String,
}

/// 人名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
}

/// 生成的可读摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    pub status: String,
    pub div: String,
}

/// 执行者（仅显示名形式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Performer {
    pub display: String,
}

/// Patient 资源
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientResource {
    pub resource_type: String,
    pub id: String,
    pub identifier: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Narrative>,
}

/// Observation 资源（每条所见一个）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationResource {
    pub resource_type: String,
    pub id: String,
    pub status: String,
    pub code: CodeableConcept,
    pub subject: Reference,
    pub value_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub performer: Vec<Performer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Narrative>,
}

/// DiagnosticReport 资源
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReportResource {
    pub resource_type: String,
    pub id: String,
    pub status: String,
    pub code: CodeableConcept,
    pub subject: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,
    pub issued: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub performer: Vec<Performer>,
    pub result: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Narrative>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_wire_names() {
        let patient = PatientResource {
            resource_type: "Patient".to_string(),
            id: "abc".to_string(),
            identifier: vec![Identifier {
                system: "http://hospital.smarthealth.org/patient-id".to_string(),
                value: "123456".to_string(),
            }],
            name: Vec::new(),
            gender: "female".to_string(),
            birth_date: Some("1985-03-15".to_string()),
            text: None,
        };

        let value = serde_json::to_value(&patient).unwrap();
        assert_eq!(value["resourceType"], "Patient");
        assert_eq!(value["birthDate"], "1985-03-15");
        // 空的name与text不出现在线格式中
        assert!(value.get("name").is_none());
        assert!(value.get("text").is_none());
    }
}

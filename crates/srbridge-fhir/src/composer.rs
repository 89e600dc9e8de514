//! FHIR 资源组装器
//!
//! 从同一份中间记录组装 Patient、Observation×N 与 DiagnosticReport，
//! 资源标识符每次转换生成一次，同一输出内的交叉引用保持一致。

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use srbridge_core::utils;
use srbridge_core::{ClinicalRecord, Finding, LOINC_SYSTEM};

use crate::resources::{
    CodeableConcept, Coding, DiagnosticReportResource, HumanName, Identifier, Narrative,
    ObservationResource, PatientResource, Performer, Reference,
};

/// 组装配置
///
/// 编码常量与标识符系统URI，一次构建后只读传入组装器。
#[derive(Debug, Clone)]
pub struct FhirSettings {
    pub patient_identifier_system: String,
    pub study_identifier_system: String,
    pub finding_code: String,
    pub finding_display: String,
    pub observation_performer: String,
}

impl Default for FhirSettings {
    fn default() -> Self {
        Self {
            patient_identifier_system: "http://hospital.smarthealth.org/patient-id".to_string(),
            study_identifier_system: "urn:dicom:uid".to_string(),
            finding_code: "24606-6".to_string(),
            finding_display: "MG Breast Screening".to_string(),
            observation_performer: "Radiologist System".to_string(),
        }
    }
}

/// 单次转换的资源集合
///
/// 序列化形态即返回给调用方的资源类型映射；
/// 是否再包一层Bundle由调用方决定（见 [`crate::bundle`]）。
#[derive(Debug, Clone, Serialize)]
pub struct FhirReportSet {
    pub patient: PatientResource,
    pub observations: Vec<ObservationResource>,
    pub diagnostic_report: DiagnosticReportResource,
}

/// FHIR 资源组装器
pub struct FhirComposer {
    settings: FhirSettings,
}

impl Default for FhirComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl FhirComposer {
    /// 创建使用缺省配置的组装器
    pub fn new() -> Self {
        Self::with_settings(FhirSettings::default())
    }

    /// 创建使用指定配置的组装器
    pub fn with_settings(settings: FhirSettings) -> Self {
        Self { settings }
    }

    /// 组装资源集合（签发时间取当前时间）
    pub fn compose(&self, record: &ClinicalRecord) -> FhirReportSet {
        self.compose_at(record, Utc::now())
    }

    /// 组装资源集合（显式指定签发时间）
    pub fn compose_at(&self, record: &ClinicalRecord, issued: DateTime<Utc>) -> FhirReportSet {
        let patient = self.build_patient(record);
        let observations = self.build_observations(record, &patient.id);
        let diagnostic_report = self.build_report(record, &patient.id, &observations, issued);

        info!(
            "FHIR资源组装完成: Patient={}, Observation数={}",
            patient.id,
            observations.len()
        );
        FhirReportSet {
            patient,
            observations,
            diagnostic_report,
        }
    }

    /// Patient 资源
    fn build_patient(&self, record: &ClinicalRecord) -> PatientResource {
        let patient = &record.patient;

        let name = if patient.family_name.is_empty() && patient.given_names.is_empty() {
            Vec::new()
        } else {
            vec![HumanName {
                family: if patient.family_name.is_empty() {
                    None
                } else {
                    Some(patient.family_name.clone())
                },
                given: patient.given_names.clone(),
            }]
        };

        let display_name = patient
            .given_names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(patient.family_name.as_str()))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        PatientResource {
            resource_type: "Patient".to_string(),
            id: utils::generate_resource_id(),
            identifier: vec![Identifier {
                system: self.settings.patient_identifier_system.clone(),
                value: patient.id.clone(),
            }],
            name,
            gender: patient.gender.as_fhir().to_string(),
            birth_date: patient.birth_date.map(utils::fhir_date),
            text: Some(narrative(format!(
                "Patient: {} (ID: {})",
                display_name, patient.id
            ))),
        }
    }

    /// Observation 资源（顺序与所见遍历顺序一致）
    fn build_observations(
        &self,
        record: &ClinicalRecord,
        patient_id: &str,
    ) -> Vec<ObservationResource> {
        record
            .findings
            .iter()
            .map(|finding| self.build_observation(record, patient_id, finding))
            .collect()
    }

    fn build_observation(
        &self,
        record: &ClinicalRecord,
        patient_id: &str,
        finding: &Finding,
    ) -> ObservationResource {
        ObservationResource {
            resource_type: "Observation".to_string(),
            id: utils::generate_resource_id(),
            status: "final".to_string(),
            code: CodeableConcept {
                coding: vec![Coding {
                    system: LOINC_SYSTEM.to_string(),
                    code: self.settings.finding_code.clone(),
                    display: self.settings.finding_display.clone(),
                }],
            },
            subject: patient_reference(patient_id),
            value_string: finding.text.clone(),
            effective_date_time: record.study.study_date.map(utils::fhir_date),
            performer: vec![Performer {
                display: self.settings.observation_performer.clone(),
            }],
            text: Some(narrative(format!(
                "Observation: {} - {}",
                self.settings.finding_display, finding.text
            ))),
        }
    }

    /// DiagnosticReport 资源
    fn build_report(
        &self,
        record: &ClinicalRecord,
        patient_id: &str,
        observations: &[ObservationResource],
        issued: DateTime<Utc>,
    ) -> DiagnosticReportResource {
        let code = &record.study.procedure_code;

        // 结果引用保持所见顺序
        let result = observations
            .iter()
            .map(|obs| Reference {
                reference: format!("Observation/{}", obs.id),
            })
            .collect();

        let performer = match &record.provider {
            Some(provider) if !provider.name.is_empty() => vec![Performer {
                display: provider.name.clone(),
            }],
            _ => Vec::new(),
        };

        let identifier = record
            .study
            .study_instance_uid
            .as_ref()
            .map(|uid| {
                vec![Identifier {
                    system: self.settings.study_identifier_system.clone(),
                    value: uid.clone(),
                }]
            })
            .unwrap_or_default();

        DiagnosticReportResource {
            resource_type: "DiagnosticReport".to_string(),
            id: utils::generate_resource_id(),
            status: "final".to_string(),
            code: CodeableConcept {
                coding: vec![Coding {
                    system: code.system.clone(),
                    code: code.code.clone(),
                    display: code.display.clone(),
                }],
            },
            subject: patient_reference(patient_id),
            effective_date_time: record.study.study_date.map(utils::fhir_date),
            issued: issued.to_rfc3339_opts(SecondsFormat::Secs, true),
            performer,
            result,
            identifier,
            text: Some(narrative(format!("Diagnostic Report: {}", code.display))),
        }
    }
}

fn patient_reference(patient_id: &str) -> Reference {
    Reference {
        reference: format!("Patient/{}", patient_id),
    }
}

fn narrative(summary: String) -> Narrative {
    Narrative {
        status: "generated".to_string(),
        div: format!("<div xmlns=\"http://www.w3.org/1999/xhtml\">{}</div>", summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use srbridge_core::{
        Gender, PatientInfo, ProcedureCode, ProviderInfo, StudyInfo, DEFAULT_MODALITY,
    };

    fn sample_record() -> ClinicalRecord {
        ClinicalRecord {
            patient: PatientInfo {
                id: "123456".to_string(),
                family_name: "Doe".to_string(),
                given_names: vec!["Jane".to_string()],
                gender: Gender::Female,
                birth_date: NaiveDate::from_ymd_opt(1985, 3, 15),
            },
            study: StudyInfo {
                study_date: NaiveDate::from_ymd_opt(2025, 5, 12),
                accession_number: "ACC20250512001".to_string(),
                modality: DEFAULT_MODALITY.to_string(),
                procedure_code: ProcedureCode::default(),
                study_instance_uid: Some(
                    "1.2.840.113619.2.55.3.604688351.100.100.1".to_string(),
                ),
            },
            provider: Some(ProviderInfo {
                name: "Dr. Emily Carter".to_string(),
                id: Some("PROV001".to_string()),
                department: Some("Radiology".to_string()),
            }),
            findings: vec![
                Finding {
                    index: 1,
                    text: "Suspicious mass in right breast, upper outer quadrant.".to_string(),
                },
                Finding {
                    index: 2,
                    text: "Left breast tissue appears normal.".to_string(),
                },
                Finding {
                    index: 3,
                    text: "BI-RADS 4: Suspicious abnormality. Consider biopsy.".to_string(),
                },
            ],
        }
    }

    fn fixed_issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 12, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_resource_counts_and_order() {
        let record = sample_record();
        let set = FhirComposer::new().compose_at(&record, fixed_issued());

        assert_eq!(set.observations.len(), 3);
        let values: Vec<&str> = set
            .observations
            .iter()
            .map(|obs| obs.value_string.as_str())
            .collect();
        let expected: Vec<&str> = record.finding_texts().collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_cross_references_consistent() {
        let set = FhirComposer::new().compose_at(&sample_record(), fixed_issued());
        let patient_ref = format!("Patient/{}", set.patient.id);

        for obs in &set.observations {
            assert_eq!(obs.subject.reference, patient_ref);
        }
        assert_eq!(set.diagnostic_report.subject.reference, patient_ref);

        // 结果引用逐一指向对应Observation，顺序一致
        assert_eq!(set.diagnostic_report.result.len(), set.observations.len());
        for (reference, obs) in set.diagnostic_report.result.iter().zip(&set.observations) {
            assert_eq!(reference.reference, format!("Observation/{}", obs.id));
        }
    }

    #[test]
    fn test_patient_resource_fields() {
        let set = FhirComposer::new().compose_at(&sample_record(), fixed_issued());
        let patient = &set.patient;

        assert_eq!(patient.resource_type, "Patient");
        assert_eq!(patient.identifier[0].value, "123456");
        assert_eq!(patient.gender, "female");
        assert_eq!(patient.birth_date.as_deref(), Some("1985-03-15"));
        assert_eq!(patient.name[0].family.as_deref(), Some("Doe"));
        assert_eq!(patient.name[0].given, vec!["Jane"]);
        assert!(patient
            .text
            .as_ref()
            .unwrap()
            .div
            .contains("Patient: Jane Doe (ID: 123456)"));
    }

    #[test]
    fn test_report_fields() {
        let set = FhirComposer::new().compose_at(&sample_record(), fixed_issued());
        let report = &set.diagnostic_report;

        assert_eq!(report.status, "final");
        assert_eq!(report.code.coding[0].code, "24606-6");
        assert_eq!(report.code.coding[0].system, LOINC_SYSTEM);
        assert_eq!(report.issued, "2025-05-12T10:30:00Z");
        assert_eq!(report.effective_date_time.as_deref(), Some("2025-05-12"));
        assert_eq!(report.performer[0].display, "Dr. Emily Carter");
        assert_eq!(report.identifier[0].system, "urn:dicom:uid");
    }

    #[test]
    fn test_missing_provider_omits_performer() {
        let mut record = sample_record();
        record.provider = None;

        let set = FhirComposer::new().compose_at(&record, fixed_issued());
        assert!(set.diagnostic_report.performer.is_empty());

        // 序列化后performer键整体省略
        let value = serde_json::to_value(&set.diagnostic_report).unwrap();
        assert!(value.get("performer").is_none());
    }

    #[test]
    fn test_unknown_gender_and_missing_birth_date() {
        let mut record = sample_record();
        record.patient.gender = Gender::Unknown;
        record.patient.birth_date = None;

        let set = FhirComposer::new().compose_at(&record, fixed_issued());
        assert_eq!(set.patient.gender, "unknown");
        assert!(set.patient.birth_date.is_none());

        let value = serde_json::to_value(&set.patient).unwrap();
        assert!(value.get("birthDate").is_none());
    }

    #[test]
    fn test_fresh_identifiers_per_composition() {
        let record = sample_record();
        let composer = FhirComposer::new();
        let first = composer.compose_at(&record, fixed_issued());
        let second = composer.compose_at(&record, fixed_issued());

        // 标识符每次转换重新生成
        assert_ne!(first.patient.id, second.patient.id);
        assert_ne!(first.diagnostic_report.id, second.diagnostic_report.id);

        // 除标识符与引用外结构一致
        assert_eq!(first.observations.len(), second.observations.len());
        for (a, b) in first.observations.iter().zip(&second.observations) {
            assert_ne!(a.id, b.id);
            assert_eq!(a.value_string, b.value_string);
            assert_eq!(a.code.coding[0].code, b.code.coding[0].code);
        }
        assert_eq!(first.diagnostic_report.issued, second.diagnostic_report.issued);
    }

    #[test]
    fn test_report_set_mapping_shape() {
        let set = FhirComposer::new().compose_at(&sample_record(), fixed_issued());
        let value = serde_json::to_value(&set).unwrap();

        assert_eq!(value["patient"]["resourceType"], "Patient");
        assert_eq!(value["observations"].as_array().unwrap().len(), 3);
        assert_eq!(
            value["diagnostic_report"]["resourceType"],
            "DiagnosticReport"
        );
        assert_eq!(value["observations"][0]["valueString"].as_str().unwrap(),
            "Suspicious mass in right breast, upper outer quadrant.");
    }
}

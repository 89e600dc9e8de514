//! ORU^R01 消息组装器
//!
//! 段与段之间没有分支依赖，按固定顺序各自从同一份中间记录渲染：
//! MSH → PID → OBR → ZDS → OBX(1..N)，以单个换行符拼接。

use chrono::{DateTime, Utc};
use tracing::info;

use srbridge_core::utils;
use srbridge_core::{ClinicalRecord, Finding, LOINC_SYSTEM};

use crate::escape::Hl7Encoding;

/// 消息类型字面量
const MESSAGE_TYPE: &str = "ORU^R01";
/// OBX-3 固定的所见类型标识
const FINDING_OBSERVATION_ID: &str = "RESULTSTAG^^AIENGINE";

/// 消息头配置
///
/// 收发方占位符与固定字面量，一次构建后只读传入组装器。
#[derive(Debug, Clone)]
pub struct Hl7Settings {
    pub sending_application: String,
    pub sending_facility: String,
    pub receiving_application: String,
    pub receiving_facility: String,
    pub processing_id: String,
    pub version_id: String,
    pub accept_ack_type: String,
    pub application_ack_type: String,
    pub country_code: String,
    pub character_set: String,
}

impl Default for Hl7Settings {
    fn default() -> Self {
        Self {
            sending_application: "SRBRIDGE".to_string(),
            sending_facility: "HOSPITAL".to_string(),
            receiving_application: "HL7_RECEIVER".to_string(),
            receiving_facility: "HOSPITAL".to_string(),
            processing_id: "P".to_string(),
            version_id: "2.5".to_string(),
            accept_ack_type: "AL".to_string(),
            application_ack_type: "NE".to_string(),
            country_code: "USA".to_string(),
            character_set: "UNICODE UTF-8".to_string(),
        }
    }
}

/// ORU^R01 消息组装器
pub struct Hl7Composer {
    settings: Hl7Settings,
    encoding: Hl7Encoding,
}

impl Default for Hl7Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Hl7Composer {
    /// 创建使用缺省配置的组装器
    pub fn new() -> Self {
        Self::with_settings(Hl7Settings::default())
    }

    /// 创建使用指定配置的组装器
    pub fn with_settings(settings: Hl7Settings) -> Self {
        Self {
            settings,
            encoding: Hl7Encoding::new(),
        }
    }

    /// 组装完整消息（消息时间戳取当前时间）
    pub fn compose(&self, record: &ClinicalRecord) -> String {
        self.compose_at(record, Utc::now())
    }

    /// 组装完整消息（显式指定消息时间戳）
    ///
    /// 同一记录与同一时间戳的输出逐字节一致。
    pub fn compose_at(&self, record: &ClinicalRecord, at: DateTime<Utc>) -> String {
        let mut segments = vec![
            self.build_msh(record, at),
            self.build_pid(record),
            self.build_obr(record),
            self.build_zds(record),
        ];
        for finding in &record.findings {
            segments.push(self.build_obx(finding));
        }

        info!(
            "HL7消息组装完成: 控制ID={}, OBX段数={}",
            record.study.accession_number,
            record.findings.len()
        );
        segments.join("\n")
    }

    /// MSH 消息头段
    fn build_msh(&self, record: &ClinicalRecord, at: DateTime<Utc>) -> String {
        let s = &self.settings;
        let fields = vec![
            "MSH".to_string(),
            self.encoding.encoding_characters(),
            s.sending_application.clone(),
            s.sending_facility.clone(),
            s.receiving_application.clone(),
            s.receiving_facility.clone(),
            utils::hl7_timestamp(at),
            String::new(),
            MESSAGE_TYPE.to_string(),
            // 消息控制ID复用检查号，同一记录的输出保持确定性
            record.study.accession_number.clone(),
            s.processing_id.clone(),
            s.version_id.clone(),
            String::new(),
            String::new(),
            s.accept_ack_type.clone(),
            s.application_ack_type.clone(),
            s.country_code.clone(),
            s.character_set.clone(),
        ];
        self.join_fields(fields)
    }

    /// PID 患者标识段
    fn build_pid(&self, record: &ClinicalRecord) -> String {
        let patient = &record.patient;
        let mut fields = vec![String::new(); 18];
        fields[0] = "PID".to_string();
        fields[1] = "1".to_string();
        fields[3] = self.encoding.escape(&patient.id);
        fields[5] = self.build_person_name(&patient.family_name, &patient.given_names);
        fields[7] = patient.birth_date.map(utils::hl7_date).unwrap_or_default();
        fields[8] = patient.gender.as_hl7().to_string();
        self.join_fields(fields)
    }

    /// OBR 检查申请段
    fn build_obr(&self, record: &ClinicalRecord) -> String {
        let study = &record.study;
        let code = &study.procedure_code;

        let mut fields = vec![String::new(); 25];
        fields[0] = "OBR".to_string();
        fields[1] = "1".to_string();
        // OBR-3: 填充方订单号 = 检查号
        fields[3] = self.encoding.escape(&study.accession_number);
        // OBR-4: 通用服务标识 code^display^体系标签
        fields[4] = format!(
            "{}{sep}{}{sep}{}",
            self.encoding.escape(&code.code),
            self.encoding.escape(&code.display),
            coding_scheme_label(&code.system),
            sep = self.encoding.component_separator,
        );
        // OBR-7: 观察日期时间（检查日期 + 零时刻）
        fields[7] = study
            .study_date
            .map(|d| format!("{}000000", utils::hl7_date(d)))
            .unwrap_or_default();
        // OBR-16: 申请医生，整体缺省时留空
        fields[16] = match &record.provider {
            Some(provider) => format!(
                "{}{}{}",
                self.encoding
                    .escape(provider.id.as_deref().unwrap_or_default()),
                self.encoding.component_separator,
                self.encoding.escape(&provider.name),
            ),
            None => String::new(),
        };
        // OBR-18: 检查号副本，便于下游按占位字段关联
        fields[18] = self.encoding.escape(&study.accession_number);
        // OBR-24: 诊断服务科别 = 模态
        fields[24] = self.encoding.escape(&study.modality);
        self.join_fields(fields)
    }

    /// ZDS 检查实例引用段
    ///
    /// 即使下游没有进一步的引用系统也始终发出，保留跨系统检查关联。
    fn build_zds(&self, record: &ClinicalRecord) -> String {
        let uid = record.study.study_instance_uid.as_deref().unwrap_or_default();
        self.join_fields(vec!["ZDS".to_string(), uid.to_string()])
    }

    /// OBX 观察结果段（每条所见一段，序号从1起）
    fn build_obx(&self, finding: &Finding) -> String {
        let mut fields = vec![String::new(); 12];
        fields[0] = "OBX".to_string();
        fields[1] = finding.index.to_string();
        fields[2] = "TX".to_string();
        fields[3] = FINDING_OBSERVATION_ID.to_string();
        fields[5] = self.encoding.escape(&finding.text);
        fields[11] = "F".to_string();
        self.join_fields(fields)
    }

    /// 人名字段 Family^Given；姓缺失时仅保留名
    fn build_person_name(&self, family: &str, given_names: &[String]) -> String {
        let given = given_names.first().map(String::as_str).unwrap_or_default();
        if family.is_empty() {
            self.encoding.escape(given)
        } else {
            format!(
                "{}{}{}",
                self.encoding.escape(family),
                self.encoding.component_separator,
                self.encoding.escape(given),
            )
        }
    }

    fn join_fields(&self, fields: Vec<String>) -> String {
        fields.join(&self.encoding.field_separator.to_string())
    }
}

/// 编码系统URI → OBR-4 编码体系标签
fn coding_scheme_label(system: &str) -> String {
    if system == LOINC_SYSTEM || system.to_ascii_lowercase().contains("loinc") {
        "LN".to_string()
    } else {
        system.to_string()
    }
}

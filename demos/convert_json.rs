//! JSON载荷转换演示程序
//!
//! 展示转换网关的JSON输入路径：
//! - JSON载荷归一化为中间临床记录
//! - 渲染HL7 ORU^R01消息、FHIR资源图与平面JSON视图

use anyhow::Result;
use serde_json::json;
use srbridge_core::ClinicalRecord;
use srbridge_fhir::FhirComposer;
use srbridge_hl7::Hl7Composer;
use tracing::info;
use tracing_subscriber;

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    info!("🚀 启动JSON载荷转换演示");

    let payload = json!({
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
    });

    let record = ClinicalRecord::from_json_value(payload)?;
    info!("归一化完成: 检查号={}, 所见数={}",
        record.study.accession_number, record.findings.len());

    let hl7 = Hl7Composer::new().compose(&record);
    println!("=== HL7 ORU^R01 ===\n{}\n", hl7);

    let fhir = FhirComposer::new().compose(&record);
    println!(
        "=== FHIR DiagnosticReport ===\n{}\n",
        serde_json::to_string_pretty(&fhir)?
    );

    let custom = record.to_custom_json()?;
    println!("=== 平面JSON ===\n{}", serde_json::to_string_pretty(&custom)?);

    info!("✅ 转换演示完成");
    Ok(())
}

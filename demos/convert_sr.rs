//! DICOM SR文件转换演示程序
//!
//! 用法: convert_sr <SR文件路径> [hl7|fhir|json]
//!
//! 先做SR预检校验（仅供参考），再归一化并渲染所选格式。

use anyhow::{Context, Result};
use srbridge_core::ClinicalRecord;
use srbridge_dicom::{SrReader, SrValidator};
use srbridge_fhir::FhirComposer;
use srbridge_hl7::Hl7Composer;
use tracing::{info, warn};
use tracing_subscriber;

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let path = std::env::args()
        .nth(1)
        .context("用法: convert_sr <SR文件路径> [hl7|fhir|json]")?;
    let format = std::env::args().nth(2).unwrap_or_else(|| "hl7".to_string());

    info!("🚀 启动SR文件转换演示: {}", path);

    // 预检校验
    let report = SrValidator::validate_file(&path)?;
    for warning in &report.warnings {
        warn!("预检告警: {}", warning);
    }
    for error in &report.errors {
        warn!("预检错误: {}", error);
    }

    // 归一化（必填字段由读取器把关）
    let record = SrReader::read_file(&path)?;
    print_record(&record, &format)?;

    info!("✅ 转换演示完成");
    Ok(())
}

fn print_record(record: &ClinicalRecord, format: &str) -> Result<()> {
    match format {
        "fhir" => {
            let set = FhirComposer::new().compose(record);
            println!("{}", serde_json::to_string_pretty(&set)?);
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&record.to_custom_json()?)?);
        }
        _ => {
            println!("{}", Hl7Composer::new().compose(record));
        }
    }
    Ok(())
}

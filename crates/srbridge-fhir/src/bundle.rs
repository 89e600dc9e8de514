//! collection Bundle 打包助手
//!
//! 组装器的契约是资源类型映射；是否再包一层Bundle由调用方决定。
//! 这里提供可选的打包函数，条目顺序为 Patient → Observation×N →
//! DiagnosticReport，fullUrl 使用 urn:uuid 形式。

use serde_json::{json, Value};

use srbridge_core::Result;

use crate::composer::FhirReportSet;

impl FhirReportSet {
    /// 打包为 collection 类型的 Bundle
    pub fn into_collection_bundle(self) -> Result<Value> {
        let mut entries = Vec::with_capacity(self.observations.len() + 2);

        entries.push(bundle_entry(
            &self.patient.id,
            serde_json::to_value(&self.patient)?,
        ));
        for observation in &self.observations {
            entries.push(bundle_entry(
                &observation.id,
                serde_json::to_value(observation)?,
            ));
        }
        entries.push(bundle_entry(
            &self.diagnostic_report.id,
            serde_json::to_value(&self.diagnostic_report)?,
        ));

        Ok(json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": entries,
        }))
    }
}

fn bundle_entry(id: &str, resource: Value) -> Value {
    json!({
        "fullUrl": format!("urn:uuid:{}", id),
        "resource": resource,
    })
}

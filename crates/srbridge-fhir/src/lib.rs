//! # SR Bridge FHIR
//!
//! 将中间临床记录渲染为FHIR资源图：
//! - Patient / Observation×N / DiagnosticReport 线格式模型
//! - 资源组装与交叉引用（本地生成的稳定标识符）
//! - 可选的 collection Bundle 打包助手

pub mod bundle;
pub mod composer;
pub mod resources;

pub use composer::{FhirComposer, FhirReportSet, FhirSettings};
pub use resources::{
    CodeableConcept, Coding, DiagnosticReportResource, HumanName, Identifier, Narrative,
    ObservationResource, PatientResource, Performer, Reference,
};

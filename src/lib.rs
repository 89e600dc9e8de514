//! # SR Bridge
//!
//! 乳腺钼靶结构化报告转换网关：将DICOM SR数据集或等价JSON载荷
//! 归一化为中间临床记录，再渲染为HL7 ORU^R01消息、FHIR
//! DiagnosticReport资源图或平面JSON视图。
//!
//! 调用方（HTTP层等）提供数据源并选择输出格式；各组装器相互独立，
//! 互不依赖彼此的输出，单次转换内不共享任何可变状态。

pub use srbridge_core::{BridgeError, ClinicalRecord, Result};
pub use srbridge_dicom::{SrReader, SrValidator};
pub use srbridge_fhir::{FhirComposer, FhirReportSet};
pub use srbridge_hl7::Hl7Composer;

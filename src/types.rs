// src/types.rs
// 跨越 worker 边界的消息类型
use std::fmt;
use serde::{Deserialize, Serialize};
use crate::sigpro::{
    ChannelSegment, EventBeam, EventBeamRequest, FkAttributes, FkComputeInput, FkSpectra,
    LegacyFkPowerSpectra, PipelineError,
};
use crate::store::StoreSnapshot;
use crate::weavess::{PositionBuffer, PositionBufferRequest, RecordSection, RecordSectionRequest};
// 请求关联标识，序列化为 "rpc-<n>"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RequestId(pub u64);
impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc-{}", self.0)
    }
}
impl From<RequestId> for String {
    fn from(value: RequestId) -> Self {
        value.to_string()
    }
}
impl TryFrom<String> for RequestId {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .strip_prefix("rpc-")
            .and_then(|n| n.parse().ok())
            .map(RequestId)
            .ok_or_else(|| format!("malformed request id {value:?}"))
    }
}
// FK 计算的完整输入：配置 + 通道数据
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkComputeRequest {
    pub input: FkComputeInput,
    pub channels: Vec<ChannelSegment>,
}
// worker 支持的全部操作，一个变体对应一个处理函数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    CreatePositionBuffer(PositionBufferRequest),
    CreateRecordSectionPositionBuffer(RecordSectionRequest),
    ComputeFkSpectra(FkComputeRequest),
    GetPeakFkAttributes(FkSpectra),
    ComputeLegacyFkSpectra(FkComputeRequest),
    ExportWaveformStore,
    ImportWaveformStore(StoreSnapshot),
    FetchEventBeamsByEventHypothesisAndStations(EventBeamRequest),
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreatePositionBuffer,
    CreateRecordSectionPositionBuffer,
    ComputeFkSpectra,
    GetPeakFkAttributes,
    ComputeLegacyFkSpectra,
    ExportWaveformStore,
    ImportWaveformStore,
    FetchEventBeamsByEventHypothesisAndStations,
}
impl OperationKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            OperationKind::CreatePositionBuffer => "CREATE_POSITION_BUFFER",
            OperationKind::CreateRecordSectionPositionBuffer => "CREATE_RECORD_SECTION_POSITION_BUFFER",
            OperationKind::ComputeFkSpectra => "COMPUTE_FK_SPECTRA",
            OperationKind::GetPeakFkAttributes => "GET_PEAK_FK_ATTRIBUTES",
            OperationKind::ComputeLegacyFkSpectra => "COMPUTE_LEGACY_FK_SPECTRA",
            OperationKind::ExportWaveformStore => "EXPORT_WAVEFORM_STORE",
            OperationKind::ImportWaveformStore => "IMPORT_WAVEFORM_STORE",
            OperationKind::FetchEventBeamsByEventHypothesisAndStations => {
                "FETCH_EVENT_BEAMS_BY_EVENT_HYPOTHESIS_AND_STATIONS"
            }
        }
    }
}
impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}
impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::CreatePositionBuffer(_) => OperationKind::CreatePositionBuffer,
            Operation::CreateRecordSectionPositionBuffer(_) => {
                OperationKind::CreateRecordSectionPositionBuffer
            }
            Operation::ComputeFkSpectra(_) => OperationKind::ComputeFkSpectra,
            Operation::GetPeakFkAttributes(_) => OperationKind::GetPeakFkAttributes,
            Operation::ComputeLegacyFkSpectra(_) => OperationKind::ComputeLegacyFkSpectra,
            Operation::ExportWaveformStore => OperationKind::ExportWaveformStore,
            Operation::ImportWaveformStore(_) => OperationKind::ImportWaveformStore,
            Operation::FetchEventBeamsByEventHypothesisAndStations(_) => {
                OperationKind::FetchEventBeamsByEventHypothesisAndStations
            }
        }
    }
}
// worker 返回的结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationResult {
    PositionBuffer(PositionBuffer),
    RecordSection(RecordSection),
    FkSpectra(FkSpectra),
    FkAttributes(FkAttributes),
    LegacyFkSpectra(LegacyFkPowerSpectra),
    WaveformStore(StoreSnapshot),
    Imported { count: usize },
    EventBeams(Vec<EventBeam>),
}
impl OperationResult {
    pub fn variant_name(&self) -> &'static str {
        match self {
            OperationResult::PositionBuffer(_) => "PositionBuffer",
            OperationResult::RecordSection(_) => "RecordSection",
            OperationResult::FkSpectra(_) => "FkSpectra",
            OperationResult::FkAttributes(_) => "FkAttributes",
            OperationResult::LegacyFkSpectra(_) => "LegacyFkSpectra",
            OperationResult::WaveformStore(_) => "WaveformStore",
            OperationResult::Imported { .. } => "Imported",
            OperationResult::EventBeams(_) => "EventBeams",
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub operation: Operation,
}
// 只有 name/message 两个字符串能跨越边界
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub name: String,
    pub message: String,
}
impl From<&PipelineError> for RpcError {
    fn from(value: &PipelineError) -> Self {
        Self {
            name: value.name().to_owned(),
            message: value.to_string(),
        }
    }
}
impl From<RpcError> for PipelineError {
    fn from(value: RpcError) -> Self {
        PipelineError::RpcFailure {
            name: value.name,
            message: value.message,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RpcOutcome {
    Result(OperationResult),
    Error(RpcError),
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub outcome: RpcOutcome,
}
impl RpcResponse {
    pub fn success(request_id: RequestId, result: OperationResult) -> Self {
        Self {
            request_id,
            outcome: RpcOutcome::Result(result),
        }
    }
    pub fn failure(request_id: RequestId, error: RpcError) -> Self {
        Self {
            request_id,
            outcome: RpcOutcome::Error(error),
        }
    }
    pub fn into_result(self) -> Result<OperationResult, PipelineError> {
        match self.outcome {
            RpcOutcome::Result(result) => Ok(result),
            RpcOutcome::Error(error) => Err(error.into()),
        }
    }
}

// src/weavess/mod.rs
// 显示侧：时间/像素映射、顶点缓冲、记录剖面、交互状态
pub mod cache;
pub mod display;
pub mod mapper;
pub mod position;
pub mod record_section;
pub mod selection;
// 公开导出常用类型
pub use cache::{CacheKey, PositionBufferCache};
pub use display::{ApplyOutcome, Marker, PollSummary, View, WaveformDisplay};
pub use mapper::{fraction_to_time, pixel_to_time, time_to_fraction, time_to_gl, time_to_pixel};
pub use position::{build_position_buffer, PositionBuffer, PositionBufferRequest};
pub use record_section::{
    build_record_section, kilometers_to_degrees, LegendEntry, RecordSection, RecordSectionEntry,
    RecordSectionLayout, RecordSectionOffset, RecordSectionRequest,
};
pub use selection::{MeasureState, MeasureWindow, SelectionState, SelectionWindow};

//! Per-query traces and the sinks they are delivered to.

pub mod builder;
pub mod jsonl;
pub mod langfuse;
pub mod memory;
pub mod model;
pub mod sink;

pub use builder::{OpenSpan, TraceBuilder};
pub use jsonl::JsonlSink;
pub use langfuse::LangfuseSink;
pub use memory::MemorySink;
pub use model::{CostEstimate, RetrievalStatus, Span, SpanStatus, Trace, TraceStatus};
pub use sink::{sink_from_config, LogSink, NoneSink, TraceSink};

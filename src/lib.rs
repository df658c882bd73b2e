//! Timed reading pacer for paginated documents.
//!
//! The pacer wraps every word (or wide-script character) of the rendered page
//! in a highlight target, groups targets into line-aware chunks, and walks a
//! highlight through them at a configurable rate. When the visible chunks run
//! out it asks the renderer for the next page and waits for the renderer to
//! confirm before touching the new content.

pub mod cache;
pub mod chunker;
pub mod config;
pub mod flow;
pub mod markup;
pub mod pacer;
pub mod renderer;
pub mod script;
pub mod segmenter;
pub mod text_utils;
pub mod visibility;

pub use config::{AppConfig, SettingsSource, SharedSettings};
pub use flow::{FlowMetrics, PagedFlowRenderer};
pub use pacer::{PacerEvent, PacerPhase, PacingEngine};
pub use renderer::{DocumentRenderer, LifecycleEvent};

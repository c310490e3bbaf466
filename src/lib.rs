#![forbid(unsafe_code)]

//! Lists a YouTube channel's uploads through the Data API v3, filters and
//! ranks them, and hands the resulting ids to a download script.

pub mod api;
pub mod config;
pub mod duration;
pub mod error;
pub mod handoff;
pub mod model;
pub mod pipeline;
pub mod ranking;
pub mod transport;

pub use api::YouTubeClient;
pub use error::{PipelineError, PipelineResult, UpstreamError, UpstreamKind};
pub use model::{ChannelInput, ChannelRef, FilterSortConfig, SortOrder, VideoSummary};
pub use pipeline::{fetch_channel_videos, list_channel_videos, resolve_channel};
pub use transport::{Transport, UreqTransport};

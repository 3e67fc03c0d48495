#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod debounce;
pub mod feed;
pub mod generation;
pub mod giphy;
pub mod logging;
pub mod media;
pub mod select;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
pub use coordinator::{CoordinatorOptions, FeedCoordinator, LoadingState, TaskRunner, ThreadRunner};
pub use feed::{FeedLane, LaneKind, LaneState, Page, PageMetadata};
pub use generation::GenerationGuard;
pub use select::VariantSelector;

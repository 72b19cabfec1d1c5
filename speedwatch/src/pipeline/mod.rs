//! The per-fix decision pipeline.
//!
//! Position events arrive on an mpsc channel and are processed strictly in
//! order. Each fix runs the whole chain before the next is read:
//!
//! ```text
//! PipelineInput::Fix ──► SpeedSampler ──► LimitResolver ──► ThresholdMode
//!                                                               │
//!           broadcast ◄── PipelineUpdate ◄── AlertStateMachine ◄┘
//! ```
//!
//! Subscribers (display, audio, voice) receive [`PipelineUpdate`]s over a
//! broadcast channel. Closing the input channel or cancelling the shutdown
//! token ends the run and yields the trip summary.

mod speed_pipeline;
mod types;

pub use speed_pipeline::{
    input_channel, SpeedPipeline, DEFAULT_INPUT_CAPACITY, DEFAULT_UPDATE_CAPACITY,
};
pub use types::{DriverSettings, PipelineInput, PipelineUpdate, PositionStatus};

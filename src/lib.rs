//! VEGA Monitor - per-frame behavioral state engine
//!
//! VEGA fuses two weak signals from a video stream, head-movement stability
//! and a facial-emotion probability vector, into a smoothed stress score and a
//! discrete behavioral state: face tracking → movement scoring → emotion
//! windowing → hybrid classification → personal calibration → output record.
//!
//! ## Modules
//!
//! - **Signals**: movement tracker, emotion aggregator, head pose
//! - **Classification**: hybrid classifier with EMA smoothing and absence handling
//! - **Calibration**: optional per-user model that overrides the state
//! - **Pipeline**: per-session orchestration over pluggable face and emotion sources

pub mod calibration;
pub mod classifier;
pub mod config;
pub mod emotion;
pub mod error;
pub mod movement;
pub mod pipeline;
pub mod record;
pub mod replay;
pub mod ring;
pub mod session_log;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use calibration::{CalibrationModel, CalibrationStore, ModelHandle, PersonalCalibration};
pub use classifier::HybridClassifier;
pub use config::MonitorConfig;
pub use emotion::EmotionAggregator;
pub use error::MonitorError;
pub use movement::MovementTracker;
pub use pipeline::{EmotionSource, FaceLocator, MonitorPipeline};
pub use record::OutputRecord;
pub use replay::{ReplayFrame, ScriptedEmotion, ScriptedLocator};
pub use session_log::{RecordSink, SessionLog};
pub use types::{BehaviorState, EmotionLabel, FaceObservation, HeadPose, ProbabilityVector};

/// Library version
pub const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI and C ABI
pub const PRODUCER_NAME: &str = "vega-monitor";

//! HoldTalk - press-and-hold voice capture
//!
//! A press-and-hold control for recording voice messages: press to start
//! recording, slide left to cancel, release to send the recording for
//! transcription.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Sessions, durations, capture limits, gesture samples, and errors
//! - **Application**: The resource gateway, session controller, gesture adapter,
//!   and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal capture, FLAC artifacts,
//!   HTTP transcription, XDG config)
//! - **CLI**: Gesture-script replay harness, config management, and logging setup

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

//! Application layer - Capture components and port interfaces
//!
//! Contains the resource gateway, the session controller, the gesture
//! adapter, and the trait definitions for external system interactions.

pub mod controller;
pub mod gateway;
pub mod gesture_adapter;
pub mod intent;
pub mod ports;

// Re-export components
pub use controller::{ControllerError, ControllerHandle, SessionController};
pub use gateway::{AcquisitionError, FinalizeError, ReleaseError, ResourceGateway};
pub use gesture_adapter::{CancelZoneView, ControlView, GestureAdapter};
pub use intent::{ControllerSnapshot, HapticPulse, HostHooks, Notice, UiIntent};

//! Capability probing
//!
//! Decides whether a capture mode can work at all before anything asks the
//! user for a device.

use super::Capabilities;
use crate::types::CaptureMode;

/// Check whether `mode` can be recorded with these capabilities
pub fn is_supported(mode: CaptureMode, caps: &Capabilities) -> bool {
    unsupported_reason(mode, caps).is_none()
}

/// First missing capability for `mode`, or `None` if supported
pub fn unsupported_reason(mode: CaptureMode, caps: &Capabilities) -> Option<&'static str> {
    if !caps.secure_context {
        return Some("not running in a secure context");
    }

    match mode {
        CaptureMode::Camera | CaptureMode::Audio if !caps.user_media => {
            return Some("camera/microphone access is unavailable");
        }
        CaptureMode::Screen if !caps.display_media => {
            return Some("screen sharing is unavailable");
        }
        _ => {}
    }

    if !caps.encoder {
        return Some("no media encoder is available");
    }

    None
}

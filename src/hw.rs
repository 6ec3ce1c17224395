//! Hardware-offload and tone-generation collaborators.
//!
//! The core never touches hardware directly; it tells a collaborator what
//! topology it decided on and leaves the DSP/bus programming to the embedder.
//! The no-op implementations make a pure-software build a matter of not
//! wiring anything up, the way `common::setup_logging`'s redox-only branches
//! simply compile away off-target.

use crate::channel::ChannelId;

/// Told about crossconnect/conference-unit topology changes decided by
/// [`crate::conference::classify`] after a membership change.
pub trait HwOffload {
    fn hw_crossconnect(&mut self, a: ChannelId, b: ChannelId, enable: bool);
    fn hw_conference(&mut self, channel: ChannelId, unit: Option<u8>);
}

pub struct NoHwOffload;

impl HwOffload for NoHwOffload {
    fn hw_crossconnect(&mut self, _a: ChannelId, _b: ChannelId, _enable: bool) {}
    fn hw_conference(&mut self, _channel: ChannelId, _unit: Option<u8>) {}
}

/// Supplies tone-generator samples for a channel whose `tone_active` flag is
/// set. Returning `false` means no tone is actually available this call;
/// the caller falls back to silence.
pub trait ToneSource {
    fn tone_copy(&mut self, channel: ChannelId, out: &mut [u8], len: usize) -> bool;
}

pub struct NoToneSource;

impl ToneSource for NoToneSource {
    fn tone_copy(&mut self, _channel: ChannelId, _out: &mut [u8], _len: usize) -> bool {
        false
    }
}

use std::collections::HashMap;

use crate::channel::{Channel, ChannelId};
use crate::companding::Encoding;
use crate::conference::Conference;
use crate::dtmf::DtmfState;
use crate::error::CmxError;
use crate::hw::{HwOffload, NoToneSource, ToneSource};

/// Owns every channel and conference; the embedding application constructs
/// one per mixing domain rather than relying on a process-wide global
/// (design notes: "tests instantiate disjoint contexts").
///
/// Not `Sync`: the spec's single-threaded cooperative model assumes the
/// caller serializes access, the way the teacher's drivers rely on a
/// single-threaded event loop rather than internal locking.
pub struct MixerContext {
    pub(crate) channels: HashMap<ChannelId, Channel>,
    pub(crate) conferences: HashMap<u32, Conference>,
    pub(crate) tone: Box<dyn ToneSource>,
    next_channel: u32,
}

impl Default for MixerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MixerContext {
    pub fn new() -> Self {
        MixerContext {
            channels: HashMap::new(),
            conferences: HashMap::new(),
            tone: Box::new(NoToneSource),
            next_channel: 1,
        }
    }

    pub fn set_tone_source(&mut self, tone: Box<dyn ToneSource>) {
        self.tone = tone;
    }

    pub fn add_channel(&mut self, encoding: Encoding, hw_id: u32) -> ChannelId {
        let id = ChannelId(self.next_channel);
        self.next_channel += 1;
        self.channels.insert(id, Channel::new(encoding, hw_id));
        id
    }

    /// Leaves any conference the channel belongs to, then drops it.
    pub fn remove_channel(&mut self, id: ChannelId, hw: &mut dyn HwOffload) -> Result<(), CmxError> {
        let in_conference = self
            .channels
            .get(&id)
            .ok_or(CmxError::InvalidArgument("unknown channel"))?
            .conference
            .is_some();
        if in_conference {
            self.leave_conference(id, hw)?;
        }
        self.channels.remove(&id);
        Ok(())
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn conference(&self, id: u32) -> Option<&Conference> {
        self.conferences.get(&id)
    }

    fn channel_mut(&mut self, id: ChannelId) -> Result<&mut Channel, CmxError> {
        self.channels.get_mut(&id).ok_or(CmxError::InvalidArgument("unknown channel"))
    }

    pub fn set_active(&mut self, id: ChannelId, active: bool) -> Result<(), CmxError> {
        self.channel_mut(id)?.active = active;
        Ok(())
    }

    pub fn set_conf_id(&mut self, id: ChannelId, conf_id: u32) -> Result<(), CmxError> {
        self.channel_mut(id)?.conf_id = conf_id;
        Ok(())
    }

    pub fn set_echo(&mut self, id: ChannelId, echo: bool) -> Result<(), CmxError> {
        self.channel_mut(id)?.echo = echo;
        Ok(())
    }

    pub fn set_tx_mix(&mut self, id: ChannelId, tx_mix: bool) -> Result<(), CmxError> {
        self.channel_mut(id)?.tx_mix = tx_mix;
        Ok(())
    }

    pub fn set_hw_id(&mut self, id: ChannelId, hw_id: u32) -> Result<(), CmxError> {
        self.channel_mut(id)?.hw_id = hw_id;
        Ok(())
    }

    pub fn set_tone_active(&mut self, id: ChannelId, active: bool) -> Result<(), CmxError> {
        self.channel_mut(id)?.tone_active = active;
        Ok(())
    }

    pub fn enable_dtmf(&mut self, id: ChannelId) -> Result<(), CmxError> {
        self.channel_mut(id)?.dtmf = Some(DtmfState::new());
        Ok(())
    }

    pub fn disable_dtmf(&mut self, id: ChannelId) -> Result<(), CmxError> {
        self.channel_mut(id)?.dtmf = None;
        Ok(())
    }

    pub fn take_dtmf_digits(&mut self, id: ChannelId) -> Result<String, CmxError> {
        Ok(self.channel_mut(id)?.dtmf.as_mut().map(DtmfState::take_digits).unwrap_or_default())
    }
}

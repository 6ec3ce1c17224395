use crate::companding::Encoding;
use crate::config::BUFF_SIZE;
use crate::dtmf::DtmfState;

/// Opaque handle into a [`crate::MixerContext`]'s channel slab.
///
/// A `Copy` newtype rather than a raw pointer — "weak handles (conference id
/// + position), not raw pointers" from the design notes applies equally to
/// channel references once ownership moves into the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub(crate) u32);

/// Per-channel mixing state. Fields not marked `pub` are mixer-internal
/// bookkeeping; the external layer drives behavior through `MixerContext`'s
/// setters rather than touching ring pointers directly.
pub struct Channel {
    pub encoding: Encoding,
    pub(crate) rx_buff: Vec<u8>,
    pub(crate) tx_buff: Vec<u8>,
    pub(crate) w_rx: usize,
    pub(crate) r_rx: usize,
    pub(crate) w_tx: usize,
    pub(crate) r_tx: usize,
    pub(crate) largest: usize,

    /// Echo own rx audio back to self (solo) / include it in the mix (pair, group).
    pub echo: bool,
    /// If true, tx is additively mixed into outbound audio rather than
    /// replacing rx/conference-derived audio.
    pub tx_mix: bool,
    /// Conference the channel wants to be a member of; 0 means none.
    /// Only takes effect through `cmx_reconfigure` when `active` is set.
    pub conf_id: u32,
    pub active: bool,
    pub(crate) conference: Option<u32>,
    /// Hardware DSP unit this channel is wired to; 0 means software-only.
    pub hw_id: u32,
    /// Fed the raw inbound frame by `cmx_receive` whenever present; enable
    /// with `MixerContext::enable_dtmf`.
    pub(crate) dtmf: Option<DtmfState>,
    pub tone_active: bool,
}

impl Channel {
    pub(crate) fn new(encoding: Encoding, hw_id: u32) -> Self {
        let silence = encoding.silence_byte();
        Channel {
            encoding,
            rx_buff: vec![silence; BUFF_SIZE],
            tx_buff: vec![0u8; BUFF_SIZE],
            w_rx: 0,
            r_rx: 0,
            w_tx: 0,
            r_tx: 0,
            largest: 0,
            echo: false,
            tx_mix: false,
            conf_id: 0,
            active: false,
            conference: None,
            hw_id,
            dtmf: None,
            tone_active: false,
        }
    }

    pub fn in_conference(&self) -> bool {
        self.conference.is_some()
    }

    pub fn conference_id(&self) -> Option<u32> {
        self.conference
    }
}

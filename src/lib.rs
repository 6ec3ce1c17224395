//! CMX: a software conference-mixer audio engine and DTMF decoder for an
//! ISDN-style DSP layer.
//!
//! The core is a pure library: no persisted state, no wire format, no CLI.
//! An embedding application owns a [`MixerContext`], feeds it inbound/outbound
//! audio through `cmx_receive`/`cmx_send`/`cmx_transmit`, and reconciles
//! conference membership through `cmx_reconfigure` whenever it changes a
//! channel's `active`/`conf_id`/`hw_id`/`tx_mix` fields. DTMF decoding
//! ([`dtmf::dtmf_decode`]) is usable independently of the mixer.

mod channel;
mod companding;
mod conference;
mod config;
mod context;
pub mod dtmf;
mod error;
mod hw;
mod receive;
mod reconfigure;
mod ring;
mod saturate;
mod send;
mod transmit;

pub use channel::{Channel, ChannelId};
pub use companding::{tables, CompandingTables, Encoding};
pub use conference::{classify, Conference, HwSolution, MemberInfo};
pub use config::{BUFF_HALF, BUFF_MASK, BUFF_SIZE, DTMF_NPOINTS, DTMF_THRESH, MAX_HW_UNITS};
pub use context::MixerContext;
pub use dtmf::{dtmf_decode, DtmfEncoding, DtmfState};
pub use error::CmxError;
pub use hw::{HwOffload, NoHwOffload, NoToneSource, ToneSource};

use crate::channel::ChannelId;
use crate::context::MixerContext;
use crate::error::CmxError;
use crate::ring;
use crate::saturate::saturate16;

impl MixerContext {
    /// Produces `len` bytes of outbound audio for a channel, spec.md §4.7.
    /// `tag` is opaque caller metadata threaded through for diagnostics only.
    ///
    /// Never fails from the caller's perspective except for an unknown
    /// channel id.
    pub fn cmx_send(&mut self, id: ChannelId, len: usize, tag: u64) -> Result<Vec<u8>, CmxError> {
        log::trace!("cmx_send: channel={id:?} len={len} tag={tag}");
        if !self.channels.contains_key(&id) {
            return Err(CmxError::InvalidArgument("unknown channel"));
        }

        let mut channel = self.channels.remove(&id).unwrap();
        let silence = channel.encoding.silence_byte();

        // Pointer setup (spec.md §4.7) runs unconditionally, ahead of branch
        // selection, so R_rx keeps tracking the live write frontier even
        // while tone playout is substituting for rx/conference audio —
        // otherwise it freezes during a tone run and the first real send
        // after tone deactivates sees a stale, possibly-overwritten window.
        let rr_target = match channel.conference {
            Some(conf_id) => self.conferences.get(&conf_id).map(|c| c.w_min).unwrap_or(channel.w_rx),
            None => channel.w_rx,
        };

        let available = ring::distance(rr_target, channel.r_rx);
        let (mut r, new_r_rx) = if available < len {
            (ring::retreat(rr_target, len), rr_target)
        } else {
            (channel.r_rx, ring::advance(channel.r_rx, len))
        };

        if channel.tone_active {
            let mut out = vec![silence; len];
            if !self.tone.tone_copy(id, &mut out, len) {
                log::debug!("cmx_send: channel {id:?} has tone_active set but no tone was supplied");
            }
            channel.r_tx = channel.w_tx;
            channel.r_rx = new_r_rx;
            self.channels.insert(id, channel);
            return Ok(out);
        }

        let other_id = channel.conference.and_then(|conf_id| {
            self.conferences.get(&conf_id).and_then(|c| {
                if c.members.len() == 2 {
                    c.members.iter().copied().find(|&m| m != id)
                } else {
                    None
                }
            })
        });
        let group = channel
            .conference
            .and_then(|conf_id| self.conferences.get(&conf_id))
            .map(|c| c.members.len())
            .unwrap_or(1);

        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            let tx_available = channel.r_tx != channel.w_tx;
            let tx_byte = if tx_available { channel.tx_buff[channel.r_tx] } else { 0 };

            let byte = match group {
                // Branch A (solo): self-contained, tx_mix has no visible effect
                // since there is nothing else to mix tx into.
                1 => {
                    if channel.echo {
                        if tx_available {
                            let tx_term = channel.encoding.law_to_linear(tx_byte) as i32;
                            let own_rx = channel.encoding.law_to_linear(channel.rx_buff[r]) as i32;
                            channel.encoding.linear_to_law(saturate16(tx_term + own_rx))
                        } else {
                            channel.rx_buff[r]
                        }
                    } else if tx_available {
                        tx_byte
                    } else {
                        silence
                    }
                }
                // Branch X: tx_mix off and tx has bytes -> replace, verbatim drain.
                _ if !channel.tx_mix && tx_available => tx_byte,
                // Branch B (pair).
                2 => {
                    let tx_term = if tx_available { channel.encoding.law_to_linear(tx_byte) as i32 } else { 0 };
                    let other_decoded = other_id
                        .and_then(|oid| self.channels.get(&oid))
                        .map(|o| o.encoding.law_to_linear(o.rx_buff[r]) as i32)
                        .unwrap_or(0);
                    let sum = if channel.echo {
                        let own_rx = channel.encoding.law_to_linear(channel.rx_buff[r]) as i32;
                        tx_term + other_decoded + own_rx
                    } else {
                        tx_term + other_decoded
                    };
                    channel.encoding.linear_to_law(saturate16(sum))
                }
                // Branch C (group, >= 3 members).
                _ => {
                    let tx_term = if tx_available { channel.encoding.law_to_linear(tx_byte) as i32 } else { 0 };
                    let conf_sample = channel
                        .conference
                        .and_then(|conf_id| self.conferences.get(&conf_id))
                        .map(|c| c.conf_buff[r])
                        .unwrap_or(0);
                    let sum = if channel.echo {
                        tx_term + conf_sample
                    } else {
                        let own_rx = channel.encoding.law_to_linear(channel.rx_buff[r]) as i32;
                        tx_term + conf_sample - own_rx
                    };
                    channel.encoding.linear_to_law(saturate16(sum))
                }
            };

            out.push(byte);
            if tx_available {
                channel.r_tx = ring::advance(channel.r_tx, 1);
            }
            r = ring::advance(r, 1);
        }

        channel.r_rx = new_r_rx;
        self.channels.insert(id, channel);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companding::Encoding;

    #[test]
    fn solo_echo_off_emits_silence_with_no_tx() {
        let mut ctx = MixerContext::new();
        let a = ctx.add_channel(Encoding::ULaw, 0);
        let out = ctx.cmx_send(a, 4, 0).unwrap();
        assert_eq!(out, vec![Encoding::ULaw.silence_byte(); 4]);
    }

    #[test]
    fn solo_echo_off_with_full_tx_emits_tx_verbatim() {
        let mut ctx = MixerContext::new();
        let a = ctx.add_channel(Encoding::ULaw, 0);
        let tx = vec![1u8, 2, 3, 4];
        ctx.cmx_transmit(a, &tx).unwrap();
        let out = ctx.cmx_send(a, 4, 0).unwrap();
        assert_eq!(out, tx);
    }

    #[test]
    fn solo_echo_on_reflects_rx() {
        let mut ctx = MixerContext::new();
        let a = ctx.add_channel(Encoding::ULaw, 0);
        ctx.set_echo(a, true).unwrap();
        let frame = vec![0x10u8, 0x20, 0x30];
        ctx.cmx_receive(a, &frame).unwrap();
        let out = ctx.cmx_send(a, 3, 0).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn unknown_channel_errors() {
        let mut ctx = MixerContext::new();
        let bogus = ctx.add_channel(Encoding::ULaw, 0);
        ctx.remove_channel(bogus, &mut crate::hw::NoHwOffload).unwrap();
        assert!(matches!(ctx.cmx_send(bogus, 4, 0), Err(CmxError::InvalidArgument(_))));
    }
}

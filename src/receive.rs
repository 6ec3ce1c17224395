use crate::channel::ChannelId;
use crate::config::BUFF_HALF;
use crate::context::MixerContext;
use crate::dtmf::dtmf_decode;
use crate::error::CmxError;
use crate::ring;

fn write_ring(buf: &mut [u8], start: usize, frame: &[u8]) {
    for (i, &b) in frame.iter().enumerate() {
        buf[ring::advance(start, i)] = b;
    }
}

impl MixerContext {
    /// Appends an inbound frame to a channel's rx ring and, if it's a
    /// conference member, advances the shared mix envelope. spec.md §4.6.
    ///
    /// Never fails from the caller's perspective except for an unknown
    /// channel id; overload is a soft, logged drop.
    pub fn cmx_receive(&mut self, id: ChannelId, frame: &[u8]) -> Result<(), CmxError> {
        if !self.channels.contains_key(&id) {
            return Err(CmxError::InvalidArgument("unknown channel"));
        }
        if frame.is_empty() {
            log::warn!("cmx_receive: zero-length frame dropped");
            return Ok(());
        }
        if frame.len() > BUFF_HALF / 4 {
            log::warn!("cmx_receive: {}-byte frame exceeds the per-tick budget, dropped", frame.len());
            return Ok(());
        }

        let mut channel = self.channels.remove(&id).unwrap();
        let len = frame.len();
        channel.largest = channel.largest.max(2 * len);

        if let Some(conf_id) = channel.conference {
            let mut conf = self
                .conferences
                .remove(&conf_id)
                .expect("channel.conference points at a live conference id");

            conf.largest = conf.largest.max(channel.largest);
            channel.largest = conf.largest;

            let mut w_min = ring::advance(channel.w_rx, len);
            for &other_id in &conf.members {
                if other_id == id {
                    continue;
                }
                if let Some(other) = self.channels.get(&other_id) {
                    if !ring::ahead(other.w_rx, w_min) {
                        w_min = other.w_rx;
                    }
                }
            }
            conf.w_min = w_min;
            let w_max = if ring::ahead(conf.w_max, conf.w_min) { conf.w_max } else { conf.w_min };

            if ring::distance(w_max, conf.w_min) > channel.largest {
                log::warn!(
                    "cmx_receive: conference {conf_id} overflow guard tripped ({} > {}), frame dropped",
                    ring::distance(w_max, conf.w_min),
                    channel.largest
                );
            } else {
                write_ring(&mut channel.rx_buff, channel.w_rx, frame);

                if conf.members.len() >= 3 {
                    let old_w_max = conf.w_max;
                    let fresh_span = ring::distance(w_max, old_w_max);
                    for i in 0..len {
                        let idx = ring::advance(channel.w_rx, i);
                        let decoded = channel.encoding.law_to_linear(frame[i]) as i32;
                        if ring::distance(idx, old_w_max) < fresh_span {
                            conf.conf_buff[idx] = decoded;
                        } else {
                            conf.conf_buff[idx] = conf.conf_buff[idx].saturating_add(decoded);
                        }
                    }
                }

                channel.w_rx = ring::advance(channel.w_rx, len);
                conf.w_max = w_max;
            }

            self.conferences.insert(conf_id, conf);
        } else {
            write_ring(&mut channel.rx_buff, channel.w_rx, frame);
            channel.w_rx = ring::advance(channel.w_rx, len);
        }

        if let Some(dtmf) = channel.dtmf.as_mut() {
            dtmf_decode(dtmf, frame, channel.encoding.into());
        }

        self.channels.insert(id, channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companding::Encoding;

    #[test]
    fn unknown_channel_is_rejected() {
        let mut ctx = MixerContext::new();
        let bogus = ctx.add_channel(Encoding::ULaw, 0);
        ctx.remove_channel(bogus, &mut crate::hw::NoHwOffload).unwrap();
        assert!(matches!(ctx.cmx_receive(bogus, &[0xFF]), Err(CmxError::InvalidArgument(_))));
    }

    #[test]
    fn zero_length_frame_is_dropped_not_erred() {
        let mut ctx = MixerContext::new();
        let a = ctx.add_channel(Encoding::ULaw, 0);
        assert!(ctx.cmx_receive(a, &[]).is_ok());
        assert_eq!(ctx.channel(a).unwrap().w_rx, 0);
    }

    #[test]
    fn solo_write_advances_w_rx() {
        let mut ctx = MixerContext::new();
        let a = ctx.add_channel(Encoding::ULaw, 0);
        ctx.cmx_receive(a, &[1, 2, 3]).unwrap();
        assert_eq!(ctx.channel(a).unwrap().w_rx, 3);
    }

    #[test]
    fn oversized_frame_is_dropped() {
        let mut ctx = MixerContext::new();
        let a = ctx.add_channel(Encoding::ULaw, 0);
        let huge = vec![0xFFu8; BUFF_HALF];
        ctx.cmx_receive(a, &huge).unwrap();
        assert_eq!(ctx.channel(a).unwrap().w_rx, 0);
    }
}

use crate::channel::ChannelId;
use crate::config::BUFF_MASK;
use crate::context::MixerContext;
use crate::error::CmxError;
use crate::ring;

impl MixerContext {
    /// Queues outbound bytes into a channel's tx ring for `cmx_send` to
    /// drain, spec.md §4.8. Producer-paced: if the frame is larger than the
    /// free space, the tail is dropped rather than the whole frame.
    pub fn cmx_transmit(&mut self, id: ChannelId, frame: &[u8]) -> Result<(), CmxError> {
        if frame.is_empty() {
            log::warn!("cmx_transmit: empty frame rejected");
            return Ok(());
        }
        let channel = self.channels.get_mut(&id).ok_or(CmxError::InvalidArgument("unknown channel"))?;

        let free = channel.r_tx.wrapping_sub(channel.w_tx).wrapping_sub(1) & BUFF_MASK;

        if frame.len() > free {
            log::warn!(
                "cmx_transmit: {}-byte frame exceeds {} free slots, dropping the tail",
                frame.len(),
                free
            );
            for (i, &b) in frame.iter().take(free).enumerate() {
                channel.tx_buff[ring::advance(channel.w_tx, i)] = b;
            }
            channel.w_tx = channel.r_tx.wrapping_sub(1) & BUFF_MASK;
            return Ok(());
        }

        for (i, &b) in frame.iter().enumerate() {
            channel.tx_buff[ring::advance(channel.w_tx, i)] = b;
        }
        channel.w_tx = ring::advance(channel.w_tx, frame.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companding::Encoding;
    use crate::config::BUFF_SIZE;

    #[test]
    fn empty_frame_is_rejected_without_error() {
        let mut ctx = MixerContext::new();
        let a = ctx.add_channel(Encoding::ULaw, 0);
        assert!(ctx.cmx_transmit(a, &[]).is_ok());
        assert_eq!(ctx.channel(a).unwrap().w_tx, 0);
    }

    #[test]
    fn normal_write_advances_w_tx() {
        let mut ctx = MixerContext::new();
        let a = ctx.add_channel(Encoding::ULaw, 0);
        ctx.cmx_transmit(a, &[1, 2, 3]).unwrap();
        assert_eq!(ctx.channel(a).unwrap().w_tx, 3);
    }

    #[test]
    fn oversized_write_fills_to_capacity_and_drops_tail() {
        let mut ctx = MixerContext::new();
        let a = ctx.add_channel(Encoding::ULaw, 0);
        let huge = vec![7u8; BUFF_SIZE];
        ctx.cmx_transmit(a, &huge).unwrap();
        let channel = ctx.channel(a).unwrap();
        assert_eq!(channel.w_tx, channel.r_tx.wrapping_sub(1) & BUFF_MASK);
    }
}

use crate::channel::ChannelId;
use crate::conference::{classify, Conference, HwSolution, MemberInfo};
use crate::context::MixerContext;
use crate::error::CmxError;
use crate::hw::HwOffload;

impl MixerContext {
    /// Reconciles a channel's conference membership with its `active`/`conf_id`
    /// fields, spec.md §4.5. Call this after changing either field.
    pub fn cmx_reconfigure(&mut self, id: ChannelId, hw: &mut dyn HwOffload) -> Result<(), CmxError> {
        let channel = self.channels.get(&id).ok_or(CmxError::InvalidArgument("unknown channel"))?;
        let wants = if channel.active { channel.conf_id } else { 0 };
        let currently_in = channel.conference;

        match currently_in {
            Some(cur) if wants != cur => {
                self.leave_conference(id, hw)?;
                if wants != 0 {
                    self.join_conference(id, wants, hw)?;
                }
            }
            None if wants != 0 => {
                self.join_conference(id, wants, hw)?;
            }
            _ => {}
        }
        Ok(())
    }

    pub(crate) fn leave_conference(&mut self, id: ChannelId, hw: &mut dyn HwOffload) -> Result<(), CmxError> {
        let conf_id = self
            .channels
            .get(&id)
            .ok_or(CmxError::InvalidArgument("unknown channel"))?
            .conference
            .ok_or(CmxError::NotFound("channel is not a conference member"))?;

        let mut conf = self
            .conferences
            .remove(&conf_id)
            .ok_or(CmxError::Internal("channel referenced a conference absent from the registry"))?;

        let before = conf.solution;
        let old_members = conf.members.clone();

        conf.members.retain(|&m| m != id);
        if let Some(channel) = self.channels.get_mut(&id) {
            channel.conference = None;
        }

        if conf.members.is_empty() {
            self.dispatch_disable(before, &old_members, hw);
            log::debug!("conference {conf_id} destroyed: last member left");
        } else {
            let after = self.recompute_solution(&conf);
            self.dispatch(before, after, &old_members, &conf.members, hw);
            conf.solution = after;
            conf.hw_id = self.solution_hw_id(after, &conf.members);
            self.conferences.insert(conf_id, conf);
        }
        Ok(())
    }

    pub(crate) fn join_conference(&mut self, id: ChannelId, conf_id: u32, hw: &mut dyn HwOffload) -> Result<(), CmxError> {
        if conf_id == 0 {
            return Err(CmxError::InvalidArgument("conference id must be nonzero"));
        }
        let already_member = self
            .channels
            .get(&id)
            .ok_or(CmxError::InvalidArgument("unknown channel"))?
            .conference
            .is_some();
        if already_member {
            return Err(CmxError::InvalidArgument("channel is already a conference member"));
        }

        let mut conf = self.conferences.remove(&conf_id).unwrap_or_else(|| Conference::new(conf_id));
        let before = conf.solution;
        let old_members = conf.members.clone();

        let silence = self.channels.get(&id).unwrap().encoding.silence_byte();
        {
            let channel = self.channels.get_mut(&id).unwrap();
            for b in channel.rx_buff.iter_mut() {
                *b = silence;
            }
            channel.w_rx = conf.w_max;
            channel.r_rx = conf.w_max;
        }

        conf.members.push(id);
        // Open question #2: the 2->3 transition check happens after the new
        // member is already appended to `members`.
        if conf.members.len() == 3 {
            for c in conf.conf_buff.iter_mut() {
                *c = 0;
            }
        }
        self.channels.get_mut(&id).unwrap().conference = Some(conf_id);

        let after = self.recompute_solution(&conf);
        self.dispatch(before, after, &old_members, &conf.members, hw);
        conf.solution = after;
        conf.hw_id = self.solution_hw_id(after, &conf.members);
        self.conferences.insert(conf_id, conf);
        Ok(())
    }

    fn solution_hw_id(&self, solution: HwSolution, members: &[ChannelId]) -> u32 {
        match solution {
            HwSolution::Software => 0,
            _ => members.first().and_then(|m| self.channels.get(m)).map(|c| c.hw_id).unwrap_or(0),
        }
    }

    /// spec.md §4.4, run after every membership change.
    fn recompute_solution(&self, conf: &Conference) -> HwSolution {
        let members: Vec<MemberInfo> = conf
            .members
            .iter()
            .filter_map(|id| self.channels.get(id))
            .map(|c| MemberInfo { hw_id: c.hw_id, tx_mix: c.tx_mix })
            .collect();
        if members.len() != conf.members.len() {
            log::error!("conference {}: member list referenced a missing channel", conf.id);
            return HwSolution::Software;
        }

        let hw_id = members.first().map(|m| m.hw_id).unwrap_or(0);
        let claimed: Vec<u8> = self
            .conferences
            .values()
            .filter(|other| other.hw_id == hw_id && hw_id != 0)
            .filter_map(|other| match other.solution {
                HwSolution::HwConference(u) => Some(u),
                _ => None,
            })
            .collect();
        let preferred = match conf.solution {
            HwSolution::HwConference(u) => Some(u),
            _ => None,
        };
        classify(&members, &claimed, preferred)
    }

    fn dispatch(&self, before: HwSolution, after: HwSolution, old_members: &[ChannelId], new_members: &[ChannelId], hw: &mut dyn HwOffload) {
        if before == after {
            return;
        }
        self.dispatch_disable(before, old_members, hw);
        match after {
            HwSolution::HwConference(unit) => {
                for &m in new_members {
                    hw.hw_conference(m, Some(unit));
                }
            }
            HwSolution::HwCrossconnect => {
                if new_members.len() == 2 {
                    hw.hw_crossconnect(new_members[0], new_members[1], true);
                }
            }
            HwSolution::Software => {}
        }
    }

    fn dispatch_disable(&self, before: HwSolution, old_members: &[ChannelId], hw: &mut dyn HwOffload) {
        match before {
            HwSolution::HwConference(_) => {
                for &m in old_members {
                    hw.hw_conference(m, None);
                }
            }
            HwSolution::HwCrossconnect => {
                if old_members.len() == 2 {
                    hw.hw_crossconnect(old_members[0], old_members[1], false);
                }
            }
            HwSolution::Software => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companding::Encoding;
    use crate::hw::NoHwOffload;

    #[test]
    fn join_then_leave_clears_conference() {
        let mut ctx = MixerContext::new();
        let mut hw = NoHwOffload;
        let a = ctx.add_channel(Encoding::ULaw, 0);

        ctx.set_active(a, true).unwrap();
        ctx.set_conf_id(a, 7).unwrap();
        ctx.cmx_reconfigure(a, &mut hw).unwrap();
        assert!(ctx.channel(a).unwrap().in_conference());
        assert_eq!(ctx.conference(7).unwrap().member_count(), 1);

        ctx.set_active(a, false).unwrap();
        ctx.cmx_reconfigure(a, &mut hw).unwrap();
        assert!(!ctx.channel(a).unwrap().in_conference());
        assert!(ctx.conference(7).is_none());
    }

    #[test]
    fn pair_classifies_as_hw_crossconnect() {
        let mut ctx = MixerContext::new();
        let mut hw = NoHwOffload;
        let a = ctx.add_channel(Encoding::ULaw, 5);
        let b = ctx.add_channel(Encoding::ULaw, 5);

        for id in [a, b] {
            ctx.set_active(id, true).unwrap();
            ctx.set_conf_id(id, 1).unwrap();
            ctx.cmx_reconfigure(id, &mut hw).unwrap();
        }

        assert_eq!(ctx.conference(1).unwrap().solution, HwSolution::HwCrossconnect);
    }

    #[test]
    fn three_members_classify_as_hw_conference() {
        let mut ctx = MixerContext::new();
        let mut hw = NoHwOffload;
        let ids: Vec<_> = (0..3).map(|_| ctx.add_channel(Encoding::ULaw, 9)).collect();
        for &id in &ids {
            ctx.set_active(id, true).unwrap();
            ctx.set_conf_id(id, 1).unwrap();
            ctx.cmx_reconfigure(id, &mut hw).unwrap();
        }
        assert_eq!(ctx.conference(1).unwrap().solution, HwSolution::HwConference(1));
    }

    #[test]
    fn rejoining_a_conference_without_leaving_is_rejected() {
        let mut ctx = MixerContext::new();
        let mut hw = NoHwOffload;
        let a = ctx.add_channel(Encoding::ULaw, 0);
        ctx.set_active(a, true).unwrap();
        ctx.set_conf_id(a, 1).unwrap();
        ctx.cmx_reconfigure(a, &mut hw).unwrap();

        assert!(matches!(ctx.join_conference(a, 2, &mut hw), Err(CmxError::InvalidArgument(_))));
    }
}

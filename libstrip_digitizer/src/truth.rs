use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::charge::FixedCharge;

/// One particle's net charge on one channel.
///
/// `global_index` and `tof_bin` are taken from the first hit of the particle
/// that reached the channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub particle_id: u32,
    pub origin_id: u32,
    pub charge: FixedCharge,
    pub global_index: usize,
    pub tof_bin: u32,
}

impl Contribution {
    fn same_particle(&self, other: &Contribution) -> bool {
        self.particle_id == other.particle_id && self.origin_id == other.origin_id
    }
}

/// Attribution of a fraction of a digitized channel to a simulated particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthLink {
    pub channel: usize,
    pub particle_id: u32,
    pub global_index: usize,
    pub tof_bin: u32,
    pub origin_id: u32,
    pub weight: f32,
}

/// Channel -> contributions map of a single unit for the current event.
///
/// At most one Contribution per (particle, origin) is kept per channel; repeated
/// deposits from the same particle are summed into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TruthTracker {
    channels: BTreeMap<usize, Vec<Contribution>>,
}

impl TruthTracker {
    /// Record a contribution, merging it with an existing one from the same particle.
    /// Zero charge contributions are ignored.
    pub fn record(&mut self, channel: usize, contribution: Contribution) {
        if contribution.charge.is_zero() {
            return;
        }
        let entries = self.channels.entry(channel).or_default();
        match entries.iter_mut().find(|c| c.same_particle(&contribution)) {
            Some(existing) => existing.charge += contribution.charge,
            None => entries.push(contribution),
        }
    }

    pub fn contributions(&self, channel: usize) -> Option<&[Contribution]> {
        self.channels.get(&channel).map(|c| c.as_slice())
    }

    /// Channels with at least one contribution, ascending
    pub fn channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.channels.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    /// Append the links of one channel to `links`. Weights are normalized to the
    /// total simulated charge of the channel, not to the digitized value.
    pub fn append_links(&self, channel: usize, links: &mut Vec<TruthLink>) {
        let Some(contributions) = self.channels.get(&channel) else {
            return;
        };
        let total: FixedCharge = contributions.iter().map(|c| c.charge).sum();
        if total.is_zero() {
            log::debug!("Channel {channel} has zero total simulated charge; no truth links made");
            return;
        }
        links.extend(contributions.iter().map(|c| TruthLink {
            channel,
            particle_id: c.particle_id,
            global_index: c.global_index,
            tof_bin: c.tof_bin,
            origin_id: c.origin_id,
            weight: c.charge.fraction_of(total),
        }));
    }

    /// Make the links for the given channels, then forget everything.
    pub fn drain_links<I>(&mut self, channels: I) -> Vec<TruthLink>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut links = Vec::new();
        if !self.is_empty() {
            for channel in channels {
                self.append_links(channel, &mut links);
            }
        }
        self.clear();
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(particle_id: u32, origin_id: u32, charge: f32) -> Contribution {
        Contribution {
            particle_id,
            origin_id,
            charge: FixedCharge::from_electrons(charge),
            global_index: particle_id as usize,
            tof_bin: 0,
        }
    }

    #[test]
    fn test_same_particle_is_merged() {
        let mut tracker = TruthTracker::default();
        tracker.record(4, contribution(1, 0, 100.0));
        tracker.record(4, contribution(1, 0, 50.0));
        let entries = tracker.contributions(4).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].charge.electrons(), 150.0);
    }

    #[test]
    fn test_origin_disambiguates_particles() {
        let mut tracker = TruthTracker::default();
        tracker.record(4, contribution(1, 0, 100.0));
        tracker.record(4, contribution(1, 1, 100.0));
        assert_eq!(tracker.contributions(4).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_charge_ignored() {
        let mut tracker = TruthTracker::default();
        tracker.record(4, contribution(1, 0, 0.0));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_weights_sum_to_one() {
        let mut tracker = TruthTracker::default();
        tracker.record(10, contribution(1, 0, 30.0));
        tracker.record(10, contribution(2, 0, 70.0));
        tracker.record(10, contribution(3, 2, 17.0));
        tracker.record(11, contribution(2, 0, 5.0));

        let links = tracker.drain_links(0..20);
        assert_eq!(links.len(), 4);
        let sum: f32 = links.iter().filter(|l| l.channel == 10).map(|l| l.weight).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        let single: Vec<&TruthLink> = links.iter().filter(|l| l.channel == 11).collect();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].weight, 1.0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_zero_total_skipped() {
        let mut tracker = TruthTracker::default();
        tracker.record(3, contribution(1, 0, 10.0));
        tracker.record(3, contribution(2, 0, -10.0));
        let mut links = Vec::new();
        tracker.append_links(3, &mut links);
        assert!(links.is_empty());
    }

    #[test]
    fn test_drain_is_one_shot() {
        let mut tracker = TruthTracker::default();
        tracker.record(1, contribution(1, 0, 10.0));
        assert_eq!(tracker.drain_links([1]).len(), 1);
        assert!(tracker.drain_links([1]).is_empty());
    }
}

//! GIP: information propagation across the connected ports of one
//! application instance.
//!
//! This is a second `impl Engine` block rather than a separate type,
//! because the reference's `gip.c` operates directly on the same
//! application-wide port ring and propagation-count array that `gid.c`
//! owns (§3: "GIP instance. Owned by the application…"). Splitting GID and
//! GIP into two Rust types would force either a shared-ownership handle
//! (`Rc<RefCell<_>>`) where a plain `&mut` suffices, or threading the gip
//! counts array through every GID call that does not otherwise need it;
//! neither buys anything a doc comment doesn't already capture. The
//! "connected ring" itself is not a second intrusive list (§9's design
//! note): it is a filter over [`Engine::ports`], recomputed on every walk
//! instead of spliced and unspliced as a standing structure.

use alloc::vec::Vec;

use crate::error::Result;
use crate::event::{AttrIndex, Indication, PortId};
use crate::gid::Engine;
use crate::platform::Platform;

/// One cross-port fan-out produced by [`Engine::propagate`]: attribute
/// `index` was silently advanced on `port_no` (via a local join/leave
/// request) because of a registration change elsewhere in the connected
/// ring. The reference's `join_propagated_fn`/`leave_propagated_fn`
/// callbacks become this returned list instead — see `platform.rs`'s doc
/// comment for why the callback block does not survive translation as a
/// stored trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Propagation {
    pub port_no: PortId,
    pub index: AttrIndex,
    pub indication: Indication,
}

impl Engine {
    /// `gip[i]`: the number of connected ports on which attribute `i` is
    /// currently registered, maintained purely by dead-reckoning (§3, §4.3)
    /// rather than recomputed from the ports themselves.
    pub fn gip_count(&self, index: AttrIndex) -> u32 {
        self.gip_counts[index]
    }

    fn connected_port_numbers_excluding(&self, source: PortId) -> Vec<PortId> {
        self.ports()
            .filter(|p| p.is_connected() && p.port_no() != source)
            .map(|p| p.port_no())
            .collect()
    }

    /// `gip_propagates_to`: true iff `port_no` is connected and either
    /// exactly two peers are registered (so it is downstream of a lone
    /// registrar elsewhere — removing its own contribution would leave one
    /// peer standing) or exactly one peer is registered and it isn't this
    /// port (so this port would need to start forwarding).
    pub fn propagates_to(&self, port_no: PortId, index: AttrIndex) -> Result<bool> {
        let port = self.port(port_no)?;
        if !port.is_connected() {
            return Ok(false);
        }
        let count = self.gip_counts[index];
        Ok(count == 2 || (count == 1 && !port.registered_here(index)))
    }

    /// `gip_connect_port`: splices `port_no` into the connected ring, then
    /// for every attribute either raises a local join on `port_no` (if it
    /// would now see inbound traffic it didn't before) or propagates its
    /// own registration out to the rest of the ring, and finally commits
    /// every touched port's scratchpad in one pass.
    pub fn connect_port(
        &mut self,
        port_no: PortId,
        platform: &mut dyn Platform,
    ) -> Result<Vec<Propagation>> {
        self.port_mut(port_no)?.set_connected(true);

        let n = self.port(port_no)?.num_attributes();
        let mut propagated = Vec::new();
        for index in 0..n {
            if self.propagates_to(port_no, index)? {
                self.join_request(port_no, index)?;
            }
            if self.registered_here(port_no, index)? {
                propagated.extend(self.propagate_join(port_no, index)?);
            }
        }

        self.do_actions_ring(platform);
        Ok(propagated)
    }

    /// `gip_disconnect_port`: the mirror of [`Engine::connect_port`] — every
    /// attribute still registered here leaves the rest of the ring first,
    /// then the port itself is unhooked from the connected ring.
    pub fn disconnect_port(
        &mut self,
        port_no: PortId,
        platform: &mut dyn Platform,
    ) -> Result<Vec<Propagation>> {
        let n = self.port(port_no)?.num_attributes();
        let mut propagated = Vec::new();
        for index in 0..n {
            if self.registered_here(port_no, index)? {
                propagated.extend(self.propagate_leave(port_no, index)?);
            }
        }

        self.port_mut(port_no)?.set_connected(false);
        self.do_actions_ring(platform);
        Ok(propagated)
    }

    /// `gip_join_indication`/`propagate_join`: the heart of dead-reckoning.
    /// While three or more peers are already registered, one more joining
    /// changes nothing any single peer observes, so nothing is fanned out;
    /// crossing the one-or-two-peer boundary is exactly when some peer's
    /// view of the ring flips.
    pub(crate) fn propagate_join(
        &mut self,
        source: PortId,
        index: AttrIndex,
    ) -> Result<Vec<Propagation>> {
        self.gip_counts[index] += 1;
        let count = self.gip_counts[index];

        let mut propagated = Vec::new();
        if count <= 2 {
            for p in self.connected_port_numbers_excluding(source) {
                if count == 1 || self.registered_here(p, index)? {
                    self.join_request(p, index)?;
                    propagated.push(Propagation {
                        port_no: p,
                        index,
                        indication: Indication::Join,
                    });
                }
            }
        }
        Ok(propagated)
    }

    /// `gip_leave_indication`/`propagate_leave`. Dual of
    /// [`Engine::propagate_join`]: fans out only when the count drops to
    /// zero or one peer, the boundary at which some other peer's
    /// obligation to forward changes. The target condition is the
    /// complement of the join condition's `registered_here` check — a port
    /// that is itself locally registered has its own reason to keep
    /// forwarding and must not be told to leave just because a propagated
    /// peer did; only a port that was forwarding *because of* the departing
    /// peer (i.e. is not itself registered here) needs the leave request.
    pub(crate) fn propagate_leave(
        &mut self,
        source: PortId,
        index: AttrIndex,
    ) -> Result<Vec<Propagation>> {
        debug_assert!(self.gip_counts[index] > 0, "gip count underflow on leave");
        self.gip_counts[index] = self.gip_counts[index].saturating_sub(1);
        let count = self.gip_counts[index];

        let mut propagated = Vec::new();
        if count <= 1 {
            for p in self.connected_port_numbers_excluding(source) {
                if count == 0 || !self.registered_here(p, index)? {
                    self.leave_request(p, index)?;
                    propagated.push(Propagation {
                        port_no: p,
                        index,
                        indication: Indication::Leave,
                    });
                }
            }
        }
        Ok(propagated)
    }

    /// Dispatches a GID indication observed on `source` to the matching
    /// propagation direction. The glue a host (or [`crate::gmr::Gmr`]) uses
    /// after every `rcv_msg`/`manage_attribute` call that returned
    /// `Some(indication)`.
    pub fn propagate(
        &mut self,
        source: PortId,
        index: AttrIndex,
        indication: Indication,
    ) -> Result<Vec<Propagation>> {
        match indication {
            Indication::Join => self.propagate_join(source, index),
            Indication::Leave => self.propagate_leave(source, index),
        }
    }

    /// `gip_do_actions`: commits every connected port's scratchpad in one
    /// pass, including the source of whatever connect/disconnect/
    /// propagation just touched the ring.
    pub fn do_actions_ring(&mut self, platform: &mut dyn Platform) {
        let connected: Vec<PortId> = self
            .ports()
            .filter(|p| p.is_connected())
            .map(|p| p.port_no())
            .collect();
        for port_no in connected {
            if let Ok(port) = self.port_mut(port_no) {
                port.do_actions(platform);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::GidEvent;
    use crate::platform::{PortConfig, RecordingPlatform};

    #[test]
    fn single_port_fix_registration_has_no_peer_to_propagate_to() {
        let mut engine = Engine::new(4);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        engine.connect_port(1, &mut platform).unwrap();

        let indication = engine
            .manage_attribute(1, 0, GidEvent::FixRegistration)
            .unwrap();
        assert_eq!(indication, Some(Indication::Join));
        assert!(engine.registered_here(1, 0).unwrap());

        let propagated = engine.propagate(1, 0, Indication::Join).unwrap();
        assert!(propagated.is_empty());
        assert_eq!(engine.gip_count(0), 1);
    }

    #[test]
    fn two_ports_propagation_reaches_the_peer() {
        let mut engine = Engine::new(4);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        engine.create_port(2, PortConfig::default(), &mut platform);
        engine.connect_port(1, &mut platform).unwrap();
        engine.connect_port(2, &mut platform).unwrap();

        let indication = engine
            .manage_attribute(1, 3, GidEvent::FixRegistration)
            .unwrap();
        assert_eq!(indication, Some(Indication::Join));
        let propagated = engine.propagate(1, 3, Indication::Join).unwrap();

        assert_eq!(propagated.len(), 1);
        assert_eq!(propagated[0].port_no, 2);
        // Propagation drives a join *request* on the peer (applicant only,
        // per gid_join_request in the reference), not a received message, so
        // the peer's own registrar never flips to registered_here; it is
        // merely no longer quiescent.
        assert!(engine.port(2).unwrap().machine_active(3));
        assert!(!engine.registered_here(2, 3).unwrap());
        assert_eq!(engine.gip_count(3), 2);
    }

    #[test]
    fn three_ports_leave_dead_reckoning_does_not_fan_out_while_two_remain() {
        let mut engine = Engine::new(4);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        engine.create_port(2, PortConfig::default(), &mut platform);
        engine.create_port(3, PortConfig::default(), &mut platform);
        engine.connect_port(1, &mut platform).unwrap();
        engine.connect_port(2, &mut platform).unwrap();
        engine.connect_port(3, &mut platform).unwrap();

        engine
            .manage_attribute(1, 3, GidEvent::FixRegistration)
            .unwrap();
        engine.propagate(1, 3, Indication::Join).unwrap();
        engine
            .manage_attribute(2, 3, GidEvent::FixRegistration)
            .unwrap();
        engine.propagate(2, 3, Indication::Join).unwrap();
        assert_eq!(engine.gip_count(3), 2);

        engine.disconnect_port(3, &mut platform).unwrap();
        assert_eq!(engine.gip_count(3), 2);

        let indication = engine
            .manage_attribute(1, 3, GidEvent::ForbidRegistration)
            .unwrap();
        assert_eq!(indication, Some(Indication::Leave));
        let propagated = engine.propagate(1, 3, Indication::Leave).unwrap();

        assert!(propagated.is_empty(), "port 2 still registers, so no one else should leave");
        assert_eq!(engine.gip_count(3), 1);
    }

    #[test]
    fn disconnect_fans_out_leaves_for_still_registered_attributes() {
        let mut engine = Engine::new(2);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        engine.create_port(2, PortConfig::default(), &mut platform);
        engine.connect_port(1, &mut platform).unwrap();
        engine.connect_port(2, &mut platform).unwrap();

        engine
            .manage_attribute(1, 0, GidEvent::FixRegistration)
            .unwrap();
        engine.propagate(1, 0, Indication::Join).unwrap();
        // As above: propagation only drives the peer's applicant, so it is
        // active but not itself registered_here.
        assert!(engine.port(2).unwrap().machine_active(0));
        assert!(!engine.registered_here(2, 0).unwrap());

        engine.disconnect_port(1, &mut platform).unwrap();
        assert_eq!(engine.gip_count(0), 0);
    }

    #[test]
    fn propagates_to_is_false_on_a_disconnected_port() {
        let mut engine = Engine::new(1);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        assert_eq!(engine.propagates_to(1, 0), Ok(false));
    }

    /// Invariant 3 (`gip[i]` equals the number of connected ports
    /// registered) must hold throughout a *received*-Leave countdown, not
    /// just at its In/Empty endpoints. A received leave only drops the
    /// registrar out of `In`, through `Leave`/`Leave3`/`Leave2`/`Leave1`
    /// one leave-timer tick at a time; `registered_here` must keep
    /// reporting `true` (and `gip_count` must stay unchanged, since no
    /// indication — and therefore no propagation — fires) until the
    /// countdown completes and the registrar reaches `Empty`.
    #[test]
    fn received_leave_keeps_registered_and_gip_count_until_countdown_completes() {
        let mut engine = Engine::new(1);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        engine.create_port(2, PortConfig::default(), &mut platform);
        engine.connect_port(1, &mut platform).unwrap();
        engine.connect_port(2, &mut platform).unwrap();

        let indication = engine
            .manage_attribute(1, 0, GidEvent::FixRegistration)
            .unwrap();
        engine.propagate(1, 0, indication.unwrap()).unwrap();
        assert_eq!(engine.gip_count(0), 1);

        // A received Leave (not a management directive) starts the leave
        // countdown; the registrar is still In/Leave and reports
        // registered, so no indication fires and gip_count must not move.
        let indication = engine.rcv_msg(1, 0, GidEvent::RcvLeaveIn).unwrap();
        assert_eq!(indication, None);
        assert!(engine.registered_here(1, 0).unwrap());
        assert_eq!(engine.gip_count(0), 1);

        // Three leave-timer ticks walk Leave -> Leave3 -> Leave2 -> Leave1,
        // none of which indicate or move the count.
        for _ in 0..3 {
            let left = engine.leave_timer_expired(1, &mut platform).unwrap();
            assert!(left.is_empty());
            assert!(engine.registered_here(1, 0).unwrap());
            assert_eq!(engine.gip_count(0), 1);
        }

        // The fourth tick reaches Empty and is the one point the registrar
        // actually stops reporting registered; only now must it propagate.
        let left = engine.leave_timer_expired(1, &mut platform).unwrap();
        assert_eq!(left, alloc::vec![0]);
        assert!(!engine.registered_here(1, 0).unwrap());
        engine.propagate(1, 0, Indication::Leave).unwrap();
        assert_eq!(engine.gip_count(0), 0);
    }
}

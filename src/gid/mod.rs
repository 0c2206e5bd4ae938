//! GID core: the per-application arena of ports plus every entry point a
//! host or a higher layer ([`crate::gmr`]) drives — received messages,
//! local join/leave requests, management directives, and the four timer
//! expiries. [`gip`](crate::gip) extends [`Engine`] with a second `impl`
//! block for ring connection/propagation, since the two are really one
//! application-wide object split across two source files for the two
//! concerns they own.

pub mod port;

pub use port::Port;

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::event::{AttrIndex, GidEvent, Indication, PortId, TxEvent};
use crate::gip::Propagation;
use crate::platform::{Platform, PortConfig, TimerKind};

/// One GARP application: a fixed number of attributes, shared across every
/// port, and the arena of ports themselves.
///
/// Ports are never relocated once created, so arena indices handed out by
/// [`Engine::create_port`] stay valid for the port's lifetime; a destroyed
/// port's slot is left vacant (`None`) rather than shifting everything
/// after it, which would invalidate `port_ring`.
pub struct Engine {
    num_attributes: usize,
    ports: Vec<Option<Port>>,
    /// Arena indices in ascending port-number order — the "port ring" —
    /// doubling as the connected ring's base order (see
    /// [`crate::gip::connected_ring`]).
    port_ring: Vec<usize>,
    /// Dead-reckoning propagation counts, one per attribute, owned here
    /// since GIP is scoped per application exactly like GID (§5).
    pub(crate) gip_counts: Vec<u32>,
}

impl Engine {
    /// Builds an application for `num_attributes` attributes (legacy
    /// controls plus multicast slots, in whatever layout the caller —
    /// typically [`crate::gmr::Gmr`] — has chosen).
    pub fn new(num_attributes: usize) -> Self {
        Engine {
            num_attributes,
            ports: Vec::new(),
            port_ring: Vec::new(),
            gip_counts: alloc::vec![0; num_attributes],
        }
    }

    pub fn num_attributes(&self) -> usize {
        self.num_attributes
    }

    fn arena_index_of(&self, port_no: PortId) -> Option<usize> {
        self.ports
            .iter()
            .position(|slot| matches!(slot, Some(p) if p.port_no() == port_no))
    }

    pub fn port(&self, port_no: PortId) -> Result<&Port> {
        let index = self.arena_index_of(port_no).ok_or(Error::UnknownPort)?;
        Ok(self.ports[index].as_ref().expect("arena_index_of found a live slot"))
    }

    pub fn port_mut(&mut self, port_no: PortId) -> Result<&mut Port> {
        let index = self.arena_index_of(port_no).ok_or(Error::UnknownPort)?;
        Ok(self.ports[index].as_mut().expect("arena_index_of found a live slot"))
    }

    /// Ports in ascending port-number order, the traversal both the all-
    /// ports ring and (filtered) the connected ring use.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.port_ring
            .iter()
            .filter_map(move |&i| self.ports[i].as_ref())
    }

    /// `gid_create_port`. A duplicate port number is a caller logic error,
    /// not a recoverable one, matching the reference's `syserr_panic` on
    /// duplicate insertion. Arms the port's LeaveAll timer before
    /// returning, exactly as the reference's `gid_create_port` does ahead
    /// of invoking `added_port_fn`.
    pub fn create_port(
        &mut self,
        port_no: PortId,
        config: PortConfig,
        platform: &mut dyn Platform,
    ) -> PortId {
        if self.arena_index_of(port_no).is_some() {
            panic!("garp: duplicate port number {port_no}");
        }

        let port = Port::new(port_no, config, self.num_attributes);
        let arena_index = self.ports.len();
        self.ports.push(Some(port));

        let insert_at = self
            .port_ring
            .iter()
            .position(|&i| {
                self.ports[i]
                    .as_ref()
                    .expect("port_ring only holds live slots")
                    .port_no()
                    > port_no
            })
            .unwrap_or(self.port_ring.len());
        self.port_ring.insert(insert_at, arena_index);

        platform.start_timer(port_no, TimerKind::LeaveAll, config.leaveall_timeout_n_ms);

        #[cfg(feature = "logging")]
        log::debug!("garp: port {port_no} created");

        port_no
    }

    /// `gid_destroy_port`: unhooks from the connected ring (fanning out
    /// leave propagation to every other connected port via
    /// [`crate::gip::Engine::disconnect_port`]) and frees the slot.
    /// Returns both the attributes this port itself still had registered —
    /// the leave indications the caller's application layer must observe
    /// locally — and the peer-port propagations GIP applied internally, so
    /// a caller like [`crate::gmr::Gmr`] can keep its filtering database in
    /// sync with both halves instead of only the local one.
    pub fn destroy_port(
        &mut self,
        port_no: PortId,
        platform: &mut dyn Platform,
    ) -> Result<(Vec<AttrIndex>, Vec<Propagation>)> {
        let arena_index = self.arena_index_of(port_no).ok_or(Error::UnknownPort)?;
        let port = self.ports[arena_index]
            .as_ref()
            .expect("arena_index_of found a live slot");
        let left: Vec<AttrIndex> = (0..port.num_attributes())
            .filter(|&i| port.registered_here(i))
            .collect();

        let propagated = self.disconnect_port(port_no, platform)?;

        let arena_index = self.arena_index_of(port_no).ok_or(Error::UnknownPort)?;
        self.ports[arena_index] = None;
        self.port_ring.retain(|&i| i != arena_index);

        #[cfg(feature = "logging")]
        log::debug!("garp: port {port_no} destroyed");

        Ok((left, propagated))
    }

    /// A message received from the wire for one attribute on `port_no`.
    /// Returns the indication to propagate, if any. Does not call
    /// [`Port::do_actions`] — a host batches every record in one incoming
    /// PDU and commits the scratchpad once at the end, per §2.
    pub fn rcv_msg(
        &mut self,
        port_no: PortId,
        index: AttrIndex,
        event: GidEvent,
    ) -> Result<Option<Indication>> {
        let port = self.port_mut(port_no)?;
        if index >= port.num_attributes() {
            return Err(Error::InvalidIndex);
        }
        Ok(port.advance(index, event))
    }

    /// A received LeaveAll marker record.
    pub fn rcv_leaveall(&mut self, port_no: PortId) -> Result<()> {
        self.port_mut(port_no)?.rcv_leaveall();
        Ok(())
    }

    /// A local join request (from management, or from GIP propagating a
    /// join from another port). Never itself produces an indication: the
    /// registrar side is untouched by `Join`/`Leave` events.
    pub fn join_request(&mut self, port_no: PortId, index: AttrIndex) -> Result<()> {
        self.port_mut(port_no)?.advance(index, GidEvent::Join);
        Ok(())
    }

    pub fn leave_request(&mut self, port_no: PortId, index: AttrIndex) -> Result<()> {
        self.port_mut(port_no)?.advance(index, GidEvent::Leave);
        Ok(())
    }

    /// A management directive: `NormalRegistration`, `FixRegistration`, or
    /// `ForbidRegistration`.
    pub fn manage_attribute(
        &mut self,
        port_no: PortId,
        index: AttrIndex,
        directive: GidEvent,
    ) -> Result<Option<Indication>> {
        debug_assert!(matches!(
            directive,
            GidEvent::NormalRegistration | GidEvent::FixRegistration | GidEvent::ForbidRegistration
        ));
        let port = self.port_mut(port_no)?;
        if index >= port.num_attributes() {
            return Err(Error::InvalidIndex);
        }
        Ok(port.advance(index, directive))
    }

    pub fn registered_here(&self, port_no: PortId, index: AttrIndex) -> Result<bool> {
        Ok(self.port(port_no)?.registered_here(index))
    }

    /// Commits `port_no`'s scratchpad to real timers. Call once after a
    /// batch of `rcv_msg`/`rcv_leaveall`/`join_request`/`leave_request`
    /// calls driven off a single incoming PDU or a single local request.
    pub fn do_actions(&mut self, port_no: PortId, platform: &mut dyn Platform) -> Result<()> {
        self.port_mut(port_no)?.do_actions(platform);
        Ok(())
    }

    pub fn next_tx(&mut self, port_no: PortId) -> Result<Option<TxEvent>> {
        Ok(self.port_mut(port_no)?.next_tx())
    }

    pub fn untx(&mut self, port_no: PortId) -> Result<()> {
        self.port_mut(port_no)?.untx();
        Ok(())
    }

    /// `gid_join_timer_expiry`: returns `true` if the caller should now
    /// drain `next_tx` into a PDU.
    pub fn join_timer_expired(&mut self, port_no: PortId, platform: &mut dyn Platform) -> Result<bool> {
        Ok(self.port_mut(port_no)?.join_timer_expired(platform))
    }

    pub fn hold_timer_expired(&mut self, port_no: PortId, platform: &mut dyn Platform) -> Result<()> {
        self.port_mut(port_no)?.hold_timer_expired(platform);
        Ok(())
    }

    /// `gid_leave_timer_expiry`. The reference scans `0 < gid_index <
    /// last_gid_used`, a strict bound that skips the final real index;
    /// iterating the full `0..len()` range here (§9) reaches every
    /// attribute instead.
    pub fn leave_timer_expired(
        &mut self,
        port_no: PortId,
        platform: &mut dyn Platform,
    ) -> Result<Vec<AttrIndex>> {
        Ok(self.port_mut(port_no)?.leave_timer_expired(platform))
    }

    pub fn leaveall_timer_expired(&mut self, port_no: PortId, platform: &mut dyn Platform) -> Result<()> {
        self.port_mut(port_no)?.leaveall_timer_expired(platform);
        Ok(())
    }

    /// `gid_find_unused`: the lowest attribute index at or after
    /// `from_index` that is inactive on every port, or `None` if the
    /// application is full.
    pub fn find_unused(&self, from_index: AttrIndex) -> Option<AttrIndex> {
        'search: for index in from_index..self.num_attributes {
            for port in self.ports() {
                if port.machine_active(index) {
                    continue 'search;
                }
            }
            return Some(index);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RecordingPlatform;

    #[test]
    #[should_panic(expected = "duplicate port")]
    fn create_port_rejects_duplicates() {
        let mut engine = Engine::new(4);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        engine.create_port(1, PortConfig::default(), &mut platform);
    }

    #[test]
    fn find_unused_skips_active_slots_across_all_ports() {
        let mut engine = Engine::new(3);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        engine.create_port(2, PortConfig::default(), &mut platform);
        engine.join_request(1, 0).unwrap();
        assert_eq!(engine.find_unused(0), Some(1));
    }

    #[test]
    fn destroy_port_frees_its_slot_without_disturbing_others() {
        let mut engine = Engine::new(2);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        engine.create_port(2, PortConfig::default(), &mut platform);
        let (left, propagated) = engine.destroy_port(1, &mut platform).unwrap();
        assert!(left.is_empty());
        assert!(propagated.is_empty());
        assert!(engine.port(1).is_err());
        assert!(engine.port(2).is_ok());
    }

    #[test]
    fn rcv_msg_on_unknown_port_is_an_error() {
        let mut engine = Engine::new(2);
        let result = engine.rcv_msg(99, 0, GidEvent::RcvJoinIn);
        assert!(matches!(result, Err(Error::UnknownPort)));
    }

    #[test]
    fn join_then_leaveall_timer_drives_rejoin_through_next_tx() {
        let mut engine = Engine::new(1);
        let mut platform = RecordingPlatform::default();
        engine.create_port(1, PortConfig::default(), &mut platform);
        engine.join_request(1, 0).unwrap();
        engine.do_actions(1, &mut platform).unwrap();
        assert!(engine.next_tx(1).unwrap().is_some());
    }
}

//! GMR: the GARP Multicast Registration application built on top of GID
//! and GIP. Translates join/leave indications on two legacy controls
//! (ForwardAll, ForwardUnregistered) and on individual multicast
//! addresses into filtering-database policy under the three-mode scheme
//! described in `gmr.h`/`gmr.c` of the reference.
//!
//! `Number_of_legacy_controls` is `2` here, not the reference's `1` — see
//! `DESIGN.md` for why treating that as a typo rather than a deliberate
//! non-goal is the right call: the reference's own join/leave indication
//! logic is written generically against `Legacy_control` having two
//! members, and at `1` `Forward_unregistered`'s gid index would alias the
//! first multicast slot.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::event::{AttrIndex, AttributeType, GidEvent, Indication, PortId, TxEvent, TxMessage};
use crate::gid::Engine;
use crate::pdu::{PduReader, PduRecord, PduWriter};
use crate::platform::{Platform, PortConfig};

/// `Forward_all` / `Forward_unregistered` from `gmr.h`'s `Legacy_control`
/// enum, and the corrected `Number_of_legacy_controls` (see module docs).
pub const FORWARD_ALL: AttrIndex = 0;
pub const FORWARD_UNREGISTERED: AttrIndex = 1;
pub const NUMBER_OF_LEGACY_CONTROLS: AttrIndex = 2;

/// A six-octet group MAC address, the GMD's key type.
pub type Mac = [u8; 6];

/// The three filtering policies a connected port can be in, driven by
/// whether the two legacy controls are registered on it (`gmr.h`'s
/// commentary on `gmr_join_indication`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// ForwardAll registered: forward unconditionally, takes precedence
    /// over ForwardUnregistered.
    ForwardAll,
    /// ForwardAll clear, ForwardUnregistered registered: forward unless a
    /// multicast is registered elsewhere in the connected ring and not
    /// registered here.
    ForwardUnregistered,
    /// Neither registered: filter by default, forward only multicasts
    /// registered here.
    FilterByDefault,
}

/// The filtering database GMR drives (§6). Side-effect only, consumed for
/// the duration of one call rather than stored, exactly like
/// [`crate::platform::Platform`].
pub trait FilteringDatabase {
    fn filter(&mut self, vlan: u16, port: PortId, mac: Mac);
    fn forward(&mut self, vlan: u16, port: PortId, mac: Mac);
    fn filter_by_default(&mut self, vlan: u16, port: PortId);
    fn forward_by_default(&mut self, vlan: u16, port: PortId);
}

/// GMD: the multicast address table. Unlike the filtering database and
/// the PDU codec, the reference itself notes this carries no algorithmic
/// depth ("a simple keyed table") and ships it as an empty stub
/// (`gmd.c`); this crate gives it a real, bounded implementation rather
/// than pushing it onto a host, since there is nothing host-specific
/// about a MAC-to-index table.
pub struct MulticastTable {
    keys: Vec<Option<Mac>>,
    last_used_plus1: usize,
}

impl MulticastTable {
    pub fn new(capacity: usize) -> Self {
        MulticastTable {
            keys: alloc::vec![None; capacity],
            last_used_plus1: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// High-water mark: entries at or past this index have never been
    /// used, so scans (join-indication's sweep over "every known
    /// multicast", `gmr_tx`'s lookups) need not walk past it.
    pub fn last_used_plus1(&self) -> usize {
        self.last_used_plus1
    }

    /// `gmd_find_entry`.
    pub fn find(&self, key: Mac) -> Option<usize> {
        self.keys[..self.last_used_plus1]
            .iter()
            .position(|slot| *slot == Some(key))
    }

    /// `gmd_create_entry`: reuses a hole below the high-water mark before
    /// extending it, and fails once both the table and the mark have
    /// reached capacity.
    pub fn create(&mut self, key: Mac) -> Option<usize> {
        if let Some(index) = self.keys[..self.last_used_plus1]
            .iter()
            .position(Option::is_none)
        {
            self.keys[index] = Some(key);
            return Some(index);
        }
        if self.last_used_plus1 < self.keys.len() {
            let index = self.last_used_plus1;
            self.keys[index] = Some(key);
            self.last_used_plus1 += 1;
            return Some(index);
        }
        None
    }

    /// `gmd_delete_entry`.
    pub fn delete(&mut self, index: usize) {
        if let Some(slot) = self.keys.get_mut(index) {
            *slot = None;
        }
    }

    /// `gmd_get_key`.
    pub fn get_key(&self, index: usize) -> Option<Mac> {
        self.keys.get(index).copied().flatten()
    }
}

/// The GMR control block: a GARP application ([`Engine`]) wired up with
/// GMR-specific policy, a VLAN identifier (`0` meaning the base LAN), and
/// the multicast address table.
pub struct Gmr {
    pub engine: Engine,
    vlan_id: u16,
    gmd: MulticastTable,
}

impl Gmr {
    /// `gmr_create_gmr`. `max_multicasts` becomes the GMD's capacity; the
    /// application's attribute space is `Number_of_legacy_controls` wider
    /// to make room for ForwardAll and ForwardUnregistered ahead of the
    /// multicast indices.
    pub fn new(vlan_id: u16, max_multicasts: usize) -> Self {
        Gmr {
            engine: Engine::new(NUMBER_OF_LEGACY_CONTROLS + max_multicasts),
            vlan_id,
            gmd: MulticastTable::new(max_multicasts),
        }
    }

    pub fn vlan_id(&self) -> u16 {
        self.vlan_id
    }

    pub fn gmd(&self) -> &MulticastTable {
        &self.gmd
    }

    fn gid_index_of(&self, gmd_index: usize) -> AttrIndex {
        NUMBER_OF_LEGACY_CONTROLS + gmd_index
    }

    /// `gmr_added_port` reduces, in this crate, to [`Engine::create_port`]
    /// plus whatever permanent-template registration a host performs
    /// before connecting the port (see `gmr.h`'s note on connection
    /// ordering) — there is nothing left for a callback to do that the
    /// call site doesn't already know.
    pub fn create_port(
        &mut self,
        port_no: PortId,
        config: PortConfig,
        platform: &mut dyn Platform,
    ) -> PortId {
        self.engine.create_port(port_no, config, platform)
    }

    /// `gmr_destroy_gmr`'s per-port half plus `gmr_removed_port`. Returns
    /// the attributes `port_no` itself had registered, for whatever local
    /// bookkeeping the caller still needs to do (e.g. releasing GMD
    /// entries that were only referenced from this port); the peer-side
    /// fallout is applied to `fdb` directly, the same as
    /// [`Gmr::disconnect_port`].
    pub fn destroy_port(
        &mut self,
        port_no: PortId,
        platform: &mut dyn Platform,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<Vec<AttrIndex>> {
        let (left, propagated) = self.engine.destroy_port(port_no, platform)?;
        for p in propagated {
            self.apply_propagation(p.port_no, p.index, p.indication, fdb)?;
        }
        Ok(left)
    }

    pub fn connect_port(
        &mut self,
        port_no: PortId,
        platform: &mut dyn Platform,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        let propagated = self.engine.connect_port(port_no, platform)?;
        for p in propagated {
            self.apply_propagation(p.port_no, p.index, p.indication, fdb)?;
        }
        Ok(())
    }

    pub fn disconnect_port(
        &mut self,
        port_no: PortId,
        platform: &mut dyn Platform,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        let propagated = self.engine.disconnect_port(port_no, platform)?;
        for p in propagated {
            self.apply_propagation(p.port_no, p.index, p.indication, fdb)?;
        }
        Ok(())
    }

    /// The three-mode policy (`gmr.h`'s commentary on `gmr_join_indication`)
    /// a connected port is currently operating under.
    pub fn mode_on(&self, port_no: PortId) -> Result<Mode> {
        if self.engine.registered_here(port_no, FORWARD_ALL)? {
            Ok(Mode::ForwardAll)
        } else if self.engine.registered_here(port_no, FORWARD_UNREGISTERED)? {
            Ok(Mode::ForwardUnregistered)
        } else {
            Ok(Mode::FilterByDefault)
        }
    }

    /// `gmr_join_indication`. The reference gates the whole function on
    /// `!gid_registered_here(my_port, Forward_all)` read *after* GID has
    /// already advanced the machine for this very indication — which,
    /// when `joining_gid_index == Forward_all` itself, reads back `true`
    /// and silently discards the one call that's supposed to switch the
    /// port into Mode A. This crate instead gates on the mode the port was
    /// in immediately *before* this join took effect (`prior_mode`,
    /// threaded in by [`Gmr::dispatch`]), which is always not-Mode-A when
    /// the joining attribute is ForwardAll itself (the indication only
    /// fires on a genuine not-registered-to-registered transition) and
    /// otherwise matches the reference's intent of "skip, we were already
    /// forwarding everything."
    fn join_indication(
        &mut self,
        port_no: PortId,
        joining_gid_index: AttrIndex,
        prior_mode: Mode,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        if prior_mode == Mode::ForwardAll {
            return Ok(());
        }

        if joining_gid_index == FORWARD_ALL || joining_gid_index == FORWARD_UNREGISTERED {
            for gmd_index in 0..self.gmd.last_used_plus1() {
                let Some(key) = self.gmd.get_key(gmd_index) else {
                    continue;
                };
                let gid_index = self.gid_index_of(gmd_index);
                if self.engine.registered_here(port_no, gid_index)? {
                    continue;
                }
                if joining_gid_index == FORWARD_ALL {
                    fdb.forward(self.vlan_id, port_no, key);
                } else if !self.engine.propagates_to(port_no, gid_index)? {
                    fdb.forward(self.vlan_id, port_no, key);
                }
            }
            fdb.forward_by_default(self.vlan_id, port_no);
        } else {
            let gmd_index = joining_gid_index - NUMBER_OF_LEGACY_CONTROLS;
            if let Some(key) = self.gmd.get_key(gmd_index) {
                fdb.forward(self.vlan_id, port_no, key);
            }
        }
        Ok(())
    }

    /// `gmr_join_propagated`: only meaningful in Mode B (ForwardUnregistered
    /// without ForwardAll) — a multicast that just became registered
    /// elsewhere in the connected ring, and is not registered here, must
    /// now be filtered on this port instead of riding the default-forward
    /// policy.
    fn join_propagated(
        &mut self,
        port_no: PortId,
        joining_gid_index: AttrIndex,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        if joining_gid_index < NUMBER_OF_LEGACY_CONTROLS {
            return Ok(());
        }
        if self.mode_on(port_no)? != Mode::ForwardUnregistered {
            return Ok(());
        }
        if self.engine.registered_here(port_no, joining_gid_index)? {
            return Ok(());
        }
        let gmd_index = joining_gid_index - NUMBER_OF_LEGACY_CONTROLS;
        if let Some(key) = self.gmd.get_key(gmd_index) {
            fdb.filter(self.vlan_id, port_no, key);
        }
        Ok(())
    }

    /// `gmr_leave_indication`, mirroring [`Gmr::join_indication`] with
    /// forward/filter inverted. Unlike the join side, `mode_a`/`mode_c`
    /// here are read fresh *after* the leave (as the reference does) and
    /// that is correct: a leave indication for `Forward_all` itself has
    /// already made `registered_here(Forward_all)` false by the time this
    /// runs, so there is no analogous self-referential trap. The
    /// reference's one genuine bug in this function — a reference to an
    /// uninitialized `gid_index` left over from the preceding loop inside
    /// the final multicast-attribute branch — is resolved here by using
    /// `leaving_gid_index` directly, as §9 prescribes.
    fn leave_indication(
        &mut self,
        port_no: PortId,
        leaving_gid_index: AttrIndex,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        let mode_a = self.engine.registered_here(port_no, FORWARD_ALL)?;
        let mode_c = !self.engine.registered_here(port_no, FORWARD_UNREGISTERED)?;

        if leaving_gid_index == FORWARD_ALL || (!mode_a && leaving_gid_index == FORWARD_UNREGISTERED) {
            for gmd_index in 0..self.gmd.last_used_plus1() {
                let Some(key) = self.gmd.get_key(gmd_index) else {
                    continue;
                };
                let gid_index = self.gid_index_of(gmd_index);
                if self.engine.registered_here(port_no, gid_index)? {
                    continue;
                }
                if mode_c || self.engine.propagates_to(port_no, gid_index)? {
                    fdb.filter(self.vlan_id, port_no, key);
                }
            }
            if mode_c {
                fdb.filter_by_default(self.vlan_id, port_no);
            }
        } else if !mode_a && leaving_gid_index >= NUMBER_OF_LEGACY_CONTROLS {
            if mode_c || self.engine.propagates_to(port_no, leaving_gid_index)? {
                let gmd_index = leaving_gid_index - NUMBER_OF_LEGACY_CONTROLS;
                if let Some(key) = self.gmd.get_key(gmd_index) {
                    fdb.filter(self.vlan_id, port_no, key);
                }
            }
        }
        Ok(())
    }

    /// `gmr_leave_propagated`: the mirror of [`Gmr::join_propagated`] —
    /// restores forwarding in Mode B once a multicast is no longer
    /// registered anywhere that matters to this port.
    fn leave_propagated(
        &mut self,
        port_no: PortId,
        leaving_gid_index: AttrIndex,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        if leaving_gid_index < NUMBER_OF_LEGACY_CONTROLS {
            return Ok(());
        }
        if self.mode_on(port_no)? != Mode::ForwardUnregistered {
            return Ok(());
        }
        if self.engine.registered_here(port_no, leaving_gid_index)? {
            return Ok(());
        }
        let gmd_index = leaving_gid_index - NUMBER_OF_LEGACY_CONTROLS;
        if let Some(key) = self.gmd.get_key(gmd_index) {
            fdb.forward(self.vlan_id, port_no, key);
        }
        Ok(())
    }

    fn apply_propagation(
        &mut self,
        port_no: PortId,
        index: AttrIndex,
        indication: Indication,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        match indication {
            Indication::Join => self.join_propagated(port_no, index, fdb),
            Indication::Leave => self.leave_propagated(port_no, index, fdb),
        }
    }

    /// Drives one GID indication all the way through: the local
    /// join/leave indication handling, then GIP propagation, then every
    /// propagated port's join/leave-propagated handling — the full
    /// control-flow loop described in §2.
    fn dispatch(
        &mut self,
        port_no: PortId,
        index: AttrIndex,
        prior_mode: Mode,
        indication: Indication,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        match indication {
            Indication::Join => self.join_indication(port_no, index, prior_mode, fdb)?,
            Indication::Leave => self.leave_indication(port_no, index, fdb)?,
        }

        let propagated = self.engine.propagate(port_no, index, indication)?;
        for p in propagated {
            match p.indication {
                Indication::Join => self.join_propagated(p.port_no, p.index, fdb)?,
                Indication::Leave => self.leave_propagated(p.port_no, p.index, fdb)?,
            }
        }
        Ok(())
    }

    /// `gmr_rcv_msg`: locate (or, for an arriving join, allocate) the GMD
    /// entry for one decoded record and submit it to GID.
    fn rcv_record(
        &mut self,
        port_no: PortId,
        record: PduRecord,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        if record.event == GidEvent::RcvLeaveAll || record.event == GidEvent::RcvLeaveAllRange {
            self.engine.rcv_leaveall(port_no)?;
            return Ok(());
        }

        let gid_index = match record.attribute_type {
            AttributeType::Legacy => record.legacy_index,
            AttributeType::Multicast => {
                let key = record.mac.ok_or(Error::PduTruncated)?;
                match self.gmd.find(key) {
                    Some(gmd_index) => Some(self.gid_index_of(gmd_index)),
                    None => self.admit_new_multicast(key, record.event)?,
                }
            }
            AttributeType::All => None,
        };

        let Some(gid_index) = gid_index else {
            return Ok(());
        };

        let prior_mode = self.mode_on(port_no)?;
        if let Some(indication) = self.engine.rcv_msg(port_no, gid_index, record.event)? {
            self.dispatch(port_no, gid_index, prior_mode, indication, fdb)?;
        }
        Ok(())
    }

    /// Only a join variant justifies creating a fresh GMD entry; a leave
    /// or empty for an unknown multicast is simply discarded (`gmr.c`'s
    /// `gmr_rcv_msg` comment: "Leave and Empty messages can be discarded").
    fn admit_new_multicast(&mut self, key: Mac, event: GidEvent) -> Result<Option<AttrIndex>> {
        if !matches!(event, GidEvent::RcvJoinIn | GidEvent::RcvJoinEmpty) {
            return Ok(None);
        }
        if let Some(gmd_index) = self.gmd.create(key) {
            return Ok(Some(self.gid_index_of(gmd_index)));
        }
        if let Some(reclaimed) = self.engine.find_unused(NUMBER_OF_LEGACY_CONTROLS) {
            let gmd_index = reclaimed - NUMBER_OF_LEGACY_CONTROLS;
            self.gmd.delete(gmd_index);
            let recreated = self.gmd.create(key);
            debug_assert!(recreated == Some(gmd_index));
            return Ok(Some(reclaimed));
        }
        #[cfg(feature = "logging")]
        log::warn!("garp: gmr multicast database full, dropping join for new address");
        Ok(None)
    }

    /// `gmr_rcv`: drains every record a host's PDU reader hands back.
    pub fn rcv(
        &mut self,
        port_no: PortId,
        reader: &mut dyn PduReader,
        fdb: &mut dyn FilteringDatabase,
    ) -> Result<()> {
        while let Some(record) = reader.next_record() {
            self.rcv_record(port_no, record, fdb)?;
        }
        Ok(())
    }

    /// `gmr_tx`: pulls messages off the transmit cursor and packs them
    /// into as many PDUs as the writer needs, `untx`-ing the one message
    /// that didn't fit each time the writer signals overflow.
    pub fn tx(&mut self, port_no: PortId, make_writer: &mut dyn FnMut() -> Box<dyn PduWriter>) -> Result<()> {
        let Some(mut event) = self.engine.next_tx(port_no)? else {
            return Ok(());
        };

        loop {
            let mut writer = make_writer();
            loop {
                let record = self.decorate(event);
                if !writer.write_record(record) {
                    self.engine.untx(port_no)?;
                    break;
                }
                match self.engine.next_tx(port_no)? {
                    Some(next) => event = next,
                    None => return Ok(()),
                }
            }
        }
    }

    fn decorate(&self, event: TxEvent) -> PduRecord {
        match event {
            TxEvent::LeaveAll => PduRecord::leave_all(),
            TxEvent::Attribute(index, message) => {
                let gid_event = tx_message_to_event(message);
                if index < NUMBER_OF_LEGACY_CONTROLS {
                    PduRecord::legacy(index, gid_event)
                } else {
                    let gmd_index = index - NUMBER_OF_LEGACY_CONTROLS;
                    let key = self.gmd.get_key(gmd_index).unwrap_or([0; 6]);
                    PduRecord::multicast(key, gid_event)
                }
            }
        }
    }
}

fn tx_message_to_event(message: TxMessage) -> GidEvent {
    match message {
        TxMessage::LeaveEmpty => GidEvent::TxLeaveEmpty,
        TxMessage::LeaveIn => GidEvent::TxLeaveIn,
        TxMessage::Empty => GidEvent::TxEmpty,
        TxMessage::JoinEmpty => GidEvent::TxJoinEmpty,
        TxMessage::JoinIn => GidEvent::TxJoinIn,
    }
}

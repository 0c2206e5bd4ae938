//! One (application, port) control block: its machine array, scratchpad,
//! and transmit cursor.
//!
//! The reference threads each port into two circular intrusive rings at
//! once (all-ports, connected-ports) and appends a one-slot pushback
//! buffer onto the end of the machines array for `untransmit_machine`.
//! Neither survives translation as-is (§9): this crate's [`super::Engine`]
//! keeps ports in a flat arena indexed by position, with the all-ports
//! ring realized as a plain ascending-port-number `Vec<usize>` of arena
//! indices and the connected ring realized as a *filter* over that same
//! vector rather than a second spliced linked list — recomputing which
//! ports are connected is cheap and trivially correct, where splicing a
//! second intrusive ring is exactly the aliasing hazard the design note
//! warns against. `untransmit_machine` becomes an ordinary struct field
//! instead of a phantom array slot.

use alloc::vec;
use alloc::vec::Vec;
use bitflags::bitflags;

use crate::event::{AttrIndex, GidEvent, Indication, PortId, TxEvent};
use crate::gidtt::{self, GidMachine};
use crate::platform::{Platform, PortConfig, TimerKind};

bitflags! {
    /// Persistent flags, scratchpad flags accumulated during one
    /// invocation, and commitment flags mirroring outstanding real
    /// timers — all three categories the data model (§3) asks for, in
    /// one packed word.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct PortFlags: u16 {
        const ENABLED             = 1 << 0;
        const CONNECTED           = 1 << 1;
        const POINT_TO_POINT      = 1 << 2;

        const SCHEDULE_TX_NOW     = 1 << 3;
        const START_JOIN_TIMER    = 1 << 4;
        const START_LEAVE_TIMER   = 1 << 5;

        const TX_NOW_SCHEDULED    = 1 << 6;
        const JOIN_TIMER_RUNNING  = 1 << 7;
        const LEAVE_TIMER_RUNNING = 1 << 8;
        const HOLD_TX             = 1 << 9;
        const TX_PENDING          = 1 << 10;
    }
}

impl Default for PortFlags {
    fn default() -> Self {
        PortFlags::empty()
    }
}

pub(crate) const LEAVEALL_COUNT: u8 = 4;

pub struct Port {
    pub(crate) port_no: PortId,
    pub(crate) config: PortConfig,
    pub(crate) flags: PortFlags,
    pub(crate) machines: Vec<GidMachine>,
    untransmit_machine: GidMachine,
    last_transmitted: usize,
    last_to_transmit: usize,
    leaveall_countdown: u8,
}

impl Port {
    pub(crate) fn new(port_no: PortId, config: PortConfig, num_attributes: usize) -> Self {
        let last_index = num_attributes.saturating_sub(1);
        let mut flags = PortFlags::ENABLED;
        if config.is_point_to_point {
            flags.insert(PortFlags::POINT_TO_POINT);
        }
        Port {
            port_no,
            config,
            flags,
            machines: vec![GidMachine::default(); num_attributes],
            untransmit_machine: GidMachine::default(),
            last_transmitted: last_index,
            last_to_transmit: last_index,
            leaveall_countdown: LEAVEALL_COUNT,
        }
    }

    pub fn port_no(&self) -> PortId {
        self.port_no
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(PortFlags::ENABLED)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.flags.set(PortFlags::ENABLED, enabled);
    }

    pub fn is_connected(&self) -> bool {
        self.flags.contains(PortFlags::CONNECTED)
    }

    /// `gip_connect_port`/`gip_disconnect_port` splice a port into or out of
    /// the connected ring and flip this alongside; kept as a crate-private
    /// setter since only [`crate::gip`] decides when a port is connected.
    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.flags.set(PortFlags::CONNECTED, connected);
    }

    pub fn is_point_to_point(&self) -> bool {
        self.flags.contains(PortFlags::POINT_TO_POINT)
    }

    pub fn leaveall_countdown(&self) -> u8 {
        self.leaveall_countdown
    }

    pub fn num_attributes(&self) -> usize {
        self.machines.len()
    }

    /// `gid_registered_here`.
    pub fn registered_here(&self, index: AttrIndex) -> bool {
        self.machines.get(index).is_some_and(gidtt::in_)
    }

    /// `gidtt_machine_active`, for one index on this port.
    pub fn machine_active(&self, index: AttrIndex) -> bool {
        self.machines.get(index).is_some_and(gidtt::machine_active)
    }

    fn apply_outcome(&mut self, outcome: gidtt::AdvanceOutcome) -> Option<Indication> {
        if outcome.start_join_timer {
            self.flags.insert(PortFlags::START_JOIN_TIMER);
        }
        if outcome.start_leave_timer {
            self.flags.insert(PortFlags::START_LEAVE_TIMER);
        }
        if outcome.schedule_tx_now {
            self.flags.insert(PortFlags::SCHEDULE_TX_NOW);
        }
        outcome.indication
    }

    /// Advances one machine by `event`, merging scratchpad deltas and
    /// returning the indication (if any) the caller must propagate. Used
    /// by received messages, local join/leave requests, and management
    /// directives alike — they differ only in which `GidEvent` they pass.
    pub(crate) fn advance(&mut self, index: AttrIndex, event: GidEvent) -> Option<Indication> {
        let machine = &mut self.machines[index];
        let outcome = gidtt::advance(machine, event);
        self.apply_outcome(outcome)
    }

    /// `gid_rcv_leaveall`: as if every attribute just received a
    /// LeaveEmpty, without emitting local indications — LeaveAll never
    /// causes a direct indication on shared media.
    pub(crate) fn rcv_leaveall(&mut self) {
        self.leaveall_countdown = LEAVEALL_COUNT;
        for index in 0..self.machines.len() {
            let outcome = gidtt::advance(&mut self.machines[index], GidEvent::RcvLeaveEmpty);
            self.apply_outcome(outcome);
        }
    }

    /// One tick of the join timer: if enabled, the caller must now drain
    /// `next_tx` into a PDU; either way a hold timer is armed so the next
    /// transmit opportunity is throttled.
    pub(crate) fn join_timer_expired(&mut self, platform: &mut dyn Platform) -> bool {
        self.flags
            .remove(PortFlags::JOIN_TIMER_RUNNING | PortFlags::TX_NOW_SCHEDULED);
        let should_transmit = self.is_enabled();
        self.flags.insert(PortFlags::HOLD_TX);
        platform.start_timer(self.port_no, TimerKind::Hold, self.config.hold_timeout_ms);
        should_transmit
    }

    /// The hold timer releases any immediate-transmit or join-timer start
    /// that accumulated while transmission was throttled.
    pub(crate) fn hold_timer_expired(&mut self, platform: &mut dyn Platform) {
        self.flags.remove(PortFlags::HOLD_TX);
        self.do_actions(platform);
    }

    /// One step of the leave-timer countdown for every machine on this
    /// port; returns the indices whose registrar just emptied out, for
    /// the caller to propagate as leave indications.
    pub(crate) fn leave_timer_expired(&mut self, platform: &mut dyn Platform) -> Vec<AttrIndex> {
        let mut left = Vec::new();
        for index in 0..self.machines.len() {
            let result = gidtt::leave_timer_tick(&mut self.machines[index]);
            if result.start_leave_timer {
                self.flags.insert(PortFlags::START_LEAVE_TIMER);
            }
            if result.indication == Some(Indication::Leave) {
                left.push(index);
            }
        }
        self.do_actions(platform);
        left
    }

    /// LeaveAll-timer fires locally: suppress (decrement) if a peer's
    /// LeaveAll has already reset the countdown this epoch, otherwise run
    /// a local LeaveAll and make sure a join timer is pending to carry the
    /// resulting rejoins.
    pub(crate) fn leaveall_timer_expired(&mut self, platform: &mut dyn Platform) {
        if self.leaveall_countdown > 1 {
            self.leaveall_countdown -= 1;
        } else {
            for index in 0..self.machines.len() {
                let outcome = gidtt::advance(&mut self.machines[index], GidEvent::RcvLeaveEmpty);
                self.apply_outcome(outcome);
            }
            self.leaveall_countdown = 0;
            if !self.flags.contains(PortFlags::JOIN_TIMER_RUNNING) {
                platform.start_random_timer(
                    self.port_no,
                    TimerKind::Join,
                    self.config.join_timeout_ms,
                );
                self.flags.insert(PortFlags::JOIN_TIMER_RUNNING);
            }
        }
        platform.start_timer(
            self.port_no,
            TimerKind::LeaveAll,
            self.config.leaveall_timeout_n_ms,
        );
    }

    /// `gid_do_actions`: commits accumulated scratchpad intent to real
    /// timers. `cschedule_tx_now` is cleared only when `hold_tx` is clear
    /// — preserved from the reference (§9): a held immediate-transmit
    /// request survives the hold interval and is released the next time
    /// `do_actions` runs with `hold_tx` clear, rather than being lost.
    pub(crate) fn do_actions(&mut self, platform: &mut dyn Platform) {
        if self.flags.contains(PortFlags::START_JOIN_TIMER) {
            self.last_to_transmit = self.last_transmitted;
            self.flags.insert(PortFlags::TX_PENDING);
            self.flags.remove(PortFlags::START_JOIN_TIMER);
        }

        if !self.flags.contains(PortFlags::HOLD_TX) {
            if self.flags.contains(PortFlags::SCHEDULE_TX_NOW) {
                if !self.flags.contains(PortFlags::TX_NOW_SCHEDULED) {
                    platform.schedule_now(self.port_no, TimerKind::Join);
                    self.flags.insert(PortFlags::TX_NOW_SCHEDULED);
                }
                self.flags.remove(PortFlags::SCHEDULE_TX_NOW);
            } else if (self.flags.contains(PortFlags::TX_PENDING) || self.leaveall_countdown == 0)
                && !self.flags.contains(PortFlags::JOIN_TIMER_RUNNING)
            {
                platform.start_random_timer(
                    self.port_no,
                    TimerKind::Join,
                    self.config.join_timeout_ms,
                );
                self.flags.insert(PortFlags::JOIN_TIMER_RUNNING);
            }
        }

        if self.flags.contains(PortFlags::START_LEAVE_TIMER) {
            if !self.flags.contains(PortFlags::LEAVE_TIMER_RUNNING) {
                platform.start_timer(
                    self.port_no,
                    TimerKind::Leave,
                    self.config.leave_timeout_4_ms,
                );
                self.flags.insert(PortFlags::LEAVE_TIMER_RUNNING);
            }
            self.flags.remove(PortFlags::START_LEAVE_TIMER);
        }
    }

    /// `gid_next_tx`: the next message to transmit and its attribute
    /// index, or `None` when nothing is pending. LeaveAll always wins and
    /// is always the first element of a PDU emitted after a local
    /// LeaveAll epoch, so the rejoins it triggers ride in the same PDU.
    pub fn next_tx(&mut self) -> Option<TxEvent> {
        if self.flags.contains(PortFlags::HOLD_TX) {
            return None;
        }
        if self.leaveall_countdown == 0 {
            self.leaveall_countdown = LEAVEALL_COUNT;
            return Some(TxEvent::LeaveAll);
        }
        if !self.flags.contains(PortFlags::TX_PENDING) {
            return None;
        }

        let n = self.machines.len();
        if n == 0 {
            self.flags.remove(PortFlags::TX_PENDING);
            return None;
        }
        let last_index = n - 1;

        let mut check_index = self.last_transmitted + 1;
        let mut stop_after = self.last_to_transmit;
        if stop_after < check_index {
            stop_after = last_index;
        }

        loop {
            if check_index > last_index {
                check_index = 0;
                stop_after = self.last_to_transmit;
            }

            let pre_advance = self.machines[check_index];
            if let Some(message) = gidtt::tx(&mut self.machines[check_index]) {
                self.untransmit_machine = pre_advance;
                self.last_transmitted = check_index;
                self.flags.set(PortFlags::TX_PENDING, check_index != stop_after);
                return Some(TxEvent::Attribute(check_index, message));
            }

            if check_index == stop_after {
                break;
            }
            check_index += 1;
        }

        self.flags.remove(PortFlags::TX_PENDING);
        None
    }

    /// `gid_untx`: restores the machine pushed back by the most recent
    /// `next_tx` and rewinds the cursor. Valid only immediately after that
    /// call; an intervening event may have mutated the machine, and
    /// calling this out of sequence is the caller's bug.
    pub fn untx(&mut self) {
        let index = self.last_transmitted;
        self.machines[index] = self.untransmit_machine;
        self.last_transmitted = if index == 0 {
            self.machines.len() - 1
        } else {
            index - 1
        };
        self.flags.insert(PortFlags::TX_PENDING);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RecordingPlatform;

    #[test]
    fn fresh_port_has_no_pending_transmit() {
        let mut port = Port::new(1, PortConfig::default(), 4);
        assert_eq!(port.next_tx(), None);
    }

    #[test]
    fn join_request_schedules_immediate_transmit() {
        let mut port = Port::new(1, PortConfig::default(), 4);
        let mut platform = RecordingPlatform::default();
        let indication = port.advance(0, GidEvent::Join);
        assert_eq!(indication, None);
        assert!(port.flags.contains(PortFlags::SCHEDULE_TX_NOW));
        port.do_actions(&mut platform);
        assert!(platform.scheduled_now.contains(&(1, TimerKind::Join)));
    }

    #[test]
    fn untx_restores_pre_advance_state() {
        let mut port = Port::new(1, PortConfig::default(), 2);
        let mut platform = RecordingPlatform::default();
        port.advance(0, GidEvent::Join);
        port.do_actions(&mut platform);
        let before = port.machines[0];
        let event = port.next_tx();
        assert!(event.is_some());
        let after_tx = port.machines[0];
        assert_ne!(before, after_tx, "tx() should have advanced the applicant");
        port.untx();
        assert_eq!(port.machines[0], before);
    }

    #[test]
    fn leaveall_countdown_never_negative_and_stays_at_zero_until_drained() {
        let mut port = Port::new(1, PortConfig::default(), 1);
        let mut platform = RecordingPlatform::default();
        for _ in 0..3 {
            port.leaveall_timer_expired(&mut platform);
        }
        assert_eq!(port.leaveall_countdown(), 1);
        port.leaveall_timer_expired(&mut platform);
        assert_eq!(port.leaveall_countdown(), 0);
        // Only next_tx (drained by the caller) or a received LeaveAll
        // restores the countdown to 4; a local timer fire while it is
        // already 0 runs the local LeaveAll again and leaves it at 0.
        port.leaveall_timer_expired(&mut platform);
        assert_eq!(port.leaveall_countdown(), 0);
        assert_eq!(port.next_tx(), Some(TxEvent::LeaveAll));
        assert_eq!(port.leaveall_countdown(), 4);
    }
}

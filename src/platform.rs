//! Host-supplied services: timer scheduling and the fatal-error sink.
//!
//! The reference's `sys.h` groups five categories of system-supplied
//! primitive (SYS, SYSMEM, SYSPDU, SYSTIME, SYSERR) behind bare `extern`
//! function declarations, and its `garp.h` bundles eight further
//! application callbacks into one function-pointer struct installed
//! before port creation. Neither survives translation as stored callback
//! state: SYSMEM needs no trait at all (ordinary `alloc` is already the
//! portable abstraction in a `no_std` + `alloc` crate); SYSPDU becomes the
//! [`crate::pdu`] traits, borrowed only for the duration of one
//! receive/transmit call rather than held; the eight `Garp` callbacks
//! become, respectively, values GID/GIP return to their caller
//! ([`crate::event::Indication`] and the propagation list GIP produces)
//! for `join_indication`/`leave_indication`/`join_propagated`/
//! `leave_propagated`, and ordinary method calls the host makes
//! (`create_port`/`destroy_port` already tell the host when a port came
//! and went; there is nothing left for `added_port`/`removed_port` to do
//! that the call site doesn't already know) — which leaves exactly
//! SYSTIME and SYSERR needing a trait, below.
//!
//! Keeping the timer scheduler as a borrowed `&mut dyn Platform` parameter
//! on the handful of engine methods that need it (rather than storing a
//! `Box<dyn Platform>` inside the engine) sidesteps the reentrancy problem
//! entirely: nothing the engine calls can call back into the engine,
//! because the engine is never reachable through the reference it hands
//! out.

use crate::event::PortId;

/// Which of a port's four timer categories is being armed. Mirrors
/// `Gid_event`'s `Gid_null`/`Gid_join`/`Gid_leave` timer tags plus the
/// hold and leaveall timers that the reference keys by context instead of
/// by an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Join,
    Leave,
    Hold,
    LeaveAll,
}

/// SYSTIME (scheduling) and SYSERR (fatal sink), the two categories of
/// `sys.h` primitive with no in-process equivalent.
pub trait Platform {
    /// Arm `kind` for `port` to fire after exactly `millis` milliseconds.
    fn start_timer(&mut self, port: PortId, kind: TimerKind, millis: u32);

    /// Arm `kind` for `port` to fire after a uniformly random delay in
    /// `[0, millis)`. Used only for the join timer, to de-synchronize PDU
    /// transmission across ports reacting to the same event.
    fn start_random_timer(&mut self, port: PortId, kind: TimerKind, millis: u32);

    /// Schedule `kind` for `port` to fire on the platform's next dispatch
    /// turn, ahead of any already-armed delay.
    fn schedule_now(&mut self, port: PortId, kind: TimerKind);

    /// Unrecoverable termination; the default forwards to `panic!`. A host
    /// embedding this crate in a context where unwinding or a controlled
    /// reset is preferable may override it, provided it still diverges.
    fn fatal(&mut self, message: &str) -> ! {
        panic!("{}", message)
    }
}

/// Per-port timer defaults and behavioral flags, overridable at
/// `create_port` time. The reference hard-codes these as `Gid_default_*`
/// enum constants; this crate keeps those values as [`PortConfig::default`]
/// but lets a host retune them without recompiling, since join/leave/hold
/// timing is routinely adjusted to a link's real round-trip characteristics
/// (and boundary scenario 4 requires overriding `leaveall_timeout_n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    pub join_timeout_ms: u32,
    pub leave_timeout_4_ms: u32,
    pub hold_timeout_ms: u32,
    pub leaveall_timeout_n_ms: u32,
    pub is_point_to_point: bool,
}

impl Default for PortConfig {
    fn default() -> Self {
        PortConfig {
            join_timeout_ms: 200,
            leave_timeout_4_ms: 600 / 4,
            hold_timeout_ms: 100,
            leaveall_timeout_n_ms: 10_000 / 4,
            is_point_to_point: true,
        }
    }
}

/// A [`Platform`] that records every call instead of acting on it, for
/// assertions in unit and integration tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    pub started: alloc::vec::Vec<(PortId, TimerKind, u32)>,
    pub started_random: alloc::vec::Vec<(PortId, TimerKind, u32)>,
    pub scheduled_now: alloc::vec::Vec<(PortId, TimerKind)>,
}

#[cfg(test)]
impl Platform for RecordingPlatform {
    fn start_timer(&mut self, port: PortId, kind: TimerKind, millis: u32) {
        self.started.push((port, kind, millis));
    }

    fn start_random_timer(&mut self, port: PortId, kind: TimerKind, millis: u32) {
        self.started_random.push((port, kind, millis));
    }

    fn schedule_now(&mut self, port: PortId, kind: TimerKind) {
        self.scheduled_now.push((port, kind));
    }
}

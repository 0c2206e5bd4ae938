//! GID transition tables (GIDTT): the pure, stateless layer that advances
//! one Applicant/Registrar pair. No port, no ring, no timers — just table
//! lookups and the machine they act on. [`crate::gid`] is the caller that
//! turns the outcomes below into scratchpad flags and calls into
//! [`crate::gip`].

pub mod states;
pub mod tables;

pub use states::{
    ApplicantMajor, ApplicantMgt, ApplicantState, GidMachine, MachineStates, RegistrarMajor,
    RegistrarMgt, RegistrarState,
};
pub use tables::{applicant_tx_transition, ApplicantTxChoice};

use crate::event::{GidEvent, Indication};

/// What one call to [`advance`] asks the caller (GID core) to do with the
/// owning port's scratchpad, beyond writing the new machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdvanceOutcome {
    /// Join/leave indication the layer above (GIP, or the application
    /// directly) must observe, if any.
    pub indication: Option<Indication>,
    /// OR this into the port's `cstart_join_timer` scratchpad flag.
    pub start_join_timer: bool,
    /// OR this into the port's `cstart_leave_timer` scratchpad flag.
    pub start_leave_timer: bool,
    /// OR this into the port's `cschedule_tx_now` scratchpad flag. Only
    /// ever set when the triggering event was a local `Join` request that
    /// also asked for a join timer — promoting it to an immediate
    /// transmit rather than waiting for the randomized join timer.
    pub schedule_tx_now: bool,
}

/// `gidtt_event`: advance one machine by `event`, writing the new
/// applicant/registrar states in place and returning the scratchpad
/// deltas and upward indication the caller must act on.
pub fn advance(machine: &mut GidMachine, event: GidEvent) -> AdvanceOutcome {
    let a = tables::applicant_transition(machine.applicant, event);
    let r = tables::registrar_transition(machine.registrar, event);

    machine.applicant = a.state;
    machine.registrar = r.state;

    AdvanceOutcome {
        indication: r.indication,
        start_join_timer: a.start_join_timer,
        start_leave_timer: r.start_leave_timer,
        schedule_tx_now: a.start_join_timer && matches!(event, GidEvent::Join),
    }
}

/// Outcome of one step of the leave-timer countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaveTimerOutcome {
    pub indication: Option<Indication>,
    pub start_leave_timer: bool,
}

/// `gidtt_leave_timer_expiry`: one step of the registrar's four-step leave
/// countdown.
pub fn leave_timer_tick(machine: &mut GidMachine) -> LeaveTimerOutcome {
    let t = tables::leave_timer_transition(machine.registrar);
    machine.registrar = t.state;
    LeaveTimerOutcome {
        indication: t.indication,
        start_leave_timer: t.start_leave_timer,
    }
}

/// `gidtt_tx`: advance the applicant via the transmit table, decorated
/// with the registrar's "in" status.
pub fn tx(machine: &mut GidMachine) -> Option<crate::event::TxMessage> {
    tables::tx(machine)
}

/// `gidtt_in`: true iff the registrar reports the attribute registered on
/// this port (`In`, under any management variant except Forbidden, or any
/// state under Fixed).
pub fn in_(machine: &GidMachine) -> bool {
    machine.registrar.registered_here()
}

/// `gidtt_machine_active`: false iff the machine sits in its quiescent
/// pair (very-anxious-observer applicant, empty-normal registrar).
pub fn machine_active(machine: &GidMachine) -> bool {
    machine.active()
}

/// `gidtt_states`: the human-readable decomposition used for management
/// reporting.
pub fn states(machine: &GidMachine) -> MachineStates {
    machine.states()
}

//! The four pure transition tables. These are the specification: every
//! (state, event) cell below is transcribed directly from the reference
//! implementation's `applicant_tt`, `registrar_tt`, `applicant_txtt` and
//! `registrar_leave_timer_table`, and is exercised exhaustively by the
//! `#[cfg(test)]` module at the bottom of this file.
//!
//! The reference keys `registrar_tt` by the full `Gid_event` enum but its
//! rows for `Gid_rcv_leaveempty` and `Gid_rcv_leavein` are identical (the
//! Registrar does not distinguish which flavor of "leave" arrived), as are
//! its rows for `Gid_rcv_joinempty` and `Gid_rcv_joinin`; this is
//! represented here with a single match arm per pair rather than two
//! identical rows. Local `Join`/`Leave` requests are not tabulated at all
//! in the reference's `registrar_tt` — only the Applicant reacts to a
//! local request — so both are identity transitions for the Registrar,
//! which is what the rest of the protocol (the Registrar only reflects
//! what has been *received* or set by management) requires.

use super::states::{ApplicantState, GidMachine, RegistrarState};
use crate::event::{GidEvent, Indication, TxMessage};

/// Applicant transition: the new state, and whether this transition should
/// accumulate a request to (re)start the join timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicantTransition {
    pub state: ApplicantState,
    pub start_join_timer: bool,
}

/// Registrar transition: the new state, the indication (if any) to report
/// upward, and whether this transition should accumulate a request to
/// (re)start the leave timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrarTransition {
    pub state: RegistrarState,
    pub indication: Option<Indication>,
    pub start_leave_timer: bool,
}

/// What the applicant transmit table produced for one machine, before
/// `gidtt_tx` decorates `Join`/`Leave` into their `*In`/`*Empty` wire
/// variants based on the registrar's current "in" status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicantTxChoice {
    None,
    Join,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicantTxTransition {
    pub state: ApplicantState,
    pub choice: ApplicantTxChoice,
    pub start_join_timer: bool,
}

/// Registrar leave-timer countdown transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveTimerTransition {
    pub state: RegistrarState,
    pub indication: Option<Indication>,
    pub start_leave_timer: bool,
}

/// `applicant_tt`: `(event, applicant_state) -> (new_state, cstart_join_timer)`.
pub fn applicant_transition(state: ApplicantState, event: GidEvent) -> ApplicantTransition {
    use ApplicantState::*;
    use GidEvent::*;

    let (new_state, start_join_timer) = match event {
        Null | NormalRegistration | FixRegistration | ForbidRegistration => (state, false),

        RcvLeaveEmpty => match state {
            VeryAnxiousActive => (VeryAnxiousPassive, false),
            AnxiousActive => (VeryAnxiousPassive, false),
            QuietActive => (VeryAnxiousPassive, true),
            LeavingActive => (VeryAnxiousObserver, false),
            VeryAnxiousPassive => (VeryAnxiousPassive, false),
            AnxiousPassive => (VeryAnxiousPassive, false),
            QuietPassive => (VeryAnxiousPassive, true),
            VeryAnxiousObserver => (LeavingObserver, false),
            AnxiousObserver => (LeavingObserver, false),
            QuietObserver => (LeavingObserver, true),
            LeavingObserver => (VeryAnxiousObserver, false),
            VeryAnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            AnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            QuietNonParticipant => (VeryAnxiousNonParticipant, false),
        },

        RcvLeaveIn => match state {
            VeryAnxiousActive => (VeryAnxiousActive, false),
            AnxiousActive => (VeryAnxiousActive, false),
            QuietActive => (VeryAnxiousPassive, true),
            LeavingActive => (LeavingActive, false),
            VeryAnxiousPassive => (VeryAnxiousPassive, false),
            AnxiousPassive => (VeryAnxiousPassive, false),
            QuietPassive => (VeryAnxiousPassive, true),
            VeryAnxiousObserver => (LeavingObserver, false),
            AnxiousObserver => (LeavingObserver, false),
            QuietObserver => (LeavingObserver, true),
            LeavingObserver => (VeryAnxiousObserver, false),
            VeryAnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            AnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            QuietNonParticipant => (VeryAnxiousNonParticipant, false),
        },

        RcvEmpty => match state {
            VeryAnxiousActive => (VeryAnxiousActive, false),
            AnxiousActive => (VeryAnxiousActive, false),
            QuietActive => (VeryAnxiousActive, true),
            LeavingActive => (LeavingActive, false),
            VeryAnxiousPassive => (VeryAnxiousPassive, false),
            AnxiousPassive => (VeryAnxiousPassive, false),
            QuietPassive => (VeryAnxiousPassive, true),
            VeryAnxiousObserver => (VeryAnxiousObserver, false),
            AnxiousObserver => (VeryAnxiousObserver, false),
            QuietObserver => (VeryAnxiousObserver, false),
            LeavingObserver => (VeryAnxiousObserver, false),
            VeryAnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            AnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            QuietNonParticipant => (VeryAnxiousNonParticipant, false),
        },

        RcvJoinEmpty => match state {
            VeryAnxiousActive => (VeryAnxiousActive, false),
            AnxiousActive => (VeryAnxiousActive, false),
            QuietActive => (VeryAnxiousActive, true),
            LeavingActive => (VeryAnxiousObserver, false),
            VeryAnxiousPassive => (VeryAnxiousPassive, false),
            AnxiousPassive => (VeryAnxiousPassive, false),
            QuietPassive => (VeryAnxiousPassive, true),
            VeryAnxiousObserver => (VeryAnxiousObserver, false),
            AnxiousObserver => (VeryAnxiousObserver, false),
            QuietObserver => (VeryAnxiousObserver, true),
            LeavingObserver => (VeryAnxiousObserver, false),
            VeryAnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            AnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            QuietNonParticipant => (VeryAnxiousNonParticipant, true),
        },

        RcvJoinIn => match state {
            VeryAnxiousActive => (AnxiousActive, false),
            AnxiousActive => (QuietActive, false),
            QuietActive => (QuietActive, false),
            LeavingActive => (LeavingActive, false),
            VeryAnxiousPassive => (AnxiousPassive, false),
            AnxiousPassive => (QuietPassive, false),
            QuietPassive => (QuietPassive, false),
            VeryAnxiousObserver => (AnxiousObserver, false),
            AnxiousObserver => (QuietObserver, false),
            QuietObserver => (QuietObserver, false),
            LeavingObserver => (AnxiousObserver, false),
            VeryAnxiousNonParticipant => (AnxiousNonParticipant, false),
            AnxiousNonParticipant => (QuietNonParticipant, false),
            QuietNonParticipant => (QuietNonParticipant, false),
        },

        Join => match state {
            VeryAnxiousActive => (VeryAnxiousActive, false),
            AnxiousActive => (AnxiousActive, false),
            QuietActive => (QuietActive, false),
            LeavingActive => (VeryAnxiousActive, false),
            VeryAnxiousPassive => (VeryAnxiousPassive, false),
            AnxiousPassive => (AnxiousPassive, false),
            QuietPassive => (QuietPassive, false),
            VeryAnxiousObserver => (VeryAnxiousPassive, true),
            AnxiousObserver => (AnxiousPassive, true),
            QuietObserver => (QuietPassive, false),
            LeavingObserver => (VeryAnxiousPassive, false),
            VeryAnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            AnxiousNonParticipant => (AnxiousNonParticipant, false),
            QuietNonParticipant => (QuietNonParticipant, false),
        },

        Leave => match state {
            VeryAnxiousActive => (LeavingActive, false),
            AnxiousActive => (LeavingActive, false),
            QuietActive => (LeavingActive, true),
            LeavingActive => (LeavingActive, false),
            VeryAnxiousPassive => (VeryAnxiousObserver, false),
            AnxiousPassive => (AnxiousObserver, false),
            QuietPassive => (QuietObserver, false),
            VeryAnxiousObserver => (VeryAnxiousObserver, false),
            AnxiousObserver => (AnxiousObserver, false),
            QuietObserver => (QuietObserver, false),
            LeavingObserver => (LeavingObserver, false),
            VeryAnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            AnxiousNonParticipant => (AnxiousNonParticipant, false),
            QuietNonParticipant => (QuietNonParticipant, false),
        },

        NormalOperation => match state {
            VeryAnxiousActive => (VeryAnxiousPassive, false),
            AnxiousActive => (VeryAnxiousPassive, false),
            QuietActive => (VeryAnxiousPassive, true),
            LeavingActive => (LeavingActive, false),
            VeryAnxiousPassive => (VeryAnxiousPassive, false),
            AnxiousPassive => (VeryAnxiousPassive, false),
            QuietPassive => (VeryAnxiousPassive, true),
            VeryAnxiousObserver => (VeryAnxiousActive, false),
            AnxiousObserver => (VeryAnxiousActive, false),
            QuietObserver => (VeryAnxiousActive, true),
            LeavingObserver => (LeavingObserver, false),
            VeryAnxiousNonParticipant => (VeryAnxiousActive, false),
            AnxiousNonParticipant => (VeryAnxiousActive, false),
            QuietNonParticipant => (VeryAnxiousActive, true),
        },

        NoProtocol => match state {
            VeryAnxiousActive => (VeryAnxiousNonParticipant, false),
            AnxiousActive => (AnxiousNonParticipant, false),
            QuietActive => (QuietNonParticipant, false),
            LeavingActive => (VeryAnxiousNonParticipant, false),
            VeryAnxiousPassive => (VeryAnxiousNonParticipant, false),
            AnxiousPassive => (AnxiousNonParticipant, false),
            QuietPassive => (QuietNonParticipant, false),
            VeryAnxiousObserver => (VeryAnxiousNonParticipant, false),
            AnxiousObserver => (AnxiousNonParticipant, false),
            QuietObserver => (QuietNonParticipant, false),
            LeavingObserver => (VeryAnxiousNonParticipant, false),
            VeryAnxiousNonParticipant => (VeryAnxiousNonParticipant, false),
            AnxiousNonParticipant => (AnxiousNonParticipant, false),
            QuietNonParticipant => (QuietNonParticipant, false),
        },

        // LeaveAll and transmit-table events never reach the main tables;
        // `gid::Engine::rcv_leaveall` re-dispatches as `RcvLeaveEmpty` per
        // machine instead, and `TxLeaveAll`/`Tx*` are produced by
        // `applicant_tx_transition`, never consumed by it.
        RcvLeaveAll | RcvLeaveAllRange | TxLeaveEmpty | TxLeaveIn | TxEmpty | TxJoinEmpty
        | TxJoinIn | TxLeaveAll | TxLeaveAllRange => (state, false),
    };

    ApplicantTransition {
        state: new_state,
        start_join_timer,
    }
}

/// `registrar_tt`: `(event, registrar_state) -> (new_state, indication, cstart_leave_timer)`.
pub fn registrar_transition(state: RegistrarState, event: GidEvent) -> RegistrarTransition {
    use GidEvent::*;
    use RegistrarState::*;

    let (new_state, indication, start_leave_timer) = match event {
        Null | RcvEmpty | Join | Leave | NormalOperation | NoProtocol => (state, None, false),

        RcvLeaveEmpty | RcvLeaveIn => match state {
            InNormal => (LeaveNormal, None, true),
            LeaveNormal | Leave3Normal | Leave2Normal | Leave1Normal | EmptyNormal => {
                (state, None, false)
            }
            InFixed => (LeaveFixed, None, true),
            LeaveFixed | Leave3Fixed | Leave2Fixed | Leave1Fixed | EmptyFixed => {
                (state, None, false)
            }
            InForbidden => (LeaveForbidden, None, true),
            LeaveForbidden | Leave3Forbidden | Leave2Forbidden | Leave1Forbidden
            | EmptyForbidden => (state, None, false),
        },

        RcvJoinEmpty | RcvJoinIn => match state {
            InNormal | LeaveNormal | Leave3Normal | Leave2Normal | Leave1Normal => {
                (InNormal, None, false)
            }
            EmptyNormal => (InNormal, Some(Indication::Join), false),
            InFixed | LeaveFixed | Leave3Fixed | Leave2Fixed | Leave1Fixed | EmptyFixed => {
                (InFixed, None, false)
            }
            InForbidden | LeaveForbidden | Leave3Forbidden | Leave2Forbidden
            | Leave1Forbidden | EmptyForbidden => (InForbidden, None, false),
        },

        NormalRegistration => match state {
            InNormal => (InNormal, None, false),
            LeaveNormal => (LeaveNormal, None, false),
            Leave3Normal => (Leave3Normal, None, false),
            Leave2Normal => (Leave2Normal, None, false),
            Leave1Normal => (Leave1Normal, None, false),
            EmptyNormal => (EmptyNormal, None, false),
            InFixed => (InNormal, None, false),
            LeaveFixed => (LeaveNormal, None, false),
            Leave3Fixed => (Leave3Normal, None, false),
            Leave2Fixed => (Leave2Normal, None, false),
            Leave1Fixed => (Leave1Normal, None, false),
            EmptyFixed => (EmptyNormal, Some(Indication::Leave), false),
            InForbidden => (InNormal, Some(Indication::Join), false),
            LeaveForbidden => (LeaveNormal, Some(Indication::Join), false),
            Leave3Forbidden => (Leave3Normal, Some(Indication::Join), false),
            Leave2Forbidden => (Leave2Normal, Some(Indication::Join), false),
            Leave1Forbidden => (Leave1Normal, Some(Indication::Join), false),
            EmptyForbidden => (EmptyNormal, None, false),
        },

        FixRegistration => match state {
            InNormal => (InFixed, None, false),
            LeaveNormal => (LeaveFixed, None, false),
            Leave3Normal => (Leave3Fixed, None, false),
            Leave2Normal => (Leave2Fixed, None, false),
            Leave1Normal => (Leave1Fixed, None, false),
            EmptyNormal => (EmptyFixed, Some(Indication::Join), false),
            InFixed => (InFixed, None, false),
            LeaveFixed => (LeaveFixed, None, false),
            Leave3Fixed => (Leave3Fixed, None, false),
            Leave2Fixed => (Leave2Fixed, None, false),
            Leave1Fixed => (Leave1Fixed, None, false),
            EmptyFixed => (EmptyFixed, None, false),
            InForbidden => (InFixed, Some(Indication::Join), false),
            LeaveForbidden => (LeaveFixed, Some(Indication::Join), false),
            Leave3Forbidden => (Leave3Fixed, Some(Indication::Join), false),
            Leave2Forbidden => (Leave2Fixed, Some(Indication::Join), false),
            Leave1Forbidden => (Leave1Fixed, Some(Indication::Join), false),
            EmptyForbidden => (EmptyFixed, Some(Indication::Join), false),
        },

        ForbidRegistration => match state {
            InNormal => (InForbidden, Some(Indication::Leave), false),
            LeaveNormal => (LeaveForbidden, Some(Indication::Leave), false),
            Leave3Normal => (Leave3Forbidden, Some(Indication::Leave), false),
            Leave2Normal => (Leave2Forbidden, Some(Indication::Leave), false),
            Leave1Normal => (Leave1Forbidden, Some(Indication::Leave), false),
            EmptyNormal => (EmptyForbidden, None, false),
            InFixed => (InForbidden, Some(Indication::Leave), false),
            LeaveFixed => (LeaveForbidden, Some(Indication::Leave), false),
            Leave3Fixed => (Leave3Forbidden, Some(Indication::Leave), false),
            Leave2Fixed => (Leave2Forbidden, Some(Indication::Leave), false),
            Leave1Fixed => (Leave1Forbidden, Some(Indication::Leave), false),
            EmptyFixed => (EmptyForbidden, Some(Indication::Leave), false),
            InForbidden => (InForbidden, None, false),
            LeaveForbidden => (LeaveForbidden, None, false),
            Leave3Forbidden => (Leave3Forbidden, None, false),
            Leave2Forbidden => (Leave2Forbidden, None, false),
            Leave1Forbidden => (Leave1Forbidden, None, false),
            EmptyForbidden => (EmptyForbidden, None, false),
        },

        RcvLeaveAll | RcvLeaveAllRange | TxLeaveEmpty | TxLeaveIn | TxEmpty | TxJoinEmpty
        | TxJoinIn | TxLeaveAll | TxLeaveAllRange => (state, None, false),
    };

    RegistrarTransition {
        state: new_state,
        indication,
        start_leave_timer,
    }
}

/// `applicant_txtt`: `applicant_state -> (new_state, message, cstart_join_timer)`.
pub fn applicant_tx_transition(state: ApplicantState) -> ApplicantTxTransition {
    use ApplicantState::*;
    use ApplicantTxChoice::*;

    let (new_state, choice, start_join_timer) = match state {
        VeryAnxiousActive => (AnxiousActive, Join, true),
        AnxiousActive => (QuietActive, Join, false),
        QuietActive => (QuietActive, None, false),
        LeavingActive => (VeryAnxiousObserver, Leave, false),
        VeryAnxiousPassive => (AnxiousActive, Join, true),
        AnxiousPassive => (QuietActive, Join, false),
        QuietPassive => (QuietPassive, None, false),
        VeryAnxiousObserver => (VeryAnxiousObserver, None, false),
        AnxiousObserver => (AnxiousObserver, None, false),
        QuietObserver => (QuietObserver, None, false),
        LeavingObserver => (VeryAnxiousObserver, None, false),
        VeryAnxiousNonParticipant => (VeryAnxiousNonParticipant, None, false),
        AnxiousNonParticipant => (AnxiousNonParticipant, None, false),
        QuietNonParticipant => (QuietNonParticipant, None, false),
    };

    ApplicantTxTransition {
        state: new_state,
        choice,
        start_join_timer,
    }
}

/// `registrar_leave_timer_table`: one step of the four-step leave
/// countdown. `In*` states never count down (the leave timer only runs
/// while a registrar has left the `In` major state); completion at `L1*`
/// only produces a leave indication and re-enters the countdown under
/// Normal management — under Fixed/Forbidden the state is cosmetic and the
/// indication was already delivered by the management directive itself.
pub fn leave_timer_transition(state: RegistrarState) -> LeaveTimerTransition {
    use RegistrarState::*;

    let (new_state, indication, start_leave_timer) = match state {
        InNormal => (InNormal, None, false),
        LeaveNormal => (Leave3Normal, None, true),
        Leave3Normal => (Leave2Normal, None, true),
        Leave2Normal => (Leave1Normal, None, true),
        Leave1Normal => (EmptyNormal, Some(Indication::Leave), false),
        EmptyNormal => (EmptyNormal, None, false),

        InFixed => (InFixed, None, false),
        LeaveFixed => (Leave3Fixed, None, true),
        Leave3Fixed => (Leave2Fixed, None, true),
        Leave2Fixed => (Leave1Fixed, None, true),
        Leave1Fixed => (EmptyFixed, None, false),
        EmptyFixed => (EmptyFixed, None, false),

        InForbidden => (InForbidden, None, false),
        LeaveForbidden => (Leave3Forbidden, None, true),
        Leave3Forbidden => (Leave2Forbidden, None, true),
        Leave2Forbidden => (Leave1Forbidden, None, true),
        Leave1Forbidden => (EmptyForbidden, None, false),
        EmptyForbidden => (EmptyForbidden, None, false),
    };

    LeaveTimerTransition {
        state: new_state,
        indication,
        start_leave_timer,
    }
}

/// `gidtt_tx`: advances the applicant via the transmit table and decorates
/// the result with the registrar's current "in" status to pick between the
/// `*In`/`*Empty` wire variants.
pub fn tx(machine: &mut GidMachine) -> Option<TxMessage> {
    let transition = applicant_tx_transition(machine.applicant);
    machine.applicant = transition.state;

    match transition.choice {
        ApplicantTxChoice::None => None,
        ApplicantTxChoice::Join => Some(if machine.registrar.registered_here() {
            TxMessage::JoinIn
        } else {
            TxMessage::JoinEmpty
        }),
        ApplicantTxChoice::Leave => Some(if machine.registrar.registered_here() {
            TxMessage::LeaveIn
        } else {
            TxMessage::LeaveEmpty
        }),
    }
}

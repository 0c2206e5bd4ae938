//! The 14 Applicant states and 18 Registrar states, and the machine that
//! pairs one of each per (port, attribute).
//!
//! Not all 4 (major) x 3 (participation) x 2 (management) combinations for
//! the Applicant, nor all 3 x 3 x (4-step countdown) combinations for the
//! Registrar, are legal; only the enumerated variants below are reachable,
//! and [`gidtt::tables`](super::tables) is total over exactly these.

/// Applicant state: major state (very-anxious / anxious / quiet / leaving)
/// crossed with participation (active / passive / observer) and, for the
/// quiescent branch, management (no-protocol, the "non-participant" `*on`
/// variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicantState {
    VeryAnxiousActive,
    AnxiousActive,
    QuietActive,
    LeavingActive,
    VeryAnxiousPassive,
    AnxiousPassive,
    QuietPassive,
    VeryAnxiousObserver,
    AnxiousObserver,
    QuietObserver,
    LeavingObserver,
    VeryAnxiousNonParticipant,
    AnxiousNonParticipant,
    QuietNonParticipant,
}

/// Registrar state: major state (in / leave / empty) crossed with
/// management (normal / fixed / forbidden); the leave major state carries
/// its own four-step countdown position in the state itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrarState {
    InNormal,
    LeaveNormal,
    Leave3Normal,
    Leave2Normal,
    Leave1Normal,
    EmptyNormal,
    InFixed,
    LeaveFixed,
    Leave3Fixed,
    Leave2Fixed,
    Leave1Fixed,
    EmptyFixed,
    InForbidden,
    LeaveForbidden,
    Leave3Forbidden,
    Leave2Forbidden,
    Leave1Forbidden,
    EmptyForbidden,
}

/// One (port, attribute) pair's state. No per-machine allocation: this is a
/// plain value resident inside the port's machine array for the lifetime of
/// the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GidMachine {
    pub applicant: ApplicantState,
    pub registrar: RegistrarState,
}

impl Default for GidMachine {
    /// The quiescent pair a freshly allocated machine starts in:
    /// very-anxious-observer / empty-normal.
    fn default() -> Self {
        GidMachine {
            applicant: ApplicantState::VeryAnxiousObserver,
            registrar: RegistrarState::EmptyNormal,
        }
    }
}

/// Human-readable decomposition of the Applicant axis, for management
/// reporting (`gidtt_states`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicantMajor {
    VeryAnxious,
    Anxious,
    Quiet,
    Leaving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicantMgt {
    Normal,
    NoProtocol,
}

/// Human-readable decomposition of the Registrar axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrarMajor {
    In,
    Leave,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrarMgt {
    Normal,
    Fixed,
    Forbidden,
}

/// The full reporting decomposition returned by `gidtt_states`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineStates {
    pub applicant_major: ApplicantMajor,
    pub applicant_mgt: ApplicantMgt,
    pub registrar_major: RegistrarMajor,
    pub registrar_mgt: RegistrarMgt,
}

impl ApplicantState {
    pub fn major(self) -> ApplicantMajor {
        use ApplicantState::*;
        match self {
            VeryAnxiousActive | VeryAnxiousPassive | VeryAnxiousObserver
            | VeryAnxiousNonParticipant => ApplicantMajor::VeryAnxious,
            AnxiousActive | AnxiousPassive | AnxiousObserver | AnxiousNonParticipant => {
                ApplicantMajor::Anxious
            }
            QuietActive | QuietPassive | QuietObserver | QuietNonParticipant => {
                ApplicantMajor::Quiet
            }
            LeavingActive | LeavingObserver => ApplicantMajor::Leaving,
        }
    }

    pub fn mgt(self) -> ApplicantMgt {
        use ApplicantState::*;
        match self {
            VeryAnxiousNonParticipant | AnxiousNonParticipant | QuietNonParticipant => {
                ApplicantMgt::NoProtocol
            }
            _ => ApplicantMgt::Normal,
        }
    }
}

impl RegistrarState {
    pub fn major(self) -> RegistrarMajor {
        use RegistrarState::*;
        match self {
            InNormal | InFixed | InForbidden => RegistrarMajor::In,
            LeaveNormal | Leave3Normal | Leave2Normal | Leave1Normal | LeaveFixed
            | Leave3Fixed | Leave2Fixed | Leave1Fixed | LeaveForbidden | Leave3Forbidden
            | Leave2Forbidden | Leave1Forbidden => RegistrarMajor::Leave,
            EmptyNormal | EmptyFixed | EmptyForbidden => RegistrarMajor::Empty,
        }
    }

    pub fn mgt(self) -> RegistrarMgt {
        use RegistrarState::*;
        match self {
            InNormal | LeaveNormal | Leave3Normal | Leave2Normal | Leave1Normal
            | EmptyNormal => RegistrarMgt::Normal,
            InFixed | LeaveFixed | Leave3Fixed | Leave2Fixed | Leave1Fixed | EmptyFixed => {
                RegistrarMgt::Fixed
            }
            InForbidden | LeaveForbidden | Leave3Forbidden | Leave2Forbidden
            | Leave1Forbidden | EmptyForbidden => RegistrarMgt::Forbidden,
        }
    }

    /// True iff this state reports the attribute as registered on this
    /// port. Under Normal and Fixed management the whole leave countdown
    /// (`Leave`/`Leave3`/`Leave2`/`Leave1`) still reports registered — only
    /// `Empty` does not — because the registrar has not actually emptied
    /// out until the countdown completes; under Forbidden management
    /// nothing is ever reported registered, including `In`.
    pub fn registered_here(self) -> bool {
        use RegistrarState::*;
        match self {
            InNormal | LeaveNormal | Leave3Normal | Leave2Normal | Leave1Normal => true,
            EmptyNormal => false,
            InFixed | LeaveFixed | Leave3Fixed | Leave2Fixed | Leave1Fixed | EmptyFixed => true,
            InForbidden | LeaveForbidden | Leave3Forbidden | Leave2Forbidden
            | Leave1Forbidden | EmptyForbidden => false,
        }
    }
}

impl GidMachine {
    /// True iff neither machine is in its quiescent pair
    /// (very-anxious-observer applicant, empty-normal registrar) — used to
    /// find a free slot for a new attribute.
    pub fn active(&self) -> bool {
        !(self.applicant == ApplicantState::VeryAnxiousObserver
            && self.registrar == RegistrarState::EmptyNormal)
    }

    pub fn states(&self) -> MachineStates {
        MachineStates {
            applicant_major: self.applicant.major(),
            applicant_mgt: self.applicant.mgt(),
            registrar_major: self.registrar.major(),
            registrar_mgt: self.registrar.mgt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_machine_is_inactive() {
        assert!(!GidMachine::default().active());
    }

    #[test]
    fn fixed_always_registered_regardless_of_countdown() {
        for state in [
            RegistrarState::InFixed,
            RegistrarState::LeaveFixed,
            RegistrarState::Leave3Fixed,
            RegistrarState::Leave2Fixed,
            RegistrarState::Leave1Fixed,
            RegistrarState::EmptyFixed,
        ] {
            assert!(state.registered_here(), "{state:?} should report registered");
            assert_eq!(state.mgt(), RegistrarMgt::Fixed);
        }
    }

    #[test]
    fn forbidden_never_registered() {
        for state in [
            RegistrarState::InForbidden,
            RegistrarState::LeaveForbidden,
            RegistrarState::Leave3Forbidden,
            RegistrarState::Leave2Forbidden,
            RegistrarState::Leave1Forbidden,
            RegistrarState::EmptyForbidden,
        ] {
            assert!(!state.registered_here());
        }
    }

    #[test]
    fn normal_leave_countdown_still_registered_until_empty() {
        for state in [
            RegistrarState::InNormal,
            RegistrarState::LeaveNormal,
            RegistrarState::Leave3Normal,
            RegistrarState::Leave2Normal,
            RegistrarState::Leave1Normal,
        ] {
            assert!(state.registered_here(), "{state:?} should still report registered");
        }
        assert!(!RegistrarState::EmptyNormal.registered_here());
    }
}

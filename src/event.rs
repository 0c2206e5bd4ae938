//! Event and indication vocabulary shared by the transition tables, the GID
//! core, and GMR's receive/transmit drivers.
//!
//! The reference implementation overloads a single 22-value `Gid_event` enum
//! for received messages, local requests, management directives, LeaveAll,
//! and outbound messages all at once. This crate keeps the full vocabulary
//! (`GidEvent`) where the reference's own dispatch tables key on it, but
//! narrows the *return* types of `advance`/`tx`/`leave_timer_tick` to the
//! small subset each can actually produce ([`Indication`], [`TxMessage`]),
//! which the type checker then enforces at every call site instead of
//! leaving it as a comment on the C prototype.

/// An identifier for a port within one application instance. The reference
/// leaves this as a bare `int` chosen by the system; this crate treats it
/// as an opaque key supplied by the host at `create_port` time.
pub type PortId = i32;

/// A dense index into one application's attribute table, in
/// `[0, max_gid_index]`.
pub type AttrIndex = usize;

/// The full event vocabulary accepted by [`crate::gidtt::advance`] and used
/// by GID's receive/management entry points to describe what happened.
/// LeaveAll and LeaveAll-range are routed around the tables entirely (see
/// `gid::Engine::rcv_leaveall`) but are kept here because GMR's receive
/// loop dispatches on the same wire-level vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GidEvent {
    Null,
    RcvLeaveEmpty,
    RcvLeaveIn,
    RcvEmpty,
    RcvJoinEmpty,
    RcvJoinIn,
    Join,
    Leave,
    NormalOperation,
    NoProtocol,
    NormalRegistration,
    FixRegistration,
    ForbidRegistration,
    RcvLeaveAll,
    RcvLeaveAllRange,
    TxLeaveEmpty,
    TxLeaveIn,
    TxEmpty,
    TxJoinEmpty,
    TxJoinIn,
    TxLeaveAll,
    TxLeaveAllRange,
}

/// The outcome GID reports to the layer above it (GIP, or directly to the
/// application) after a state-machine advance: either nothing changed from
/// the outside world's point of view, or the attribute's effective
/// registration on this port just flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indication {
    Join,
    Leave,
}

/// What the applicant transmit table decided to emit for one machine,
/// before GID decorates it with "In" vs "Empty" framing (see
/// `gidtt::applicant_tx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMessage {
    LeaveEmpty,
    LeaveIn,
    Empty,
    JoinEmpty,
    JoinIn,
}

/// One item pulled off a port's transmit cursor: either the port-wide
/// LeaveAll marker or a per-attribute message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEvent {
    LeaveAll,
    Attribute(AttrIndex, TxMessage),
}

/// Attribute-type codes visible to a PDU formatter, distinguishing how an
/// attribute's index should be rendered on the wire (a bare legacy-control
/// index, a multicast MAC looked up from the GMD table, or the LeaveAll
/// marker that carries no index at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Legacy,
    Multicast,
    All,
}

//! GARP (IEEE 802.1 Generic Attribute Registration Protocol) control
//! plane, plus GMR (GARP Multicast Registration) built on top of it.
//!
//! This crate implements the two layers a host wires together per port:
//!
//! - [`gidtt`] — the pure Applicant/Registrar transition tables (no
//!   state of their own).
//! - [`gid`] — [`gid::Engine`], the per-application arena of ports and
//!   their attribute machines: received messages, local join/leave
//!   requests, management directives, and timer expiries.
//! - [`gip`] — a second `impl` block on [`gid::Engine`] for propagating
//!   registrations across the connected ring by dead-reckoning
//!   membership counts rather than flooding every port on every change.
//! - [`gmr`] — [`gmr::Gmr`], the multicast-registration application:
//!   two legacy controls plus a bounded multicast address table, driving
//!   a host's filtering database through the three-mode policy.
//!
//! Everything a host must supply lives behind three traits —
//! [`platform::Platform`] (timer scheduling and fatal errors),
//! [`pdu::PduReader`]/[`pdu::PduWriter`] (wire-format record access), and
//! [`gmr::FilteringDatabase`] (forwarding policy) — each borrowed only
//! for the duration of one call rather than stored, so nothing in this
//! crate ever calls back into itself.

#![no_std]

extern crate alloc;

pub mod error;
pub mod event;
pub mod gid;
pub mod gidtt;
pub mod gip;
pub mod gmr;
pub mod pdu;
pub mod platform;

pub use error::{Error, Result};
pub use event::{AttrIndex, AttributeType, GidEvent, Indication, PortId, TxEvent, TxMessage};
pub use gid::Engine;
pub use gip::Propagation;
pub use gmr::{FilteringDatabase, Gmr, Mac, Mode, MulticastTable};
pub use pdu::{PduReader, PduRecord, PduWriter};
pub use platform::{Platform, PortConfig, TimerKind};

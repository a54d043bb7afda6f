//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the rules of the controller: bring-up ordering,
//! connectivity gating, inbound dispatch, adoption info, and the outcome
//! taxonomy. All interaction with hardware happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod adoption;
pub mod controller;
pub mod dispatch;
pub mod events;
pub mod identity;
pub mod lifecycle;
pub mod ports;
pub mod publish;

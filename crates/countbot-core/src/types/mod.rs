//! Domain types shared across CountBot crates.

pub mod counter;
pub mod group;
pub mod message;

pub use counter::{CounterKind, DailyCounter, Day, DAY_FORMAT};
pub use group::{Group, GroupSnapshot, MembershipEvent, ParticipantAction, SelectedGroup};
pub use message::{IncomingMessage, OutgoingMessage};

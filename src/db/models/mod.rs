mod infraction;

pub use infraction::{Infraction, InfractionKind, InfractionRow, Issuer};

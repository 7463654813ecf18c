pub mod infraction;

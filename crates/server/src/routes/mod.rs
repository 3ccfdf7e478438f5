pub mod events_ws;
pub mod health;
pub mod matches;

pub mod bulb;
pub mod events;
pub mod payload;
pub mod registry;

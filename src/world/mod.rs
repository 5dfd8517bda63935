pub mod area;
pub mod item_types;
pub mod map;
pub mod position;
pub mod registry;
pub mod viewport;

pub mod core;
pub mod layout;
pub mod setup;
pub mod sheets;

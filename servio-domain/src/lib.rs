pub mod booking;
pub mod client;
pub mod dayclose;
pub mod inventory;
pub mod settings;

pub mod db;
pub mod host;
pub mod server;
pub mod version;
pub mod web;
pub mod wiegand;

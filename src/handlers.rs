pub mod activity;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod earnings;
pub mod orders;
pub mod payments;
pub mod playlists;
pub mod settings;

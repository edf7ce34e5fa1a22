pub mod activity_service;
pub mod auth;
pub mod cart_service;
pub mod catalog_service;
pub mod earnings_service;
pub mod fees;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod playlist_service;
pub mod settings_service;

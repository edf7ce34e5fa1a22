pub mod user_repo;
pub use user_repo::UserRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod cart_repo;
pub use cart_repo::CartRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod earnings_repo;
pub use earnings_repo::EarningsRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod playlist_repo;
pub use playlist_repo::PlaylistRepository;
pub mod token_repo;
pub use token_repo::RefreshTokenRepository;

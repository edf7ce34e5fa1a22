// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::check_username,
        handlers::auth::upgrade,

        // --- Users ---
        handlers::auth::get_me,

        // --- Catalog ---
        handlers::catalog::list_genres,
        handlers::catalog::list_beats,
        handlers::catalog::trending_beats,
        handlers::catalog::get_beat,
        handlers::catalog::producer_beats,

        // --- Activity ---
        handlers::activity::toggle_like,
        handlers::activity::liked_beats,
        handlers::activity::record_play,
        handlers::activity::play_history,

        // --- Playlists ---
        handlers::playlists::list_playlists,
        handlers::playlists::create_playlist,
        handlers::playlists::get_playlist,
        handlers::playlists::update_playlist,
        handlers::playlists::delete_playlist,
        handlers::playlists::add_playlist_beat,
        handlers::playlists::remove_playlist_beat,

        // --- Producer ---
        handlers::catalog::create_beat,
        handlers::catalog::update_beat,
        handlers::catalog::replace_tiers,
        handlers::catalog::delete_beat,
        handlers::earnings::list_earnings,
        handlers::earnings::earnings_summary,
        handlers::earnings::request_payout,
        handlers::earnings::list_payouts,

        // --- Cart ---
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::cart::merge_cart,

        // --- Orders ---
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::list_purchases,
        handlers::orders::purchases_for_beat,

        // --- Payments ---
        handlers::payments::paystack_webhook,
        handlers::payments::verify_paystack,

        // --- Settings ---
        handlers::settings::get_fee_settings,
        handlers::settings::quote_fees,

        // --- Admin ---
        handlers::auth::update_user_status,
        handlers::catalog::create_genre,
        handlers::orders::refund_order,
        handlers::earnings::release_earnings,
        handlers::earnings::complete_payout,
        handlers::earnings::fail_payout,
        handlers::settings::list_settings,
        handlers::settings::get_setting,
        handlers::settings::create_setting,
        handlers::settings::update_setting,
        handlers::settings::delete_setting,
    ),
    components(
        schemas(
            // --- AUTH ---
            models::auth::UserRole,
            models::auth::UserStatus,
            models::auth::User,
            models::auth::ProducerProfile,
            models::auth::ArtistProfile,
            models::auth::AdminProfile,
            models::auth::Profile,
            models::auth::UserWithProfile,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::UpdateUserStatusPayload,
            models::auth::AuthResponse,
            models::auth::RefreshTokenPayload,
            models::auth::LogoutPayload,
            models::auth::UsernameAvailability,
            models::auth::UpgradeToProducerPayload,

            // --- CATALOG ---
            models::catalog::Genre,
            models::catalog::BeatStatus,
            models::catalog::TierType,
            models::catalog::Beat,
            models::catalog::BeatSummary,
            models::catalog::LicenseTier,
            models::catalog::BeatDetail,
            models::catalog::CreateGenrePayload,
            models::catalog::TierInput,
            models::catalog::CreateBeatPayload,
            models::catalog::UpdateBeatPayload,
            models::catalog::UpsertTiersPayload,
            crate::db::catalog_repo::BeatSort,
            handlers::catalog::ProducerBeats,

            // --- ACTIVITY ---
            models::activity::LikeState,
            models::activity::PlayHistoryEntry,
            handlers::activity::PlayCount,

            // --- PLAYLISTS ---
            models::playlists::Playlist,
            models::playlists::PlaylistDetail,
            models::playlists::CreatePlaylistPayload,
            models::playlists::UpdatePlaylistPayload,
            models::playlists::AddPlaylistBeatPayload,

            // --- CART ---
            models::cart::CartItem,
            models::cart::CartLine,
            models::cart::CartView,
            models::cart::AddToCartPayload,
            models::cart::UpdateCartTierPayload,
            handlers::cart::ClearedCart,

            // --- ORDERS ---
            models::orders::OrderStatus,
            models::orders::Order,
            models::orders::OrderItem,
            models::orders::OrderDetail,
            models::orders::UserPurchase,
            models::orders::PurchaseSummary,
            models::orders::OrderLineInput,
            models::orders::CreateOrderPayload,
            crate::services::payment_service::PaymentVerification,

            // --- EARNINGS ---
            models::earnings::EarningStatus,
            models::earnings::ProducerEarning,
            models::earnings::EarningsSummary,
            models::earnings::PayoutStatus,
            models::earnings::Payout,
            models::earnings::CompletePayoutPayload,
            models::earnings::FailPayoutPayload,
            handlers::earnings::ReleasedEarnings,

            // --- SETTINGS ---
            models::settings::SettingType,
            models::settings::PlatformSetting,
            models::settings::SettingValue,
            models::settings::FeeSettings,
            models::settings::PayoutSettings,
            models::settings::FeeBreakdown,
            models::settings::CreateSettingPayload,
            models::settings::UpdateSettingPayload,

            crate::common::response::Pagination,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, token refresh and account upgrade"),
        (name = "Users", description = "The signed-in user"),
        (name = "Catalog", description = "Public beat browsing"),
        (name = "Activity", description = "Likes and listening history"),
        (name = "Playlists", description = "User playlists"),
        (name = "Producer", description = "Beat management, earnings and payouts"),
        (name = "Cart", description = "Guest and user carts"),
        (name = "Orders", description = "Checkout and purchased licenses"),
        (name = "Payments", description = "Provider webhooks and verification"),
        (name = "Settings", description = "Public fee settings"),
        (name = "Admin", description = "Platform administration")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

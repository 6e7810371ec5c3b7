//! Specialists that act on the delivery platform.
//!
//! - **notification-sender**: push notifications to customers and drivers
//! - **route-finder**: alternative routes and updated ETAs
//! - **merchant-status-checker**: kitchen status and prep time
//! - **merchant-finder**: nearby merchants with a shorter wait
//!
//! All of them reach the platform through a [`LogisticsBackend`], either the
//! [`HttpBackend`] or the self-contained [`InMemoryBackend`].

pub mod backend;
pub mod finder;
pub mod http_backend;
pub mod ids;
pub mod merchant;
pub mod notification;
pub mod registry;
pub mod route;

pub use backend::{
    InMemoryBackend, LogisticsBackend, MerchantStatus, NearbyMerchant, NotificationReceipt,
    RouteEstimate, SentNotification,
};
pub use finder::MerchantFinder;
pub use http_backend::HttpBackend;
pub use merchant::MerchantStatusChecker;
pub use notification::NotificationSender;
pub use registry::SpecialistRegistry;
pub use route::RouteFinder;

//! Client for the upstream KeyAuth licensing service.
//!
//! Two entry points, one per kind of upstream traffic:
//!
//! - [`SellerClient`]: stateless seller-API calls (keys, users). One shared
//!   instance serves every request.
//! - [`AppSession`]: a short-lived app-API session for a single login or
//!   registration attempt.
//!
//! Request handlers depend on the [`LicenseService`] trait, not on the
//! concrete client.
//!
//! # Example
//!
//! ```ignore
//! let client = SellerClient::new(settings)?;
//! let keys = client.fetch_all_licenses().await?.items;
//! ```

mod app;
mod client;
mod error;
mod seller;

pub use app::AppSession;
pub use client::{
    APP_API_URL, AppCredentials, Charset, DEFAULT_MASK, KeyAuthSettings, LicenseService,
    Listing, NewLicense, SELLER_API_URL, UpstreamResponse,
};
pub use error::KeyAuthError;
pub use seller::SellerClient;

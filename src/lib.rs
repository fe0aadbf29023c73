//! Tesora — AI-assisted custom apparel storefront.
//!
//! ## Features
//! - Product catalog with designer attribution
//! - AI design generation via an external image service
//! - Cart, wishlist, coupons and first-order discount
//! - Transactional checkout with static HTML invoices
//! - Customer, designer and admin back-offices

pub mod assembler;
pub mod auth;
pub mod error;
pub mod events;
pub mod generation;
pub mod handlers;
pub mod invoice;
pub mod models;
pub mod pricing;

use std::path::PathBuf;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub generator: Option<generation::GenerationClient>,
    pub invoice_dir: PathBuf,
}

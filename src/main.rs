//! Tesora — AI-assisted custom apparel storefront service.

use anyhow::Result;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tesora::generation::GenerationClient;
use tesora::handlers::{
    addresses, analytics, cart, checkout, coupons, designers, designs, orders, products,
};
use tesora::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => async_nats::connect(&url).await.ok(),
        Err(_) => None,
    };
    let generator = GenerationClient::from_env();
    if generator.is_none() {
        tracing::warn!("GENERATION_API_URL unset; design generation disabled");
    }
    let invoice_dir =
        std::path::PathBuf::from(std::env::var("INVOICE_DIR").unwrap_or_else(|_| "invoices".into()));
    tokio::fs::create_dir_all(&invoice_dir).await?;

    let state = AppState {
        db,
        nats,
        generator,
        invoice_dir,
    };

    let app = Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "tesora"})) }),
        )
        // storefront
        .route(
            "/api/v1/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/v1/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/api/v1/designs",
            get(designs::list_designs).post(designs::generate_design),
        )
        .route("/api/v1/designs/quota", get(designs::generation_quota))
        .route(
            "/api/v1/cart",
            get(cart::get_cart)
                .post(cart::add_to_cart)
                .delete(cart::clear_cart),
        )
        .route(
            "/api/v1/cart/:id",
            patch(cart::update_cart_item).delete(cart::remove_cart_item),
        )
        .route(
            "/api/v1/wishlist",
            get(cart::list_wishlist).post(cart::add_to_wishlist),
        )
        .route(
            "/api/v1/wishlist/:product_id",
            delete(cart::remove_from_wishlist),
        )
        .route(
            "/api/v1/addresses",
            get(addresses::list_addresses).post(addresses::create_address),
        )
        .route("/api/v1/addresses/:id", delete(addresses::delete_address))
        .route(
            "/api/v1/addresses/:id/default",
            post(addresses::set_default_address),
        )
        // checkout
        .route("/api/v1/coupons/validate", post(coupons::validate))
        .route("/api/v1/checkout/quote", get(checkout::quote))
        .route("/api/v1/checkout", post(checkout::confirm))
        .route("/api/v1/orders", get(orders::list_my_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/invoices/:name", get(orders::download_invoice))
        // designer portal
        .route("/api/v1/designer/products", get(designers::my_products))
        .route(
            "/api/v1/designer/order-items",
            get(designers::my_order_items),
        )
        .route(
            "/api/v1/designer/order-items/:id/fulfillment",
            patch(designers::update_fulfillment),
        )
        .route("/api/v1/designer/summary", get(designers::my_sales_summary))
        // admin portal
        .route(
            "/api/v1/coupons",
            get(coupons::list_coupons).post(coupons::create_coupon),
        )
        .route(
            "/api/v1/coupons/:id",
            patch(coupons::update_coupon).delete(coupons::delete_coupon),
        )
        .route("/api/v1/admin/orders", get(orders::list_all_orders))
        .route(
            "/api/v1/admin/orders/:id/status",
            patch(orders::update_order_status),
        )
        .route(
            "/api/v1/admin/designers",
            get(designers::list_designers).post(designers::create_designer),
        )
        .route(
            "/api/v1/admin/designers/:id",
            patch(designers::update_designer),
        )
        .route("/api/v1/admin/analytics", get(analytics::summary))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("tesora listening on 0.0.0.0:{}", port);
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?,
        app,
    )
    .await?;
    Ok(())
}

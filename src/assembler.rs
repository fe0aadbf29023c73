//! Order assembly: the write sequence behind a confirmed checkout.
//!
//! Every row write shares one transaction, so a failure anywhere leaves no
//! partial order behind. The invoice file write and the event publish happen
//! after commit and only warn on failure.

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::{ApiError, CouponError};
use crate::events::{self, StoreEvent};
use crate::generation::GENERATION_QUOTA;
use crate::invoice::{render_invoice_html, InvoiceData, InvoiceLine};
use crate::models::{Address, CartItem, Order};
use crate::pricing::{AppliedCoupon, PriceBreakdown};
use crate::AppState;

pub const CURRENCY: &str = "INR";

/// Shipping form fields, validated by the checkout handler.
#[derive(Debug, Clone)]
pub struct ShippingDetails {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug)]
pub struct OrderDraft<'a> {
    pub user_id: Uuid,
    pub items: &'a [CartItem],
    pub shipping: &'a ShippingDetails,
    pub coupon: Option<AppliedCoupon>,
    pub totals: PriceBreakdown,
}

/// Timestamp-derived, with an entropy suffix against same-second collisions.
fn next_order_number() -> String {
    format!(
        "TSR-{}-{:04}",
        Utc::now().format("%Y%m%d%H%M%S"),
        rand::random::<u16>() % 10_000
    )
}

pub async fn place_order(state: &AppState, draft: OrderDraft<'_>) -> Result<Order, ApiError> {
    let mut tx = state.db.begin().await?;

    let address = insert_address(&mut tx, draft.user_id, draft.shipping).await?;

    let order_number = next_order_number();
    let invoice_url = format!("/invoices/{order_number}.html");

    let order: Order = sqlx::query_as(
        "INSERT INTO orders (id, order_number, user_id, subtotal, coupon_code, coupon_discount, \
         first_order_discount, total_amount, currency, status, payment_status, \
         shipping_address_id, billing_address_id, invoice_url, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', 'pending', $10, $10, $11, NOW(), NOW()) \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&order_number)
    .bind(draft.user_id)
    .bind(draft.totals.subtotal)
    .bind(draft.coupon.as_ref().map(|c| c.code.as_str()))
    .bind(draft.totals.coupon_discount)
    .bind(draft.totals.first_order_discount)
    .bind(draft.totals.final_total)
    .bind(CURRENCY)
    .bind(address.id)
    .bind(&invoice_url)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(coupon) = &draft.coupon {
        redeem_coupon(&mut tx, &coupon.code).await?;
    }

    record_order_stats(&mut tx, draft.user_id, draft.totals.first_order_discount > 0).await?;

    for item in draft.items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, product_name, quantity, \
             unit_price, total_price, size, color, fulfillment_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'unfulfilled', NOW())",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.line_total())
        .bind(&item.size)
        .bind(&item.color)
        .execute(&mut *tx)
        .await?;
    }

    // placing an order earns back the AI-generation quota once it is spent
    sqlx::query(
        "UPDATE user_generation_stats SET generation_count = 0, updated_at = NOW() \
         WHERE user_id = $1 AND generation_count >= $2",
    )
    .bind(draft.user_id)
    .bind(GENERATION_QUOTA)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(draft.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    write_invoice(state, &order, &address, draft.items, draft.coupon.as_ref(), &draft.totals)
        .await;
    events::publish(
        &state.nats,
        StoreEvent::OrderCreated {
            order_id: order.id,
            order_number: order.order_number.clone(),
            user_id: order.user_id,
            total_amount: order.total_amount,
        },
    )
    .await;

    tracing::info!(order_number = %order.order_number, total = order.total_amount, "order placed");
    Ok(order)
}

async fn insert_address(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    s: &ShippingDetails,
) -> Result<Address, ApiError> {
    let address = sqlx::query_as(
        "INSERT INTO addresses (id, user_id, full_name, phone, line1, line2, city, state, \
         postal_code, country, is_default, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(&s.full_name)
    .bind(&s.phone)
    .bind(&s.line1)
    .bind(&s.line2)
    .bind(&s.city)
    .bind(&s.state)
    .bind(&s.postal_code)
    .bind(&s.country)
    .fetch_one(&mut **tx)
    .await?;
    Ok(address)
}

/// Conditional atomic increment; a coupon can never exceed max_uses even
/// under concurrent checkouts.
async fn redeem_coupon(tx: &mut Transaction<'_, Postgres>, code: &str) -> Result<(), ApiError> {
    let updated = sqlx::query(
        "UPDATE coupon_codes SET current_uses = current_uses + 1 \
         WHERE code = $1 AND is_active AND (max_uses IS NULL OR current_uses < max_uses)",
    )
    .bind(code)
    .execute(&mut **tx)
    .await?;
    if updated.rows_affected() == 0 {
        // validated earlier, raced out since
        return Err(CouponError::UsageExceeded.into());
    }
    Ok(())
}

/// Upsert keeps order_count monotonic and flips first_order_discount_used at
/// most once, on the order that consumed it.
async fn record_order_stats(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    discount_applied: bool,
) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO user_order_stats (user_id, order_count, first_order_discount_used, updated_at) \
         VALUES ($1, 1, $2, NOW()) \
         ON CONFLICT (user_id) DO UPDATE SET \
         order_count = user_order_stats.order_count + 1, \
         first_order_discount_used = user_order_stats.first_order_discount_used OR $2, \
         updated_at = NOW()",
    )
    .bind(user_id)
    .bind(discount_applied)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn write_invoice(
    state: &AppState,
    order: &Order,
    address: &Address,
    items: &[CartItem],
    coupon: Option<&AppliedCoupon>,
    totals: &PriceBreakdown,
) {
    let lines: Vec<InvoiceLine> = items
        .iter()
        .map(|i| InvoiceLine {
            name: i.product_name.clone(),
            quantity: i.quantity,
            unit_price: i.unit_price,
            total: i.line_total(),
            size: i.size.clone(),
            color: i.color.clone(),
        })
        .collect();
    let date = order.created_at.format("%d %b %Y").to_string();
    let html = render_invoice_html(&InvoiceData {
        order_number: &order.order_number,
        date: &date,
        currency: &order.currency,
        address,
        lines: &lines,
        coupon_code: coupon.map(|c| c.code.as_str()),
        totals,
    });
    let path = state
        .invoice_dir
        .join(format!("{}.html", order.order_number));
    if let Err(e) = tokio::fs::write(&path, html).await {
        tracing::warn!(error = %e, path = %path.display(), "invoice write failed; order stands");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_are_timestamped_and_unique_enough() {
        let n = next_order_number();
        assert!(n.starts_with("TSR-"));
        // TSR- + 14 digit timestamp + - + 4 digit suffix
        assert_eq!(n.len(), 4 + 14 + 1 + 4);
        let m = next_order_number();
        assert_eq!(m.len(), n.len());
    }
}

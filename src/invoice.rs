//! Static HTML invoice rendering.
//!
//! Pure string building; deterministic for identical inputs (the caller
//! supplies the formatted date). The assembler writes the result to the
//! invoice directory after the order commits.

use crate::models::Address;
use crate::pricing::PriceBreakdown;

/// One rendered line of the invoice table.
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
    pub size: String,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct InvoiceData<'a> {
    pub order_number: &'a str,
    pub date: &'a str,
    pub currency: &'a str,
    pub address: &'a Address,
    pub lines: &'a [InvoiceLine],
    pub coupon_code: Option<&'a str>,
    pub totals: &'a PriceBreakdown,
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn money(currency: &str, amount: i64) -> String {
    format!("{currency} {amount}")
}

fn variant(line: &InvoiceLine) -> String {
    match (line.size.is_empty(), line.color.is_empty()) {
        (false, false) => format!(" ({} / {})", escape(&line.size), escape(&line.color)),
        (false, true) => format!(" ({})", escape(&line.size)),
        (true, false) => format!(" ({})", escape(&line.color)),
        (true, true) => String::new(),
    }
}

pub fn render_invoice_html(inv: &InvoiceData<'_>) -> String {
    let a = inv.address;
    let mut html = String::with_capacity(2048);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>Invoice {}</title>\n",
        escape(inv.order_number)
    ));
    html.push_str(
        "<style>body{font-family:sans-serif;margin:2rem}table{width:100%;border-collapse:collapse}\
         th,td{border-bottom:1px solid #ddd;padding:.5rem;text-align:left}\
         td.num,th.num{text-align:right}tfoot td{border-bottom:none}</style>\n</head>\n<body>\n",
    );
    html.push_str("<h1>Tesora</h1>\n<h2>Tax Invoice</h2>\n");
    html.push_str(&format!(
        "<p>Order <strong>{}</strong><br>Date: {}</p>\n",
        escape(inv.order_number),
        escape(inv.date)
    ));

    html.push_str("<h3>Ship to</h3>\n<p>");
    html.push_str(&escape(&a.full_name));
    html.push_str("<br>");
    html.push_str(&escape(&a.line1));
    html.push_str("<br>");
    if let Some(line2) = &a.line2 {
        if !line2.is_empty() {
            html.push_str(&escape(line2));
            html.push_str("<br>");
        }
    }
    html.push_str(&format!(
        "{}, {} {}<br>{}<br>Phone: {}</p>\n",
        escape(&a.city),
        escape(&a.state),
        escape(&a.postal_code),
        escape(&a.country),
        escape(&a.phone)
    ));

    html.push_str(
        "<table>\n<thead><tr><th>Item</th><th class=\"num\">Qty</th>\
         <th class=\"num\">Unit</th><th class=\"num\">Total</th></tr></thead>\n<tbody>\n",
    );
    for line in inv.lines {
        html.push_str(&format!(
            "<tr><td>{}{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
            escape(&line.name),
            variant(line),
            line.quantity,
            money(inv.currency, line.unit_price),
            money(inv.currency, line.total),
        ));
    }
    html.push_str("</tbody>\n<tfoot>\n");

    let t = inv.totals;
    html.push_str(&format!(
        "<tr><td colspan=\"3\">Subtotal</td><td class=\"num\">{}</td></tr>\n",
        money(inv.currency, t.subtotal)
    ));
    if t.coupon_discount > 0 {
        let code = inv.coupon_code.unwrap_or("coupon");
        html.push_str(&format!(
            "<tr><td colspan=\"3\">Coupon ({})</td><td class=\"num\">-{}</td></tr>\n",
            escape(code),
            money(inv.currency, t.coupon_discount)
        ));
    }
    if t.first_order_discount > 0 {
        html.push_str(&format!(
            "<tr><td colspan=\"3\">First-order discount</td><td class=\"num\">-{}</td></tr>\n",
            money(inv.currency, t.first_order_discount)
        ));
    }
    html.push_str(&format!(
        "<tr><td colspan=\"3\"><strong>Grand total</strong></td><td class=\"num\"><strong>{}</strong></td></tr>\n",
        money(inv.currency, t.final_total)
    ));
    html.push_str("</tfoot>\n</table>\n<p>Thank you for shopping with Tesora.</p>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn address() -> Address {
        Address {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            full_name: "Asha Rao".into(),
            phone: "+91 98765 43210".into(),
            line1: "12 MG Road".into(),
            line2: None,
            city: "Bengaluru".into(),
            state: "KA".into(),
            postal_code: "560001".into(),
            country: "IN".into(),
            is_default: true,
            created_at: Utc::now(),
        }
    }

    fn lines() -> Vec<InvoiceLine> {
        vec![
            InvoiceLine {
                name: "Nebula Tee".into(),
                quantity: 2,
                unit_price: 1500,
                total: 3000,
                size: "M".into(),
                color: "black".into(),
            },
            InvoiceLine {
                name: "Custom Hoodie <v2>".into(),
                quantity: 1,
                unit_price: 2000,
                total: 2000,
                size: String::new(),
                color: String::new(),
            },
        ]
    }

    #[test]
    fn rendering_is_idempotent() {
        let addr = address();
        let lines = lines();
        let totals = PriceBreakdown::compose(5000, 0, 250);
        let inv = InvoiceData {
            order_number: "TSR-20260823120000-0042",
            date: "23 Aug 2026",
            currency: "INR",
            address: &addr,
            lines: &lines,
            coupon_code: None,
            totals: &totals,
        };
        assert_eq!(render_invoice_html(&inv), render_invoice_html(&inv));
    }

    #[test]
    fn totals_and_discount_lines_appear() {
        let addr = address();
        let lines = lines();
        let totals = PriceBreakdown::compose(5000, 200, 250);
        let inv = InvoiceData {
            order_number: "TSR-1",
            date: "23 Aug 2026",
            currency: "INR",
            address: &addr,
            lines: &lines,
            coupon_code: Some("SAVE200"),
            totals: &totals,
        };
        let html = render_invoice_html(&inv);
        assert!(html.contains("INR 5000"));
        assert!(html.contains("Coupon (SAVE200)"));
        assert!(html.contains("-INR 200"));
        assert!(html.contains("First-order discount"));
        assert!(html.contains("-INR 250"));
        assert!(html.contains("INR 4550"));
        // markup in product names is escaped
        assert!(html.contains("Custom Hoodie &lt;v2&gt;"));
        assert!(!html.contains("<v2>"));
    }

    #[test]
    fn discount_rows_omitted_when_zero() {
        let addr = address();
        let lines = lines();
        let totals = PriceBreakdown::compose(5000, 0, 0);
        let inv = InvoiceData {
            order_number: "TSR-2",
            date: "23 Aug 2026",
            currency: "INR",
            address: &addr,
            lines: &lines,
            coupon_code: None,
            totals: &totals,
        };
        let html = render_invoice_html(&inv);
        assert!(!html.contains("Coupon ("));
        assert!(!html.contains("First-order discount"));
    }
}

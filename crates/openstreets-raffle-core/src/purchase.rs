// SPDX-License-Identifier: Apache-2.0

//! Checkout-session wire model and the filter that turns paid sessions into
//! raffle purchase records.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const SESSION_STATUS_COMPLETE: &str = "complete";
pub const PAYMENT_STATUS_PAID: &str = "paid";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub price: Option<PriceRef>,
    /// `None` covers both an absent quantity and one that is not a positive
    /// integer.
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: Option<u64>,
}

impl LineItem {
    #[must_use]
    pub fn price_id(&self) -> Option<&str> {
        self.price.as_ref().map(|p| p.id.as_str())
    }

    #[must_use]
    pub fn ticket_quantity(&self) -> u64 {
        self.quantity.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemList {
    #[serde(default)]
    pub data: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub line_items: Option<LineItemList>,
}

impl CheckoutSession {
    #[must_use]
    pub fn is_paid_and_complete(&self) -> bool {
        self.status.as_deref() == Some(SESSION_STATUS_COMPLETE)
            && self.payment_status.as_deref() == Some(PAYMENT_STATUS_PAID)
    }

    #[must_use]
    pub fn buyer_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|c| c.email.as_deref())
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

/// One page of the upstream session listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPage {
    #[serde(default)]
    pub data: Vec<CheckoutSession>,
    #[serde(default)]
    pub has_more: bool,
}

/// One paid raffle line item, attributed to its buyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRecord {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub quantity: u64,
}

/// Keeps paid, complete sessions with a buyer email and returns one record per
/// line item priced at `raffle_price_id`.
#[must_use]
pub fn extract_purchases<'a, I>(sessions: I, raffle_price_id: &str) -> Vec<PurchaseRecord>
where
    I: IntoIterator<Item = &'a CheckoutSession>,
{
    let mut out = Vec::new();
    for session in sessions {
        if !session.is_paid_and_complete() {
            continue;
        }
        let Some(email) = session.buyer_email() else {
            continue;
        };
        let Some(items) = &session.line_items else {
            continue;
        };
        let details = session.customer_details.as_ref();
        for item in &items.data {
            if item.price_id() != Some(raffle_price_id) {
                continue;
            }
            out.push(PurchaseRecord {
                email: email.to_string(),
                name: details.and_then(|d| d.name.clone()),
                phone: details.and_then(|d| d.phone.clone()),
                quantity: item.ticket_quantity(),
            });
        }
    }
    out
}

fn lenient_quantity<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_u64().filter(|q| *q > 0),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok().filter(|q| *q > 0),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(id: &str, email: Option<&str>, items: Value) -> CheckoutSession {
        serde_json::from_value(json!({
            "id": id,
            "status": "complete",
            "payment_status": "paid",
            "customer_details": {"email": email, "name": "Pat", "phone": null},
            "line_items": {"object": "list", "data": items},
        }))
        .expect("session json")
    }

    #[test]
    fn malformed_quantities_fall_back_to_one() {
        let s = session(
            "cs_1",
            Some("a@example.org"),
            json!([
                {"price": {"id": "price_raffle"}, "quantity": null},
                {"price": {"id": "price_raffle"}},
                {"price": {"id": "price_raffle"}, "quantity": "abc"},
                {"price": {"id": "price_raffle"}, "quantity": 0},
                {"price": {"id": "price_raffle"}, "quantity": -2},
                {"price": {"id": "price_raffle"}, "quantity": 2.5},
            ]),
        );
        let records = extract_purchases([&s], "price_raffle");
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.quantity == 1));
    }

    #[test]
    fn filters_unpaid_foreign_prices_and_missing_email() {
        let paid = session(
            "cs_1",
            Some("a@example.org"),
            json!([
                {"price": {"id": "price_raffle"}, "quantity": 3},
                {"price": {"id": "price_tshirt"}, "quantity": 1},
                {"price": null, "quantity": 1},
            ]),
        );
        let mut unpaid = paid.clone();
        unpaid.payment_status = Some("unpaid".to_string());
        let mut open = paid.clone();
        open.status = Some("open".to_string());
        let anonymous = session(
            "cs_2",
            Some("   "),
            json!([{"price": {"id": "price_raffle"}, "quantity": 4}]),
        );

        let records = extract_purchases([&paid, &unpaid, &open, &anonymous], "price_raffle");
        assert_eq!(
            records,
            vec![PurchaseRecord {
                email: "a@example.org".to_string(),
                name: Some("Pat".to_string()),
                phone: None,
                quantity: 3,
            }]
        );
    }

    #[test]
    fn session_page_ignores_unknown_fields() {
        let page: SessionPage = serde_json::from_value(json!({
            "object": "list",
            "url": "/v1/checkout/sessions",
            "has_more": true,
            "data": [{"id": "cs_9", "object": "checkout.session", "amount_total": 500}],
        }))
        .expect("page json");
        assert!(page.has_more);
        assert_eq!(page.data[0].id, "cs_9");
        assert!(page.data[0].line_items.is_none());
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::auth::UserRef;
use crate::controllers::Resource;

/// Where the buyer wants the item sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Delivery {
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "Name is required"))]
    pub name: String,
    #[validate(regex(path = "crate::auth::validation::EMAIL_RE", message = "Enter a valid email address"))]
    pub email: String,
    #[validate(regex(path = "crate::auth::validation::PHONE_RE", message = "Enter a valid phone number"))]
    pub phone: String,
    #[validate(regex(path = "crate::auth::validation::NOT_BLANK_RE", message = "Address is required"))]
    pub address: String,
}

impl Delivery {
    pub const FIELDS: &'static [&'static str] = &["name", "email", "phone", "address"];

    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
        }
    }
}

/// Body for `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub product_id: String,
    pub quantity: u32,
    pub delivery: Delivery,
}

/// The ordered product, populated or as a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderProduct {
    Summary {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default)]
        title: String,
    },
    Id(String),
}

impl OrderProduct {
    pub fn id(&self) -> &str {
        match self {
            OrderProduct::Summary { id, .. } | OrderProduct::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub product: Option<OrderProduct>,
    #[serde(default)]
    pub seller: Option<UserRef>,
    #[serde(default)]
    pub buyer: Option<UserRef>,
    pub quantity: u32,
    pub price: f64,
    #[serde(default)]
    pub commission_amount: f64,
    pub total_amount: f64,
    #[serde(default)]
    pub delivery: Option<Delivery>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl Resource for Order {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Checkout breakdown in integer cents.
///
/// The buyer pays `total`; the platform keeps `commission` and the
/// seller receives the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutQuote {
    pub unit_cents: u64,
    pub quantity: u32,
    pub total: u64,
    pub commission: u64,
    pub seller_payout: u64,
}

impl CheckoutQuote {
    /// `commission_percent` outside 0..=100 is clamped.
    pub fn compute(price: f64, quantity: u32, commission_percent: f64) -> Self {
        let unit_cents = if price.is_finite() && price > 0.0 {
            (price * 100.0).round() as u64
        } else {
            0
        };
        let percent = if commission_percent.is_finite() {
            commission_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let total = unit_cents.saturating_mul(u64::from(quantity));
        let commission = ((total as f64) * percent / 100.0).round() as u64;
        let commission = commission.min(total);
        Self {
            unit_cents,
            quantity,
            total,
            commission,
            seller_payout: total - commission,
        }
    }
}

/// `1234` -> `"12.34"`.
pub fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_splits_commission_from_total() {
        let q = CheckoutQuote::compute(19.99, 3, 5.0);
        assert_eq!(q.unit_cents, 1999);
        assert_eq!(q.total, 5997);
        assert_eq!(q.commission, 300);
        assert_eq!(q.seller_payout, 5697);
        assert_eq!(format_cents(q.total), "59.97");
    }

    #[test]
    fn quote_clamps_bad_inputs() {
        let free = CheckoutQuote::compute(f64::NAN, 2, 10.0);
        assert_eq!(free.total, 0);
        let all = CheckoutQuote::compute(10.0, 1, 250.0);
        assert_eq!(all.commission, 1000);
        assert_eq!(all.seller_payout, 0);
        let none = CheckoutQuote::compute(10.0, 1, -3.0);
        assert_eq!(none.commission, 0);
    }

    #[test]
    fn order_from_backend_shape() {
        let order: Order = serde_json::from_str(
            r#"{"_id":"o1","product":{"_id":"p1","title":"Desk"},"seller":"s1",
                "quantity":1,"price":80,"commissionAmount":4,"totalAmount":80,
                "delivery":{"name":"Ana","email":"ana@test.com","phone":"0712345678","address":"1 Road"}}"#,
        )
        .unwrap();
        assert_eq!(order.product.as_ref().map(OrderProduct::id), Some("p1"));
        assert_eq!(order.seller.as_ref().map(|s| s.id()), Some("s1"));
        assert_eq!(order.delivery.unwrap().name, "Ana");
    }
}

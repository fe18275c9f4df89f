//! Order Model
//!
//! Orders are produced by the main application and only ever read here.
//! Decoding is lenient where the application is loose: amounts may arrive as
//! numbers or decimal strings, optional fields may be missing or `null`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// How the customer receives the order
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentMethod {
    #[default]
    Pickup,
    Delivery,
    DineIn,
}

impl FulfillmentMethod {
    /// Parse the application's free-form value; unknown values are pickups
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("delivery") => Self::Delivery,
            Some("dine_in" | "dinein" | "dine-in") => Self::DineIn,
            _ => Self::Pickup,
        }
    }

    /// Wire name, as logged
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
            Self::DineIn => "dine_in",
        }
    }
}

impl<'de> Deserialize<'de> for FulfillmentMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_value(value.as_deref()))
    }
}

/// Item modifier: either a bare label or an object carrying a `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Modifier {
    Label(String),
    Named { name: String },
}

impl Modifier {
    pub fn name(&self) -> &str {
        match self {
            Self::Label(name) | Self::Named { name } => name,
        }
    }
}

/// Order line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Denormalised menu item name
    #[serde(default)]
    pub menu_item_name: Option<String>,
    /// Older payloads carry `name` instead
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Unit price in currency unit
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub modifiers: Option<Vec<Modifier>>,
}

impl OrderItem {
    pub fn display_name(&self) -> &str {
        self.menu_item_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.name.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or("Menu Item")
    }

    /// Quantity, where a missing or zero value counts as one
    pub fn quantity(&self) -> u32 {
        match self.quantity {
            Some(0) | None => 1,
            Some(q) => q,
        }
    }

    pub fn unit_price(&self) -> Decimal {
        self.price.unwrap_or_default()
    }

    pub fn modifiers(&self) -> &[Modifier] {
        self.modifiers.as_deref().unwrap_or_default()
    }
}

/// Order as served by the relay feeds
///
/// `id` is unique and stable across polls of the same logical order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Total amount in currency unit
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub subtotal_amount: Option<Decimal>,
    #[serde(default)]
    pub tax_amount: Option<Decimal>,
    #[serde(default)]
    pub tip_amount: Option<Decimal>,
    #[serde(default)]
    pub delivery_fee: Option<Decimal>,
    #[serde(default)]
    pub fulfillment_method: FulfillmentMethod,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Short human order number: last six characters of the id, upper-cased
    pub fn short_id(&self) -> String {
        let chars: Vec<char> = self.id.chars().collect();
        let start = chars.len().saturating_sub(6);
        chars[start..].iter().collect::<String>().to_uppercase()
    }

    pub fn total(&self) -> Decimal {
        self.total_amount.unwrap_or_default()
    }

    /// Customer name for log lines
    pub fn customer_label(&self) -> &str {
        self.customer_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Guest")
    }
}

/// Body of `GET /api/print-relay/orders` and `GET /api/print-relay/queue`
///
/// Entries stay raw until [`OrdersResponse::into_orders`], so one malformed
/// order cannot take the rest of the feed down with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdersResponse {
    #[serde(default)]
    pub orders: Vec<serde_json::Value>,
}

/// Feed entry that could not be decoded as an [`Order`]
#[derive(Debug)]
pub struct RejectedOrder {
    /// `id` of the entry, when it has a string one
    pub id: Option<String>,
    pub error: serde_json::Error,
}

impl OrdersResponse {
    /// Decode each entry on its own, in feed order
    pub fn into_orders(self) -> (Vec<Order>, Vec<RejectedOrder>) {
        let mut orders = Vec::with_capacity(self.orders.len());
        let mut rejected = Vec::new();

        for entry in self.orders {
            let id = entry.get("id").and_then(|v| v.as_str()).map(str::to_string);
            match serde_json::from_value::<Order>(entry) {
                Ok(order) => orders.push(order),
                Err(error) => rejected.push(RejectedOrder { id, error }),
            }
        }

        (orders, rejected)
    }
}

/// Body of the acknowledge and dequeue calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdBody {
    pub order_id: String,
}

/// Unparseable timestamps decode as `None` instead of failing the whole feed
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decode_feed_order() {
        let json = r#"{
            "orders": [{
                "id": "clx9abc123",
                "status": "pending",
                "customerName": "Maria",
                "totalAmount": 19.98,
                "subtotalAmount": "18.50",
                "taxAmount": null,
                "fulfillmentMethod": "DELIVERY",
                "createdAt": "2024-01-01T12:00:00.000Z",
                "items": [{
                    "menuItemName": "Taco Plate",
                    "quantity": 2,
                    "price": 9.99,
                    "modifiers": ["extra salsa", {"name": "no onions"}]
                }]
            }]
        }"#;

        let resp: OrdersResponse = serde_json::from_str(json).unwrap();
        let (orders, rejected) = resp.into_orders();
        assert_eq!(orders.len(), 1);
        assert!(rejected.is_empty());

        let order = &orders[0];
        assert_eq!(order.short_id(), "ABC123");
        assert_eq!(order.total(), Decimal::from_str("19.98").unwrap());
        assert_eq!(order.subtotal_amount, Some(Decimal::from_str("18.50").unwrap()));
        assert_eq!(order.tax_amount, None);
        assert_eq!(order.fulfillment_method, FulfillmentMethod::Delivery);
        assert!(order.created_at.is_some());

        let item = &order.items[0];
        assert_eq!(item.display_name(), "Taco Plate");
        assert_eq!(item.quantity(), 2);
        let names: Vec<_> = item.modifiers().iter().map(Modifier::name).collect();
        assert_eq!(names, vec!["extra salsa", "no onions"]);
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let order: Order = serde_json::from_str(r#"{"id": "x1", "createdAt": "not a date"}"#).unwrap();
        assert_eq!(order.fulfillment_method, FulfillmentMethod::Pickup);
        assert_eq!(order.total(), Decimal::ZERO);
        assert_eq!(order.customer_label(), "Guest");
        assert!(order.created_at.is_none());
        assert_eq!(order.short_id(), "X1");

        let item: OrderItem = serde_json::from_str(r#"{"name": "Horchata", "quantity": 0}"#).unwrap();
        assert_eq!(item.display_name(), "Horchata");
        assert_eq!(item.quantity(), 1);
        assert_eq!(item.unit_price(), Decimal::ZERO);

        let empty: OrdersResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.orders.is_empty());
    }

    #[test]
    fn test_malformed_entries_do_not_sink_the_feed() {
        let json = r#"{
            "orders": [
                {"id": "good1", "items": [{"name": "Horchata", "quantity": 1}]},
                {"id": "bad2", "items": [{"name": "Soda", "modifiers": [{"label": "ice"}]}]},
                {"id": "bad3", "items": [{"name": "Taco", "quantity": -1}]},
                {"customerName": "no id"},
                {"id": "good4"}
            ]
        }"#;

        let resp: OrdersResponse = serde_json::from_str(json).unwrap();
        let (orders, rejected) = resp.into_orders();

        let ids: Vec<_> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["good1", "good4"]);

        let rejected_ids: Vec<_> = rejected.iter().map(|r| r.id.as_deref()).collect();
        assert_eq!(rejected_ids, vec![Some("bad2"), Some("bad3"), None]);
    }

    #[test]
    fn test_fulfillment_variants() {
        assert_eq!(FulfillmentMethod::from_value(Some("dine_in")), FulfillmentMethod::DineIn);
        assert_eq!(FulfillmentMethod::from_value(Some("DINEIN")), FulfillmentMethod::DineIn);
        assert_eq!(FulfillmentMethod::from_value(Some("curbside")), FulfillmentMethod::Pickup);
        assert_eq!(FulfillmentMethod::from_value(None), FulfillmentMethod::Pickup);
    }

    #[test]
    fn test_order_id_body_wire_name() {
        let body = OrderIdBody { order_id: "abc123".into() };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"orderId":"abc123"}"#);
    }
}

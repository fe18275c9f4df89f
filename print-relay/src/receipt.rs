//! Customer receipt renderer
//!
//! Renders relay orders into ESC/POS format for 58mm/80mm thermal printers.
//! Rendering is pure: the print time is passed in, so the same order and
//! timestamp always produce the same bytes.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use relay_printer::EscPosBuilder;
use shared::{FulfillmentMethod, Order, OrderItem, format_money, line_total};

use crate::config::{AgentConfig, ConfigResult};

/// Shop identity printed on every receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptBranding {
    pub shop_name: String,
    pub tagline: Option<String>,
    pub location: Option<String>,
}

impl ReceiptBranding {
    pub fn new(shop_name: impl Into<String>) -> Self {
        Self {
            shop_name: shop_name.into(),
            tagline: None,
            location: None,
        }
    }
}

/// Receipt renderer
pub struct ReceiptRenderer {
    width: usize,
    timezone: Tz,
    branding: ReceiptBranding,
}

impl ReceiptRenderer {
    /// Create a new renderer with specified paper width and timezone
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize, timezone: Tz, branding: ReceiptBranding) -> Self {
        Self {
            width,
            timezone,
            branding,
        }
    }

    pub fn from_config(config: &AgentConfig) -> ConfigResult<Self> {
        let branding = ReceiptBranding {
            shop_name: config.shop_name(),
            tagline: config.shop_tagline.clone(),
            location: config.shop_location.clone(),
        };
        Ok(Self::new(config.paper_width, config.tz()?, branding))
    }

    /// Render an order to ESC/POS bytes
    pub fn render(&self, order: &Order, printed_at: DateTime<Utc>) -> Vec<u8> {
        let mut b = self.begin();

        self.render_shop_header(&mut b);
        self.render_order_header(&mut b, order, printed_at);
        self.render_customer(&mut b, order);
        self.render_items(&mut b, &order.items);
        self.render_totals(&mut b, order);
        self.render_notes(&mut b, order);
        self.render_footer(&mut b, printed_at);

        Self::finish(b)
    }

    /// Connectivity test page printed at startup
    pub fn render_test_page(&self, printed_at: DateTime<Utc>) -> Vec<u8> {
        let local = printed_at.with_timezone(&self.timezone);
        let mut b = self.begin();

        b.newline();
        b.double_size().line(&self.banner()).reset_size();
        b.newline();
        b.sep_double();
        b.newline();
        b.double_height().line("PRINT RELAY TEST").reset_size();
        b.newline();
        b.line("Connection successful!");
        b.newline();
        b.line(&format!("Time: {}", local.format("%-I:%M:%S %p")));
        b.line(&format!("Date: {}", local.format("%-m/%-d/%Y")));
        b.newline();
        b.sep_double();
        b.newline();
        b.line("Ready to receive orders.");

        Self::finish(b)
    }

    /// Preamble: dark, emphasized, centered
    fn begin(&self) -> EscPosBuilder {
        let mut b = EscPosBuilder::new(self.width);
        b.max_density().bold().double_strike().center();
        b
    }

    /// Trailing feed, emphasis off, partial cut
    fn finish(mut b: EscPosBuilder) -> Vec<u8> {
        b.feed(3).bold_off().double_strike_off().cut_partial();
        b.build()
    }

    fn banner(&self) -> String {
        format!("*** {} ***", self.branding.shop_name)
    }

    fn render_shop_header(&self, b: &mut EscPosBuilder) {
        b.double_size().line(&self.banner()).reset_size();
        if let Some(tagline) = &self.branding.tagline {
            b.line(tagline);
        }
        if let Some(location) = &self.branding.location {
            b.line(location);
        }
        b.newline();
    }

    /// Order number, fulfillment banner, order time
    fn render_order_header(
        &self,
        b: &mut EscPosBuilder,
        order: &Order,
        printed_at: DateTime<Utc>,
    ) {
        b.double_size()
            .line(&format!("ORDER #{}", order.short_id()))
            .reset_size();
        b.newline();

        match order.fulfillment_method {
            FulfillmentMethod::Delivery => {
                b.double_size().line("** DELIVERY **").reset_size();
            }
            FulfillmentMethod::DineIn => {
                b.double_size().line("** DINE-IN **").reset_size();
            }
            FulfillmentMethod::Pickup => {
                b.double_height().line("[ PICKUP ]").reset_size();
            }
        }
        b.newline();

        // Orders without a usable timestamp show the print time
        let placed = order.created_at.unwrap_or(printed_at);
        b.line(&format_order_time(placed, self.timezone));
        b.newline();
    }

    fn render_customer(&self, b: &mut EscPosBuilder, order: &Order) {
        b.sep_double();
        b.left();

        if let Some(name) = non_empty(&order.customer_name) {
            b.double_height()
                .line(&format!("Customer: {name}"))
                .reset_size();
        }
        if let Some(phone) = non_empty(&order.customer_phone) {
            b.line(&format!("Phone: {phone}"));
        }
        if let Some(address) = non_empty(&order.delivery_address) {
            b.newline();
            b.line("Delivery Address:");
            b.line(address);
        }
        b.newline();
    }

    fn render_items(&self, b: &mut EscPosBuilder, items: &[OrderItem]) {
        b.sep_double();
        b.center().double_height().line("ORDER ITEMS").reset_size();
        b.sep_double();
        b.left();
        b.newline();

        for item in items {
            let qty = item.quantity();
            b.double_height()
                .line(&format!("{qty}x {}", item.display_name()))
                .reset_size();
            b.line_right(&format_money(line_total(item.unit_price(), qty)));

            if let Some(notes) = non_empty(&item.notes) {
                b.line(&format!("   -> {notes}"));
            }
            for modifier in item.modifiers() {
                b.line(&format!("   + {}", modifier.name()));
            }
            b.newline();
        }
    }

    fn render_totals(&self, b: &mut EscPosBuilder, order: &Order) {
        b.sep_double();

        let rows = [
            ("Subtotal:", order.subtotal_amount),
            ("Tax:", order.tax_amount),
            ("Tip:", order.tip_amount),
            ("Delivery:", order.delivery_fee),
        ];
        for (label, amount) in rows {
            if let Some(amount) = amount.filter(|a| !a.is_zero()) {
                b.line_lr(label, &format_money(amount));
            }
        }

        b.sep_single();
        b.double_size()
            .line(&format!("TOTAL: {}", format_money(order.total())))
            .reset_size();
        b.newline();
    }

    fn render_notes(&self, b: &mut EscPosBuilder, order: &Order) {
        let Some(notes) = non_empty(&order.notes) else {
            return;
        };

        b.sep_double();
        b.double_height().line("** SPECIAL NOTES **").reset_size();
        b.newline();
        b.line(notes);
        b.newline();
    }

    fn render_footer(&self, b: &mut EscPosBuilder, printed_at: DateTime<Utc>) {
        b.sep_double();
        b.center();
        b.newline();
        b.line("Thank you for choosing");
        b.double_height()
            .line(&format!("{}!", self.branding.shop_name))
            .reset_size();
        b.newline();
        b.sep_single();

        let local = printed_at.with_timezone(&self.timezone);
        b.line(&format!("Printed: {}", local.format("%-I:%M:%S %p")));
    }
}

/// "Jan 1, 2024 at 4:00 AM" in the shop's timezone
fn format_order_time(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz)
        .format("%b %-d, %Y at %-I:%M %p")
        .to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::{Decimal, Modifier};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn renderer() -> ReceiptRenderer {
        let branding = ReceiptBranding {
            shop_name: "LAS REINAS".into(),
            tagline: Some("Authentic Mexican Cuisine".into()),
            location: Some("Colusa, CA".into()),
        };
        ReceiptRenderer::new(32, chrono_tz::America::Los_Angeles, branding)
    }

    fn printed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 20, 30, 15).unwrap()
    }

    fn taco_order() -> Order {
        Order {
            id: "abc123".into(),
            total_amount: Some(dec("19.98")),
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
            items: vec![OrderItem {
                menu_item_name: Some("Taco Plate".into()),
                quantity: Some(2),
                price: Some(dec("9.99")),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    #[test]
    fn test_render_pickup_order() {
        let data = renderer().render(&taco_order(), printed_at());

        assert!(contains(&data, "*** LAS REINAS ***"));
        assert!(contains(&data, "Authentic Mexican Cuisine"));
        assert!(contains(&data, "ORDER #ABC123"));
        assert!(contains(&data, "[ PICKUP ]"));
        assert!(contains(&data, "2x Taco Plate"));
        assert!(contains(&data, "$19.98"));
        assert!(contains(&data, "TOTAL: $19.98"));
        // 12:00 UTC is 4 AM in Los Angeles in winter
        assert!(contains(&data, "Jan 1, 2024 at 4:00 AM"));
        assert!(contains(&data, "Printed: 12:30:15 PM"));
        assert!(!contains(&data, "Subtotal:"));
        assert!(!contains(&data, "SPECIAL NOTES"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let r = renderer();
        let order = taco_order();
        assert_eq!(r.render(&order, printed_at()), r.render(&order, printed_at()));
    }

    #[test]
    fn test_preamble_and_cut() {
        let data = renderer().render(&taco_order(), printed_at());

        // ESC @, code page, max density, bold, double strike, center
        let preamble: &[u8] = &[
            0x1B, 0x40, 0x1B, 0x74, 16, 0x1D, 0x28, 0x4B, 0x02, 0x00, 0x31, 0x09, 0x1B, 0x45,
            0x01, 0x1B, 0x47, 0x01, 0x1B, 0x61, 0x01,
        ];
        assert!(data.starts_with(preamble));
        assert!(data.ends_with(&[0x1B, 0x45, 0x00, 0x1B, 0x47, 0x00, 0x1D, 0x56, 0x01]));
    }

    #[test]
    fn test_line_total_rounds_after_multiplication() {
        let mut order = taco_order();
        order.items[0].price = Some(dec("12.995"));

        let data = renderer().render(&order, printed_at());
        assert!(contains(&data, "$25.99"));
        assert!(!contains(&data, "$26.00"));
    }

    #[test]
    fn test_fulfillment_banners() {
        let mut order = taco_order();

        order.fulfillment_method = FulfillmentMethod::Delivery;
        order.delivery_address = Some("12 Main St".into());
        let data = renderer().render(&order, printed_at());
        assert!(contains(&data, "** DELIVERY **"));
        assert!(contains(&data, "Delivery Address:"));
        assert!(contains(&data, "12 Main St"));

        order.fulfillment_method = FulfillmentMethod::DineIn;
        let data = renderer().render(&order, printed_at());
        assert!(contains(&data, "** DINE-IN **"));
        assert!(!contains(&data, "[ PICKUP ]"));
    }

    #[test]
    fn test_totals_skip_missing_and_zero() {
        let mut order = taco_order();
        order.subtotal_amount = Some(dec("19.98"));
        order.tax_amount = Some(dec("1.5"));
        order.tip_amount = Some(Decimal::ZERO);

        let data = renderer().render(&order, printed_at());
        // 32 columns: label, padding, amount
        assert!(contains(&data, "Subtotal:                 $19.98\n"));
        assert!(contains(&data, "Tax:                       $1.50\n"));
        assert!(!contains(&data, "Tip:"));
        assert!(!contains(&data, "Delivery:"));
    }

    #[test]
    fn test_customer_notes_and_modifiers() {
        let mut order = taco_order();
        order.customer_name = Some("Maria".into());
        order.customer_phone = Some("555-0100".into());
        order.notes = Some("Ring the bell".into());
        order.items[0].notes = Some("no onions".into());
        order.items[0].modifiers = Some(vec![
            Modifier::Label("Extra salsa".into()),
            Modifier::Named {
                name: "Corn tortillas".into(),
            },
        ]);

        let data = renderer().render(&order, printed_at());
        assert!(contains(&data, "Customer: Maria"));
        assert!(contains(&data, "Phone: 555-0100"));
        assert!(contains(&data, "   -> no onions\n"));
        assert!(contains(&data, "   + Extra salsa\n"));
        assert!(contains(&data, "   + Corn tortillas\n"));
        assert!(contains(&data, "** SPECIAL NOTES **"));
        assert!(contains(&data, "Ring the bell"));
    }

    #[test]
    fn test_item_fallbacks_and_accents() {
        let mut order = taco_order();
        order.items = vec![
            OrderItem::default(),
            OrderItem {
                name: Some("Jalapeño Poppers".into()),
                quantity: Some(3),
                price: Some(dec("2.5")),
                ..Default::default()
            },
        ];

        let data = renderer().render(&order, printed_at());
        assert!(contains(&data, "1x Menu Item"));
        assert!(contains(&data, "$0.00"));
        assert!(contains(&data, "$7.50"));
        // Windows-1252 ñ
        let needle: &[u8] = b"3x Jalape\xF1o";
        assert!(data.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_missing_created_at_uses_print_time() {
        let mut order = taco_order();
        order.created_at = None;

        let data = renderer().render(&order, printed_at());
        assert!(contains(&data, "Jan 1, 2024 at 12:30 PM"));
    }

    #[test]
    fn test_render_test_page() {
        let data = renderer().render_test_page(printed_at());

        assert!(contains(&data, "*** LAS REINAS ***"));
        assert!(contains(&data, "PRINT RELAY TEST"));
        assert!(contains(&data, "Connection successful!"));
        assert!(contains(&data, "Time: 12:30:15 PM"));
        assert!(contains(&data, "Date: 1/1/2024"));
        assert!(contains(&data, "Ready to receive orders."));
        assert!(data.ends_with(&[0x1D, 0x56, 0x01]));
    }

    #[test]
    fn test_from_config_uses_branding() {
        let mut config = AgentConfig::default();
        config.tenant_slug = "tacos".into();

        let r = ReceiptRenderer::from_config(&config).unwrap();
        assert_eq!(r.branding.shop_name, "TACOS");

        config.timezone = "Nowhere/Special".into();
        assert!(ReceiptRenderer::from_config(&config).is_err());
    }
}

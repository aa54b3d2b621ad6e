use serde::{Deserialize, Serialize};

/// How the finished book is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFormat {
    Digital,
    #[default]
    Print,
    Both,
}

impl DeliveryFormat {
    /// Print and combined orders ship a physical copy.
    pub fn needs_shipping(&self) -> bool {
        matches!(self, Self::Print | Self::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub zip: String,
    pub country: String,
}

/// A submitted checkout. `shipping` is present exactly when the format
/// ships a physical copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub format: DeliveryFormat,
    pub email: String,
    pub subscribe_monthly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingAddress>,
}

/// A purchasable plan as shown on the checkout screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub format: DeliveryFormat,
    pub label: &'static str,
    pub price_cents: u32,
    pub recurring: bool,
    pub features: &'static [&'static str],
    pub highlight: bool,
    pub badge: Option<&'static str>,
}

impl Plan {
    /// Display price, e.g. "$29.99" or "$19.99/mo".
    pub fn price_label(&self) -> String {
        price_label(self.price_cents, self.recurring)
    }
}

pub static PLANS: [Plan; 3] = [
    Plan {
        format: DeliveryFormat::Digital,
        label: "Digital Only",
        price_cents: 999,
        recurring: false,
        features: &["Instant PDF download", "High-res illustrations", "Read on any device"],
        highlight: false,
        badge: None,
    },
    Plan {
        format: DeliveryFormat::Print,
        label: "Printed Book",
        price_cents: 2999,
        recurring: false,
        features: &[
            "Softcover, 8 pages",
            "Shipped to your door",
            "Vibrant colour print",
            "PDF included",
        ],
        highlight: true,
        badge: None,
    },
    Plan {
        format: DeliveryFormat::Both,
        label: "Monthly Adventure Club",
        price_cents: 1999,
        recurring: true,
        features: &[
            "New story every month",
            "Same hero — your child",
            "Digital + printed copy",
            "Cancel anytime",
        ],
        highlight: false,
        badge: Some("Most Popular"),
    },
];

/// Monthly add-on for a new adventure every month.
pub const SUBSCRIPTION_ADDON_CENTS: u32 = 999;

/// "+$9.99/mo", as offered next to the subscribe toggle.
pub fn subscription_addon_label() -> String {
    format!("+{}", price_label(SUBSCRIPTION_ADDON_CENTS, true))
}

fn price_label(cents: u32, recurring: bool) -> String {
    let base = format!("${}.{:02}", cents / 100, cents % 100);
    if recurring {
        format!("{base}/mo")
    } else {
        base
    }
}

pub fn plan_for(format: DeliveryFormat) -> &'static Plan {
    match format {
        DeliveryFormat::Digital => &PLANS[0],
        DeliveryFormat::Print => &PLANS[1],
        DeliveryFormat::Both => &PLANS[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_is_the_default_format() {
        assert_eq!(DeliveryFormat::default(), DeliveryFormat::Print);
    }

    #[test]
    fn shipping_needed_for_physical_formats() {
        assert!(!DeliveryFormat::Digital.needs_shipping());
        assert!(DeliveryFormat::Print.needs_shipping());
        assert!(DeliveryFormat::Both.needs_shipping());
    }

    #[test]
    fn price_labels() {
        assert_eq!(plan_for(DeliveryFormat::Digital).price_label(), "$9.99");
        assert_eq!(plan_for(DeliveryFormat::Print).price_label(), "$29.99");
        assert_eq!(plan_for(DeliveryFormat::Both).price_label(), "$19.99/mo");
        assert_eq!(subscription_addon_label(), "+$9.99/mo");
    }

    #[test]
    fn plan_table_matches_formats() {
        for plan in &PLANS {
            assert_eq!(plan_for(plan.format), plan);
        }
    }
}

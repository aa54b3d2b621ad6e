//! Checkout: order form validation and submission.

use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::core::orders::{OrderError, OrderService};
use crate::core::session::{SessionEvent, SessionStore, Step};
use crate::schema::order::{DeliveryFormat, OrderDetails, ShippingAddress};

/// A form field that can carry a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderField {
    Email,
    Line1,
    City,
    Zip,
}

impl OrderField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Line1 => "line1",
            Self::City => "city",
            Self::Zip => "zip",
        }
    }
}

/// Field-keyed messages shown inline next to each input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: FxHashMap<OrderField, &'static str>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: OrderField) -> Option<&'static str> {
        self.fields.get(&field).copied()
    }

    pub fn contains(&self, field: OrderField) -> bool {
        self.fields.contains_key(&field)
    }

    /// Fields with errors, in form order.
    pub fn fields(&self) -> Vec<OrderField> {
        let mut fields: Vec<_> = self.fields.keys().copied().collect();
        fields.sort();
        fields
    }

    fn insert(&mut self, field: OrderField, message: &'static str) {
        self.fields.insert(field, message);
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .fields()
            .into_iter()
            .map(|field| format!("{}: {}", field.key(), self.fields[&field]))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid order: {0}")]
    Invalid(ValidationErrors),
    #[error("there is no story to order")]
    NoStory,
    #[error("order submission failed: {0}")]
    Order(#[from] OrderError),
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// The checkout screen's in-progress answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderForm {
    pub format: DeliveryFormat,
    pub email: String,
    pub subscribe_monthly: bool,
    pub address: ShippingAddress,
}

impl Default for OrderForm {
    fn default() -> Self {
        Self {
            format: DeliveryFormat::default(),
            email: String::new(),
            subscribe_monthly: false,
            address: ShippingAddress {
                country: "US".to_string(),
                ..ShippingAddress::default()
            },
        }
    }
}

impl OrderForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every field, collecting all problems at once.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        if !is_valid_email(&self.email) {
            errors.insert(OrderField::Email, "Valid email required");
        }
        if self.format.needs_shipping() {
            if self.address.line1.trim().is_empty() {
                errors.insert(OrderField::Line1, "Address required");
            }
            if self.address.city.trim().is_empty() {
                errors.insert(OrderField::City, "City required");
            }
            if self.address.zip.trim().is_empty() {
                errors.insert(OrderField::Zip, "ZIP / Postcode required");
            }
        }
        errors
    }

    /// The order this form describes, if it is valid. The address is
    /// attached only for formats that ship.
    pub fn to_order(&self) -> Result<OrderDetails, ValidationErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(OrderDetails {
            format: self.format,
            email: self.email.trim().to_string(),
            subscribe_monthly: self.subscribe_monthly,
            shipping: self.format.needs_shipping().then(|| self.address.clone()),
        })
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub order: OrderDetails,
    /// Fulfilment id, present when a physical copy was ordered.
    pub order_id: Option<String>,
}

/// Validate `form` and place the order.
///
/// For formats that ship, the print backend is called first; an invalid
/// form or a failed submission dispatches nothing. On success SET_ORDER
/// and SET_STEP(confirmation) are dispatched together, so the session
/// only holds an order once it is on the confirmation screen.
pub async fn submit_order<S>(
    store: &SessionStore,
    service: &S,
    form: &OrderForm,
) -> Result<Confirmation, CheckoutError>
where
    S: OrderService + ?Sized,
{
    let order = form.to_order().map_err(CheckoutError::Invalid)?;
    let story_id = store
        .snapshot()
        .story
        .map(|s| s.id)
        .ok_or(CheckoutError::NoStory)?;

    let order_id = if order.format.needs_shipping() {
        match service.submit_order(&order, &story_id).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(%story_id, error = %e, "print order failed");
                return Err(e.into());
            }
        }
    } else {
        None
    };

    store.dispatch(SessionEvent::SetOrder(order.clone()));
    store.dispatch(SessionEvent::SetStep(Step::Confirmation));
    tracing::info!(%story_id, format = ?order.format, "order placed");
    Ok(Confirmation { order, order_id })
}

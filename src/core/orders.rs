//! Order submission boundary for printed books.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::schema::order::{DeliveryFormat, OrderDetails};

#[derive(Debug, Error)]
pub enum OrderError {
    #[cfg(not(target_arch = "wasm32"))]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("order backend returned status {0}")]
    Status(u16),
}

/// The order as the print backend reads it: address fields sit beside
/// the format and email, and are omitted for digital orders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderBody<'a> {
    format: DeliveryFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    address_line1: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address_line2: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zip: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<&'a str>,
    email: &'a str,
    subscribe_monthly: bool,
}

impl<'a> From<&'a OrderDetails> for OrderBody<'a> {
    fn from(order: &'a OrderDetails) -> Self {
        let address = order.shipping.as_ref();
        Self {
            format: order.format,
            address_line1: address.map(|a| a.line1.as_str()),
            address_line2: address
                .map(|a| a.line2.as_str())
                .filter(|line| !line.is_empty()),
            city: address.map(|a| a.city.as_str()),
            state: address.map(|a| a.state.as_str()),
            zip: address.map(|a| a.zip.as_str()),
            country: address.map(|a| a.country.as_str()),
            email: &order.email,
            subscribe_monthly: order.subscribe_monthly,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderSubmission<'a> {
    order: OrderBody<'a>,
    story_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderReceipt {
    #[serde(rename = "printfulOrderId")]
    order_id: String,
}

/// Print fulfilment backend. Returns an opaque confirmation id.
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn submit_order(&self, order: &OrderDetails, story_id: &str)
        -> Result<String, OrderError>;
}

#[derive(Debug, Clone, Default)]
pub struct StubOrderService {
    latency: Duration,
}

impl StubOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    /// `PF-STUB-` followed by the last six characters of the story id,
    /// upper-cased.
    pub fn confirmation_id(story_id: &str) -> String {
        let chars: Vec<char> = story_id.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(6)..].iter().collect();
        format!("PF-STUB-{}", tail.to_uppercase())
    }
}

#[async_trait]
impl OrderService for StubOrderService {
    async fn submit_order(
        &self,
        _order: &OrderDetails,
        story_id: &str,
    ) -> Result<String, OrderError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(Self::confirmation_id(story_id))
    }
}

/// JSON-over-HTTP backend: `POST {base}/orders`.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct HttpOrderService {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(not(target_arch = "wasm32"))]
impl HttpOrderService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl OrderService for HttpOrderService {
    async fn submit_order(
        &self,
        order: &OrderDetails,
        story_id: &str,
    ) -> Result<String, OrderError> {
        let url = format!("{}/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&OrderSubmission {
                order: order.into(),
                story_id,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(%url, status, "order backend rejected order");
            return Err(OrderError::Status(status));
        }
        let receipt: OrderReceipt = response.json().await?;
        Ok(receipt.order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::order::ShippingAddress;

    #[test]
    fn stub_confirmation_id() {
        assert_eq!(
            StubOrderService::confirmation_id("story-1a2b3c4d"),
            "PF-STUB-2B3C4D"
        );
        assert_eq!(StubOrderService::confirmation_id("ab"), "PF-STUB-AB");
    }

    #[tokio::test]
    async fn stub_submits() {
        let order = OrderDetails {
            format: DeliveryFormat::Digital,
            email: "a@b.co".to_string(),
            subscribe_monthly: false,
            shipping: None,
        };
        let id = StubOrderService::new()
            .submit_order(&order, "story-abcdef")
            .await
            .unwrap();
        assert_eq!(id, "PF-STUB-ABCDEF");
    }

    #[test]
    fn submission_body_shape() {
        let order = OrderDetails {
            format: DeliveryFormat::Print,
            email: "a@b.co".to_string(),
            subscribe_monthly: true,
            shipping: None,
        };
        let body = serde_json::to_value(OrderSubmission {
            order: (&order).into(),
            story_id: "story-1",
        })
        .unwrap();
        assert_eq!(body["storyId"], "story-1");
        assert_eq!(body["order"]["format"], "print");
        assert_eq!(body["order"]["subscribeMonthly"], true);
        assert!(body["order"].get("addressLine1").is_none());
    }

    #[test]
    fn shipping_address_is_flattened_into_order() {
        let order = OrderDetails {
            format: DeliveryFormat::Both,
            email: "a@b.co".to_string(),
            subscribe_monthly: false,
            shipping: Some(ShippingAddress {
                line1: "1 Main St".to_string(),
                line2: String::new(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip: "62701".to_string(),
                country: "US".to_string(),
            }),
        };
        let body = serde_json::to_value(OrderSubmission {
            order: (&order).into(),
            story_id: "story-1",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "order": {
                    "format": "both",
                    "addressLine1": "1 Main St",
                    "city": "Springfield",
                    "state": "IL",
                    "zip": "62701",
                    "country": "US",
                    "email": "a@b.co",
                    "subscribeMonthly": false
                },
                "storyId": "story-1"
            })
        );
    }

    #[test]
    fn receipt_reads_fulfilment_id() {
        let receipt: OrderReceipt =
            serde_json::from_str(r#"{"printfulOrderId":"PF-1042"}"#).unwrap();
        assert_eq!(receipt.order_id, "PF-1042");
    }
}

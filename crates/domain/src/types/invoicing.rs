//! Invoice request/response messages carried by the invoicing fabric
//!
//! Both messages travel as UTF-8 JSON. `correlation_id` and `invoice_id` are
//! opaque to the fabric and echoed verbatim from request to response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IntegrationId, JsonMap};
use crate::impl_wire_enum_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceOperation {
    Create,
    Retry,
}

impl_wire_enum_conversions!(InvoiceOperation {
    Create => "create",
    Retry => "retry",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Success,
    Error,
}

impl_wire_enum_conversions!(InvoiceStatus {
    Success => "success",
    Error => "error",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub invoice_id: u64,
    pub provider: String,
    pub operation: InvoiceOperation,
    pub invoice_data: InvoiceData,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
}

impl InvoiceRequest {
    /// Provider name as used in queue names.
    pub fn provider_key(&self) -> String {
        self.provider.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    pub integration_id: IntegrationId,
    pub customer: InvoiceCustomer,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    pub total: f64,
    pub subtotal: f64,
    pub tax: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub shipping_cost: f64,
    pub currency: String,
    pub order_id: String,
    #[serde(default)]
    pub config: JsonMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCustomer {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub dni: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub sku: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    #[serde(default)]
    pub discount: f64,
}

/// One captured vendor HTTP exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub request_url: String,
    pub request_payload: String,
    pub response_status: u16,
    pub response_body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub invoice_id: u64,
    pub provider: String,
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub audit_request_url: String,
    #[serde(default)]
    pub audit_request_payload: String,
    #[serde(default)]
    pub audit_response_status: u16,
    #[serde(default)]
    pub audit_response_body: String,
}

impl InvoiceResponse {
    /// Error response echoing the request identifiers.
    pub fn error(
        invoice_id: u64,
        provider: impl Into<String>,
        correlation_id: impl Into<String>,
        error_code: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            invoice_id,
            provider: provider.into(),
            status: InvoiceStatus::Error,
            invoice_number: None,
            external_id: None,
            issued_at: None,
            error: Some(message.into()),
            error_code: Some(error_code.to_string()),
            correlation_id: correlation_id.into(),
            timestamp: Utc::now(),
            processing_time_ms: 0,
            audit_request_url: String::new(),
            audit_request_payload: String::new(),
            audit_response_status: 0,
            audit_response_body: String::new(),
        }
    }

    /// Error response for a parsed request.
    pub fn error_for(request: &InvoiceRequest, error_code: &str, message: impl Into<String>) -> Self {
        Self::error(
            request.invoice_id,
            request.provider.clone(),
            request.correlation_id.clone(),
            error_code,
            message,
        )
    }

    /// Success response for a parsed request.
    pub fn success_for(request: &InvoiceRequest) -> Self {
        Self {
            status: InvoiceStatus::Success,
            error: None,
            error_code: None,
            ..Self::error_for(request, "", "")
        }
    }

    pub fn with_audit(mut self, audit: Option<&AuditRecord>) -> Self {
        if let Some(audit) = audit {
            self.audit_request_url.clone_from(&audit.request_url);
            self.audit_request_payload.clone_from(&audit.request_payload);
            self.audit_response_status = audit.response_status;
            self.audit_response_body.clone_from(&audit.response_body);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == InvoiceStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_json() -> serde_json::Value {
        serde_json::json!({
            "invoice_id": 42,
            "provider": "Factus",
            "operation": "create",
            "invoice_data": {
                "integration_id": 9,
                "customer": { "name": "Ana", "email": "ana@example.com", "phone": "300", "dni": "123" },
                "items": [{
                    "sku": "SKU-1", "name": "Coffee", "quantity": 2.0,
                    "unit_price": 10.0, "total_price": 20.0, "tax": 3.8, "tax_rate": 19.0, "discount": 0.0
                }],
                "total": 23.8, "subtotal": 20.0, "tax": 3.8, "discount": 0.0,
                "shipping_cost": 0.0, "currency": "COP", "order_id": "A-1",
                "config": { "numbering_range_id": 8 }
            },
            "correlation_id": "c-42",
            "timestamp": "2024-05-01T12:00:00Z"
        })
    }

    #[test]
    fn request_parses_wire_schema() {
        let request: InvoiceRequest = serde_json::from_value(request_json()).unwrap();
        assert_eq!(request.operation, InvoiceOperation::Create);
        assert_eq!(request.provider_key(), "factus");
        assert_eq!(request.invoice_data.items[0].tax_rate, Some(19.0));
        assert_eq!(request.invoice_data.config["numbering_range_id"], 8);
    }

    #[test]
    fn error_response_echoes_identifiers() {
        let request: InvoiceRequest = serde_json::from_value(request_json()).unwrap();
        let response = InvoiceResponse::error_for(&request, "integration_not_found", "missing");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["correlation_id"], "c-42");
        assert_eq!(json["invoice_id"], 42);
        assert_eq!(json["error_code"], "integration_not_found");
        assert!(json.get("invoice_number").is_none());
    }

    #[test]
    fn success_response_has_no_error_fields() {
        let request: InvoiceRequest = serde_json::from_value(request_json()).unwrap();
        let audit = AuditRecord {
            request_url: "https://vendor/bills".into(),
            request_payload: "{}".into(),
            response_status: 201,
            response_body: "{\"ok\":true}".into(),
        };
        let response = InvoiceResponse::success_for(&request).with_audit(Some(&audit));

        assert!(response.is_success());
        assert_eq!(response.error_code, None);
        assert_eq!(response.audit_response_status, 201);
    }
}

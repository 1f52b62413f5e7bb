//! Mercado Pago REST API payloads.
//!
//! Only the fields the reconciliation pipeline reads are modelled. Ids
//! arrive as numbers on some endpoints and strings on others, so they are
//! normalized to strings on the way in.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ports::{
    MerchantOrderPayment, MerchantOrderRecord, PaymentRecord, Preference, PreferenceRequest,
};

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `GET /v1/payments/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct MpPayment {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub status: Option<String>,
    pub status_detail: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub external_reference: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub preference_id: Option<String>,
    pub order: Option<MpPaymentOrder>,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub transaction_amount: Option<f64>,
    pub currency_id: Option<String>,
}

/// Parent merchant order reference on a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct MpPaymentOrder {
    #[serde(default, deserialize_with = "opt_id_string")]
    pub id: Option<String>,
}

impl From<MpPayment> for PaymentRecord {
    fn from(p: MpPayment) -> Self {
        // Some integrations carry the preference id only in metadata.
        let preference_id = p.preference_id.or_else(|| {
            p.metadata
                .as_ref()
                .and_then(|m| m.get("preference_id"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });
        PaymentRecord {
            id: p.id,
            status: p.status,
            status_detail: p.status_detail,
            external_reference: p.external_reference,
            preference_id,
            merchant_order_id: p.order.and_then(|o| o.id),
            transaction_amount: p.transaction_amount,
            currency_id: p.currency_id,
        }
    }
}

/// `GET /merchant_orders/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct MpMerchantOrder {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub preference_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payments: Vec<MpMerchantOrderPayment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MpMerchantOrderPayment {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub status: Option<String>,
}

impl From<MpMerchantOrder> for MerchantOrderRecord {
    fn from(mo: MpMerchantOrder) -> Self {
        MerchantOrderRecord {
            id: mo.id,
            preference_id: mo.preference_id,
            external_reference: mo.external_reference,
            payments: mo
                .payments
                .into_iter()
                .map(|p| MerchantOrderPayment {
                    id: p.id,
                    status: p.status,
                })
                .collect(),
        }
    }
}

/// `GET /merchant_orders/search`
#[derive(Debug, Clone, Deserialize)]
pub struct MpMerchantOrderSearch {
    #[serde(default)]
    pub elements: Vec<MpMerchantOrder>,
}

/// `POST /checkout/preferences` body.
#[derive(Debug, Clone, Serialize)]
pub struct MpPreferenceBody {
    pub items: Vec<MpPreferenceItem>,
    pub external_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<MpPayer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_urls: Option<MpBackUrls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_return: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpPreferenceItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub currency_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpPayer {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpBackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

impl From<PreferenceRequest> for MpPreferenceBody {
    fn from(req: PreferenceRequest) -> Self {
        let auto_return = req.back_urls.as_ref().map(|_| "approved");
        MpPreferenceBody {
            items: req
                .items
                .into_iter()
                .map(|i| MpPreferenceItem {
                    id: i.id,
                    title: i.title,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    currency_id: i.currency_id,
                })
                .collect(),
            external_reference: req.external_reference,
            payer: req.payer_email.map(|email| MpPayer { email }),
            notification_url: req.notification_url,
            back_urls: req.back_urls.map(|b| MpBackUrls {
                success: b.success,
                failure: b.failure,
                pending: b.pending,
            }),
            auto_return,
        }
    }
}

/// `POST /checkout/preferences` response.
#[derive(Debug, Clone, Deserialize)]
pub struct MpPreference {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
}

impl From<MpPreference> for Preference {
    fn from(p: MpPreference) -> Self {
        Preference {
            id: p.id,
            init_point: p.init_point,
            sandbox_init_point: p.sandbox_init_point,
        }
    }
}

/// Error body returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MpErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{BackUrls, PreferenceItem};
    use serde_json::json;

    #[test]
    fn payment_with_numeric_ids_decodes() {
        let raw = json!({
            "id": 123456789,
            "status": "approved",
            "status_detail": "accredited",
            "external_reference": "NRN-1",
            "order": {"id": 987, "type": "mercadopago"},
            "transaction_amount": 1500.5,
            "currency_id": "ARS"
        });
        let record: PaymentRecord = serde_json::from_value::<MpPayment>(raw).unwrap().into();
        assert_eq!(record.id, "123456789");
        assert_eq!(record.merchant_order_id.as_deref(), Some("987"));
        assert_eq!(record.external_reference.as_deref(), Some("NRN-1"));
    }

    #[test]
    fn preference_id_falls_back_to_metadata() {
        let raw = json!({
            "id": "1",
            "status": "pending",
            "metadata": {"preference_id": "pref_9"}
        });
        let record: PaymentRecord = serde_json::from_value::<MpPayment>(raw).unwrap().into();
        assert_eq!(record.preference_id.as_deref(), Some("pref_9"));
    }

    #[test]
    fn blank_external_reference_is_absent() {
        let raw = json!({"id": "1", "external_reference": ""});
        let payment: MpPayment = serde_json::from_value(raw).unwrap();
        assert!(payment.external_reference.is_none());
    }

    #[test]
    fn merchant_order_search_tolerates_missing_payments() {
        let raw = json!({"elements": [{"id": 5, "preference_id": "pref123"}]});
        let search: MpMerchantOrderSearch = serde_json::from_value(raw).unwrap();
        let mo: MerchantOrderRecord = search.elements[0].clone().into();
        assert!(mo.payments.is_empty());
        assert_eq!(mo.preference_id.as_deref(), Some("pref123"));
    }

    #[test]
    fn preference_body_sets_auto_return_with_back_urls() {
        let body: MpPreferenceBody = PreferenceRequest {
            external_reference: "NRN-1".into(),
            items: vec![PreferenceItem {
                id: Some("sku-1".into()),
                title: "Pantalla".into(),
                quantity: 2,
                unit_price: 100.0,
                currency_id: "ARS".into(),
            }],
            payer_email: Some("a@b.c".into()),
            notification_url: None,
            back_urls: Some(BackUrls {
                success: "https://x/success".into(),
                failure: "https://x/failure".into(),
                pending: "https://x/pending".into(),
            }),
        }
        .into();
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["auto_return"], "approved");
        assert_eq!(value["payer"]["email"], "a@b.c");
        assert!(value.get("notification_url").is_none());
    }
}

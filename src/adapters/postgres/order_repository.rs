//! PostgreSQL implementation of OrderRepository.
//!
//! English status vocabulary; snapshot, payload and audit log are JSONB.

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::order::{
    AuditEntry, IdentifierField, Order, OrderPayload, ShippingStatus, StatusVocabulary,
    WebhookSnapshot,
};
use crate::ports::{OrderFilter, OrderRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

const VOCABULARY: StatusVocabulary = StatusVocabulary::English;

const SELECT_COLUMNS: &str = r#"
    SELECT id, order_number, preference_id, external_reference, payment_status,
           payment_id, merchant_order_id, last_mp_webhook, shipping_status,
           tracking, carrier, shipping_note, payload, inventory_applied, is_stub,
           audit_log, created_at, updated_at, deleted_at
    FROM orders
"#;

/// PostgreSQL implementation of the OrderRepository port.
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an order.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: Option<String>,
    preference_id: Option<String>,
    external_reference: Option<String>,
    payment_status: String,
    payment_id: Option<String>,
    merchant_order_id: Option<String>,
    last_mp_webhook: Option<Value>,
    shipping_status: String,
    tracking: Option<String>,
    carrier: Option<String>,
    shipping_note: Option<String>,
    payload: Value,
    inventory_applied: bool,
    is_stub: bool,
    audit_log: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let last_mp_webhook: Option<WebhookSnapshot> = row
            .last_mp_webhook
            .map(|v| from_json("last_mp_webhook", v))
            .transpose()?;
        let payload: OrderPayload = from_json("payload", row.payload)?;
        let audit_log: Vec<AuditEntry> = from_json("audit_log", row.audit_log)?;
        let shipping_status = ShippingStatus::parse(&row.shipping_status).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid shipping_status: {}", e))
        })?;

        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            preference_id: row.preference_id,
            external_reference: row.external_reference,
            payment_status: VOCABULARY.decode(&row.payment_status),
            payment_id: row.payment_id,
            merchant_order_id: row.merchant_order_id,
            last_mp_webhook,
            shipping_status,
            tracking: row.tracking,
            carrier: row.carrier,
            shipping_note: row.shipping_note,
            payload,
            inventory_applied: row.inventory_applied,
            is_stub: row.is_stub,
            audit_log,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            deleted_at: row.deleted_at.map(Timestamp::from_datetime),
        })
    }
}

fn from_json<T: serde::de::DeserializeOwned>(column: &str, value: Value) -> Result<T, DomainError> {
    serde_json::from_value(value).map_err(|e| {
        DomainError::new(
            ErrorCode::SerializationError,
            format!("Invalid {} column: {}", column, e),
        )
    })
}

fn to_json<T: serde::Serialize>(column: &str, value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value).map_err(|e| {
        DomainError::new(
            ErrorCode::SerializationError,
            format!("Cannot encode {} column: {}", column, e),
        )
    })
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

/// Encoded JSONB columns of an order.
struct JsonColumns {
    snapshot: Option<Value>,
    payload: Value,
    audit_log: Value,
}

impl JsonColumns {
    fn encode(order: &Order) -> Result<Self, DomainError> {
        Ok(Self {
            snapshot: order
                .last_mp_webhook
                .as_ref()
                .map(|s| to_json("last_mp_webhook", s))
                .transpose()?,
            payload: to_json("payload", &order.payload)?,
            audit_log: to_json("audit_log", &order.audit_log)?,
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    fn vocabulary(&self) -> StatusVocabulary {
        VOCABULARY
    }

    async fn find_by(
        &self,
        field: IdentifierField,
        value: &str,
    ) -> Result<Option<Order>, DomainError> {
        // Column names come from a closed enum, never from input.
        let sql = format!(
            "{} WHERE {} = $1 ORDER BY created_at ASC LIMIT 1",
            SELECT_COLUMNS,
            field.column()
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn insert(&self, order: &Order) -> Result<(), DomainError> {
        let json = JsonColumns::encode(order)?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, preference_id, external_reference, payment_status,
                payment_id, merchant_order_id, last_mp_webhook, shipping_status,
                tracking, carrier, shipping_note, payload, inventory_applied, is_stub,
                audit_log, created_at, updated_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.preference_id)
        .bind(&order.external_reference)
        .bind(VOCABULARY.encode(order.payment_status))
        .bind(&order.payment_id)
        .bind(&order.merchant_order_id)
        .bind(json.snapshot)
        .bind(order.shipping_status.as_str())
        .bind(&order.tracking)
        .bind(&order.carrier)
        .bind(&order.shipping_note)
        .bind(json.payload)
        .bind(order.inventory_applied)
        .bind(order.is_stub)
        .bind(json.audit_log)
        .bind(*order.created_at.as_datetime())
        .bind(*order.updated_at.as_datetime())
        .bind(order.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return DomainError::new(
                        ErrorCode::DuplicateOrder,
                        format!("Order {} already exists", order.id),
                    )
                    .with_detail("constraint", db_err.constraint().unwrap_or_default());
                }
            }
            db_error("insert order", e)
        })?;

        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<(), DomainError> {
        let json = JsonColumns::encode(order)?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                order_number = $2,
                preference_id = $3,
                external_reference = $4,
                payment_status = $5,
                payment_id = $6,
                merchant_order_id = $7,
                last_mp_webhook = $8,
                shipping_status = $9,
                tracking = $10,
                carrier = $11,
                shipping_note = $12,
                inventory_applied = $13,
                is_stub = $14,
                audit_log = $15,
                updated_at = $16,
                deleted_at = $17
            WHERE id = $1
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.preference_id)
        .bind(&order.external_reference)
        .bind(VOCABULARY.encode(order.payment_status))
        .bind(&order.payment_id)
        .bind(&order.merchant_order_id)
        .bind(json.snapshot)
        .bind(order.shipping_status.as_str())
        .bind(&order.tracking)
        .bind(&order.carrier)
        .bind(&order.shipping_note)
        .bind(order.inventory_applied)
        .bind(order.is_stub)
        .bind(json.audit_log)
        .bind(*order.updated_at.as_datetime())
        .bind(order.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update order", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::OrderNotFound,
                format!("Order {} not found", order.id),
            ));
        }

        Ok(())
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let sql = format!(
            "{} WHERE ($1::text IS NULL OR payment_status = $1)
                AND ($2::timestamptz IS NULL OR created_at >= $2)
                AND ($3 OR deleted_at IS NULL)
              ORDER BY created_at DESC
              LIMIT $4",
            SELECT_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(filter.payment_status.map(|s| VOCABULARY.encode(s)))
            .bind(filter.created_since.as_ref().map(|t| *t.as_datetime()))
            .bind(filter.include_deleted)
            .bind(filter.limit.map(|l| l as i64))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list orders", e))?;

        rows.into_iter().map(Order::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::PaymentStatus;
    use serde_json::json;

    fn row() -> OrderRow {
        let now = Utc::now();
        OrderRow {
            id: "NRN-1".into(),
            order_number: Some("NRN-1".into()),
            preference_id: Some("pref_1".into()),
            external_reference: Some("NRN-1".into()),
            payment_status: "approved".into(),
            payment_id: Some("123".into()),
            merchant_order_id: None,
            last_mp_webhook: Some(json!({
                "topic": "payment",
                "id": "123",
                "status": "approved",
                "at": "2024-03-01T12:00:00Z"
            })),
            shipping_status: "shipped".into(),
            tracking: Some("1Z999".into()),
            carrier: None,
            shipping_note: None,
            payload: json!({"items": [{"id": "p1"}], "total": 1500.0}),
            inventory_applied: true,
            is_stub: false,
            audit_log: json!([]),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn row_converts_to_order() {
        let order = Order::try_from(row()).unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Approved);
        assert_eq!(order.shipping_status, ShippingStatus::Shipped);
        assert_eq!(order.payload.total, Some(1500.0));
        assert_eq!(
            order.last_mp_webhook.map(|s| s.status),
            Some(PaymentStatus::Approved)
        );
    }

    #[test]
    fn corrupt_snapshot_is_a_serialization_error() {
        let mut bad = row();
        bad.last_mp_webhook = Some(json!("not an object"));
        let err = Order::try_from(bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::SerializationError);
    }

    #[test]
    fn unknown_shipping_status_is_rejected() {
        let mut bad = row();
        bad.shipping_status = "teleported".into();
        assert!(Order::try_from(bad).is_err());
    }

    #[test]
    fn json_columns_encode_order_parts() {
        let order = Order::try_from(row()).unwrap();
        let json = JsonColumns::encode(&order).unwrap();
        assert_eq!(json.snapshot.unwrap()["status"], "approved");
        assert_eq!(json.payload["total"], 1500.0);
    }
}

//! File-based Order Store Adapter
//!
//! Keeps every order in a single JSON document (`{"orders": [...]}`) using
//! the storefront's Spanish field names and status words. Each write
//! rewrites the whole document through a temporary file and a rename.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::order::{
    AuditEntry, IdentifierField, Order, OrderPayload, ShippingStatus, StatusVocabulary,
    WebhookSnapshot,
};
use crate::ports::{OrderFilter, OrderRepository};

const VOCABULARY: StatusVocabulary = StatusVocabulary::Spanish;

#[derive(Debug, Default, Serialize, Deserialize)]
struct OrdersDocument {
    #[serde(default)]
    orders: Vec<StoredOrder>,
}

/// On-disk order record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredOrder {
    id: String,
    #[serde(default)]
    order_number: Option<String>,
    #[serde(default)]
    preference_id: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(alias = "payment_status", default = "default_estado_pago")]
    estado_pago: String,
    #[serde(default)]
    payment_id: Option<String>,
    #[serde(default)]
    merchant_order_id: Option<String>,
    #[serde(default)]
    last_mp_webhook: Option<WebhookSnapshot>,
    #[serde(alias = "shipping_status", default = "default_estado_envio")]
    estado_envio: String,
    #[serde(default)]
    tracking: Option<String>,
    #[serde(default)]
    carrier: Option<String>,
    #[serde(default)]
    shipping_note: Option<String>,
    #[serde(default)]
    cliente: Option<Value>,
    #[serde(default)]
    productos: Vec<Value>,
    #[serde(default)]
    direccion_envio: Option<Value>,
    #[serde(default)]
    total: Option<f64>,
    #[serde(default)]
    moneda: Option<String>,
    #[serde(rename = "inventoryApplied", default)]
    inventory_applied: bool,
    #[serde(default)]
    is_stub: bool,
    #[serde(default)]
    audit_log: Vec<AuditEntry>,
    #[serde(rename = "fecha", default)]
    created_at: Timestamp,
    #[serde(default)]
    updated_at: Timestamp,
    #[serde(default)]
    deleted_at: Option<Timestamp>,
}

fn default_estado_pago() -> String {
    VOCABULARY.encode(Default::default()).to_string()
}

fn default_estado_envio() -> String {
    ShippingStatus::default().as_spanish().to_string()
}

impl From<&Order> for StoredOrder {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            order_number: order.order_number.clone(),
            preference_id: order.preference_id.clone(),
            external_reference: order.external_reference.clone(),
            estado_pago: VOCABULARY.encode(order.payment_status).to_string(),
            payment_id: order.payment_id.clone(),
            merchant_order_id: order.merchant_order_id.clone(),
            last_mp_webhook: order.last_mp_webhook.clone(),
            estado_envio: order.shipping_status.as_spanish().to_string(),
            tracking: order.tracking.clone(),
            carrier: order.carrier.clone(),
            shipping_note: order.shipping_note.clone(),
            cliente: order.payload.customer.clone(),
            productos: order.payload.items.clone(),
            direccion_envio: order.payload.shipping_address.clone(),
            total: order.payload.total,
            moneda: order.payload.currency.clone(),
            inventory_applied: order.inventory_applied,
            is_stub: order.is_stub,
            audit_log: order.audit_log.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
            deleted_at: order.deleted_at,
        }
    }
}

impl From<StoredOrder> for Order {
    fn from(stored: StoredOrder) -> Self {
        let shipping_status = ShippingStatus::parse(&stored.estado_envio).unwrap_or_else(|_| {
            tracing::warn!(
                order_id = %stored.id,
                estado_envio = %stored.estado_envio,
                "Unreadable shipping status, treating as preparing"
            );
            ShippingStatus::Preparing
        });
        Order {
            payment_status: VOCABULARY.decode(&stored.estado_pago),
            shipping_status,
            id: stored.id,
            order_number: stored.order_number,
            preference_id: stored.preference_id,
            external_reference: stored.external_reference,
            payment_id: stored.payment_id,
            merchant_order_id: stored.merchant_order_id,
            last_mp_webhook: stored.last_mp_webhook,
            tracking: stored.tracking,
            carrier: stored.carrier,
            shipping_note: stored.shipping_note,
            payload: OrderPayload {
                customer: stored.cliente,
                items: stored.productos,
                shipping_address: stored.direccion_envio,
                total: stored.total,
                currency: stored.moneda,
            },
            inventory_applied: stored.inventory_applied,
            is_stub: stored.is_stub,
            audit_log: stored.audit_log,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            deleted_at: stored.deleted_at,
        }
    }
}

/// File-based order store
#[derive(Debug)]
pub struct FileOrderStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileOrderStore {
    /// Create a store backed by the document at `path`
    ///
    /// # Example
    /// ```ignore
    /// let store = FileOrderStore::new("./data/orders.json");
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<StoredOrder>, DomainError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error("read", &self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let document: OrdersDocument = serde_json::from_str(&raw).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("Failed to parse {}: {}", self.path.display(), e),
            )
        })?;
        Ok(document.orders)
    }

    async fn save(&self, orders: Vec<StoredOrder>) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("create directory for", &self.path, e))?;
        }
        let json = serde_json::to_string_pretty(&OrdersDocument { orders }).map_err(|e| {
            DomainError::new(ErrorCode::SerializationError, e.to_string())
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| storage_error("write", &tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error("replace", &self.path, e))?;
        Ok(())
    }
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> DomainError {
    DomainError::new(
        ErrorCode::StorageError,
        format!("Failed to {} {}: {}", action, path.display(), err),
    )
}

#[async_trait]
impl OrderRepository for FileOrderStore {
    fn vocabulary(&self) -> StatusVocabulary {
        VOCABULARY
    }

    async fn find_by(
        &self,
        field: IdentifierField,
        value: &str,
    ) -> Result<Option<Order>, DomainError> {
        let _guard = self.lock.lock().await;
        let found = self
            .load()
            .await?
            .into_iter()
            .map(Order::from)
            .find(|order| order.matches(field, value));
        Ok(found)
    }

    async fn insert(&self, order: &Order) -> Result<(), DomainError> {
        let _guard = self.lock.lock().await;
        let mut orders = self.load().await?;
        if orders.iter().any(|stored| stored.id == order.id) {
            return Err(DomainError::new(
                ErrorCode::DuplicateOrder,
                format!("Order {} already exists", order.id),
            ));
        }
        orders.push(StoredOrder::from(order));
        self.save(orders).await
    }

    async fn update(&self, order: &Order) -> Result<(), DomainError> {
        let _guard = self.lock.lock().await;
        let mut orders = self.load().await?;
        let slot = orders
            .iter_mut()
            .find(|stored| stored.id == order.id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::OrderNotFound, format!("Order {} not found", order.id))
            })?;
        *slot = StoredOrder::from(order);
        self.save(orders).await
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let _guard = self.lock.lock().await;
        let mut orders: Vec<Order> = self
            .load()
            .await?
            .into_iter()
            .map(Order::from)
            .filter(|order| filter.accepts(order))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            orders.truncate(limit);
        }
        Ok(orders)
    }
}

//! Order domain: the aggregate, its status vocabularies and identifier
//! resolution rules.

mod aggregate;
mod identifier;
mod payment_status;
mod shipping_status;

pub use aggregate::{
    generate_order_number, AuditAction, AuditEntry, ChangeSource, EditOutcome, Order, OrderEdit,
    OrderPayload, PaymentTransition, PaymentUpdate, ReconcileMode, WebhookSnapshot,
    AUDIT_LOG_LIMIT, EDITABLE_FIELDS,
};
pub use identifier::{
    admin_plan, resolution_plan, IdentifierField, LookupStep, OrderIdentifiers,
};
pub use payment_status::{PaymentStatus, ProviderOutcome, StatusVocabulary, PROVIDER_STATUS_TABLE};
pub use shipping_status::ShippingStatus;

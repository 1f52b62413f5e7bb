//! Webhook domain: signature verification, payload normalization and the
//! notification error taxonomy.

mod errors;
mod notification;
mod signature;

pub use errors::WebhookError;
pub use notification::{
    id_from_resource, normalize, parse_body, Notification, NotificationKind, RawNotification,
    DEFAULT_TOPIC,
};
pub use signature::{compute_signature, SignatureCheck, SignatureVerifier, SIGNATURE_HEADER};

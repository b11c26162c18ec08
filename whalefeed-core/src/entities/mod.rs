pub mod payload;
pub mod transfer;

pub use payload::{BlockDescriptor, MalformedPayload, RawTransfer, WebhookPayload};
pub use transfer::{NormalizeError, TransferEvent};

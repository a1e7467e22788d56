mod order_codes;
mod order_locks;
mod webhook_verifier;

pub use order_codes::OrderCodeGenerator;
pub use order_locks::{OrderLockGuard, OrderLocks};
pub use webhook_verifier::{VerifiedEvent, WebhookVerificationError, WebhookVerifier};

pub mod helpers;
mod secret;
pub mod signature;

pub use secret::Secret;
pub use signature::{calculate_signature, canonical_data, verify_signature, SignatureError};

/// PayOS settles in Vietnamese Dong, which has no minor units.
pub const SETTLEMENT_CURRENCY: &str = "VND";

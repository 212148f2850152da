mod order_number;
mod reference;
mod service_fee;

pub use order_number::new_order_number;
pub use reference::{payment_reference, REFERENCE_PREFIX};
pub use service_fee::{service_fee, SERVICE_FEE_PERCENT};

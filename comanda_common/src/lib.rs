mod pesos;

pub mod op;
mod secret;

pub use pesos::{Pesos, PesosConversionError, COP_CURRENCY_CODE, COP_CURRENCY_CODE_LOWER};
pub use secret::Secret;

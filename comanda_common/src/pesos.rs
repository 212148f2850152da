use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const COP_CURRENCY_CODE: &str = "COP";
pub const COP_CURRENCY_CODE_LOWER: &str = "cop";

//--------------------------------------       Pesos       -----------------------------------------------------------
/// An amount of Colombian pesos, in whole (major) units.
///
/// The payment gateway speaks minor units ("cents"); use [`Pesos::to_cents`] at that boundary and keep everything
/// else in whole pesos.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Pesos(i64);

op!(binary Pesos, Add, add);
op!(binary Pesos, Sub, sub);
op!(inplace Pesos, SubAssign, sub_assign);
op!(unary Pesos, Neg, neg);

impl Mul<i64> for Pesos {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Pesos {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in pesos: {0}")]
pub struct PesosConversionError(String);

impl From<i64> for Pesos {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Pesos {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Pesos {}

impl TryFrom<u64> for Pesos {
    type Error = PesosConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(PesosConversionError(format!("Value {} is too large to convert to Pesos", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Pesos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${} {COP_CURRENCY_CODE}", self.0)
    }
}

impl Pesos {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// The amount in minor currency units, as payment gateways expect it.
    pub fn to_cents(&self) -> i64 {
        self.0 * 100
    }

    /// Builds an amount from the gateway's minor-unit representation. Sub-peso remainders are truncated, since COP
    /// is not denominated below one peso in practice.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents / 100)
    }
}

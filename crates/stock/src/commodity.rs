use serde::{Deserialize, Serialize};

use crate::error::StockError;
use crate::quantity::Quantity;

/// Bulk commodities the mill keeps stock of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commodity {
    Paddy,
    Rice,
    Bran,
}

impl Commodity {
    pub const ALL: [Commodity; 3] = [Commodity::Paddy, Commodity::Rice, Commodity::Bran];

    pub fn as_str(self) -> &'static str {
        match self {
            Commodity::Paddy => "paddy",
            Commodity::Rice => "rice",
            Commodity::Bran => "bran",
        }
    }
}

impl core::fmt::Display for Commodity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text type name of a commodity (a paddy or rice variety, a bran grade).
///
/// Stored trimmed; matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl AsRef<str>) -> Result<Self, StockError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(StockError::EmptyTypeName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TypeName {
    type Error = StockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TypeName> for String {
    fn from(value: TypeName) -> Self {
        value.0
    }
}

impl core::fmt::Display for TypeName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a movement adds to or withdraws from a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Add,
    Subtract,
}

/// One change to one balance: `quantity` of `commodity`/`type_name`, in or out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub commodity: Commodity,
    pub type_name: TypeName,
    pub quantity: Quantity,
    pub direction: Direction,
}

impl StockMovement {
    pub fn add(commodity: Commodity, type_name: TypeName, quantity: Quantity) -> Self {
        Self {
            commodity,
            type_name,
            quantity,
            direction: Direction::Add,
        }
    }

    pub fn subtract(commodity: Commodity, type_name: TypeName, quantity: Quantity) -> Self {
        Self {
            commodity,
            type_name,
            quantity,
            direction: Direction::Subtract,
        }
    }
}

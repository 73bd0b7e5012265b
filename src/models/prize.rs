use serde::{Deserialize, Serialize};

/// Quantity value the service uses for prizes without a stock limit.
pub const UNLIMITED_QUANTITY: i64 = -1;

/// A reward on the wheel. Edited only through the admin surface; treated as
/// immutable for the length of one draw and animation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Relative draw weight, interpreted by the service only
    pub probability: f64,
    /// Remaining stock, `UNLIMITED_QUANTITY` for none
    pub quantity: i64,
    #[serde(default)]
    pub color: String,
    pub is_active: bool,
    #[serde(default)]
    pub is_donatable: bool,
    #[serde(default)]
    pub is_money: bool,
}

impl Prize {
    pub fn is_unlimited(&self) -> bool {
        self.quantity == UNLIMITED_QUANTITY
    }

    pub fn is_available(&self) -> bool {
        self.is_active && (self.is_unlimited() || self.quantity > 0)
    }
}

/// Segments shown on the wheel: active prizes in the order the service returned them.
pub fn visible_segments(prizes: &[Prize]) -> Vec<Prize> {
    prizes.iter().filter(|p| p.is_active).cloned().collect()
}

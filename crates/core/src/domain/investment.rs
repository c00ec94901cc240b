use crate::domain::snapshot::normalize_symbol;
use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-entered holding. Write-once: records are created, listed, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub id: Uuid,
    pub owner_id: String,
    pub symbol: String,
    pub buy_price: f64,
    pub quantity: f64,
    pub buy_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Client-submitted fields, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvestment {
    pub symbol: String,
    pub buy_price: f64,
    pub quantity: f64,
    pub buy_date: String,
}

impl NewInvestment {
    pub fn validate_and_into_investment(
        self,
        owner_id: &str,
        created_at: DateTime<Utc>,
    ) -> PipelineResult<Investment> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(PipelineError::invalid("owner id is required"));
        }

        let symbol = normalize_symbol(&self.symbol)?;

        if !(self.buy_price.is_finite() && self.buy_price > 0.0) {
            return Err(PipelineError::invalid(format!(
                "buyPrice must be a positive number (got {})",
                self.buy_price
            )));
        }
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            return Err(PipelineError::invalid(format!(
                "quantity must be a positive number (got {})",
                self.quantity
            )));
        }

        let buy_date = NaiveDate::parse_from_str(self.buy_date.trim(), "%Y-%m-%d")
            .map_err(|_| PipelineError::invalid("buyDate must be YYYY-MM-DD"))?;

        Ok(Investment {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            symbol,
            buy_price: self.buy_price,
            quantity: self.quantity,
            buy_date,
            created_at,
        })
    }
}

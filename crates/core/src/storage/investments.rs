use crate::domain::investment::Investment;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Per-user holdings. Records are only ever inserted and listed.
#[async_trait::async_trait]
pub trait InvestmentStore: Send + Sync {
    async fn create(&self, investment: &Investment) -> anyhow::Result<()>;

    /// Holdings owned by `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> anyhow::Result<Vec<Investment>>;
}

#[derive(Debug, Clone)]
pub struct PgInvestmentStore {
    pool: sqlx::PgPool,
}

impl PgInvestmentStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvestmentRow {
    id: Uuid,
    owner_id: String,
    symbol: String,
    buy_price: f64,
    quantity: f64,
    buy_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<InvestmentRow> for Investment {
    fn from(row: InvestmentRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            symbol: row.symbol,
            buy_price: row.buy_price,
            quantity: row.quantity,
            buy_date: row.buy_date,
            created_at: row.created_at,
        }
    }
}

#[async_trait::async_trait]
impl InvestmentStore for PgInvestmentStore {
    async fn create(&self, investment: &Investment) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO investments (id, owner_id, symbol, buy_price, quantity, buy_date, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(investment.id)
        .bind(&investment.owner_id)
        .bind(&investment.symbol)
        .bind(investment.buy_price)
        .bind(investment.quantity)
        .bind(investment.buy_date)
        .bind(investment.created_at)
        .execute(&self.pool)
        .await
        .context("insert investments failed")?;
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> anyhow::Result<Vec<Investment>> {
        let rows: Vec<InvestmentRow> = sqlx::query_as(
            "SELECT id, owner_id, symbol, buy_price, quantity, buy_date, created_at \
             FROM investments WHERE owner_id = $1 \
             ORDER BY created_at DESC, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("select investments failed")?;

        Ok(rows.into_iter().map(Investment::from).collect())
    }
}

/// Process-local store, used when running without a database in tests.
#[derive(Debug, Default)]
pub struct MemoryInvestmentStore {
    rows: tokio::sync::RwLock<Vec<Investment>>,
}

impl MemoryInvestmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl InvestmentStore for MemoryInvestmentStore {
    async fn create(&self, investment: &Investment) -> anyhow::Result<()> {
        let mut rows = self.rows.write().await;
        anyhow::ensure!(
            rows.iter().all(|r| r.id != investment.id),
            "duplicate investment id {}",
            investment.id
        );
        rows.push(investment.clone());
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> anyhow::Result<Vec<Investment>> {
        let mut owned: Vec<Investment> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }
}

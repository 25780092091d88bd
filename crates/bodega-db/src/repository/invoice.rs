//! # Digital Invoice Repository
//!
//! One shareable invoice per completed sale, addressed by a public access
//! token. Issuance is idempotent: asking twice for the same sale returns
//! the same invoice.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use bodega_core::DigitalInvoice;

const SELECT_INVOICE: &str = r#"
    SELECT id, sale_id, store_id, access_token, created_at
    FROM digital_invoices
"#;

/// Builds the shareable path for an invoice token.
pub fn invoice_url(access_token: &str) -> String {
    format!("/invoice/{access_token}")
}

/// Repository for digital invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Issues the invoice for a sale, or returns the existing one.
    ///
    /// The access token is an unguessable UUID, not the sale id, so the
    /// shareable URL leaks nothing about sale volume.
    pub async fn issue_for_sale(&self, sale_id: &str, store_id: &str) -> DbResult<DigitalInvoice> {
        if let Some(existing) = self.get_by_sale(sale_id).await? {
            return Ok(existing);
        }

        let invoice = DigitalInvoice {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            store_id: store_id.to_string(),
            access_token: Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
        };

        debug!(sale_id, invoice_id = %invoice.id, "Issuing digital invoice");

        sqlx::query(
            r#"
            INSERT INTO digital_invoices (id, sale_id, store_id, access_token, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.sale_id)
        .bind(&invoice.store_id)
        .bind(&invoice.access_token)
        .bind(invoice.created_at)
        .execute(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets the invoice for a sale, if issued.
    pub async fn get_by_sale(&self, sale_id: &str) -> DbResult<Option<DigitalInvoice>> {
        let invoice =
            sqlx::query_as::<_, DigitalInvoice>(&format!("{SELECT_INVOICE} WHERE sale_id = ?1"))
                .bind(sale_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(invoice)
    }

    /// Resolves an invoice from its public access token.
    pub async fn get_by_token(&self, token: &str) -> DbResult<Option<DigitalInvoice>> {
        let invoice = sqlx::query_as::<_, DigitalInvoice>(&format!(
            "{SELECT_INVOICE} WHERE access_token = ?1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invoice)
    }
}

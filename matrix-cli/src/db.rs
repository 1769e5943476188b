//! Persistence Gateway (spec.md §4.7 / C9), grounded on
//! `backend/src/database.rs`'s embedded-`Surreal<Db>` setup and
//! `backend/src/database/migrations.rs`'s schema-via-`db.query` style.
//! The downstream store historically did not honour savepoints
//! (spec.md §9), so `begin`/`commit`/`rollback` map to one real
//! transaction per file rather than nested savepoints. The transaction is
//! opened on `external`, the store that actually receives quote inserts,
//! not `primary` (which only ever serves reads during a file's
//! processing) — otherwise a rollback could never undo an insert.

use matrix_core::format_resolver::resolve_format;
use matrix_core::model::{MatrixFormat, Quote, Supplier, SupplierAlias};
use serde::{Deserialize, Serialize};
use surrealdb::engine::local::{Db, Mem};
use surrealdb::Surreal;
use tracing::info;

/// Bulk inserts are capped here because the external store limits bound
/// parameters per statement (spec.md §4.7).
pub const BATCH_SIZE: usize = 1000;

#[derive(Debug, Serialize, Deserialize)]
struct SupplierRow {
    id: String,
    name: String,
    email_recipient: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MatrixFormatRow {
    id: i64,
    supplier_id: String,
    name: String,
    attachment_pattern: Option<String>,
    match_body: bool,
}

pub struct PersistenceGateway {
    primary: Surreal<Db>,
    external: Surreal<Db>,
}

impl PersistenceGateway {
    pub async fn connect(config: &crate::config::DbConfig) -> Result<Self, surrealdb::Error> {
        let primary = Surreal::new::<Mem>(()).await?;
        primary.use_ns(&config.primary_namespace).use_db(&config.primary_database).await?;

        let external = Surreal::new::<Mem>(()).await?;
        external.use_ns("altitude").use_db("altitude").await?;

        info!(
            "connected to primary store ns='{}' db='{}' (embedded; uri '{}' is informational only, per the workspace's kv-mem-only feature set)",
            config.primary_namespace, config.primary_database, config.primary_uri
        );
        Ok(PersistenceGateway { primary, external })
    }

    /// `find_supplier` (spec.md §4.7): exactly-one lookup in the primary
    /// store by recipient address, by-name lookup in the external store;
    /// the external alias may legitimately be absent.
    pub async fn find_supplier(&self, recipient_address: &str) -> crate::error::Result<(Supplier, Option<SupplierAlias>)> {
        let mut response = self
            .primary
            .query("SELECT meta::id(id) AS id, name, email_recipient FROM supplier WHERE email_recipient = $recipient")
            .bind(("recipient", recipient_address.to_string()))
            .await?;
        let suppliers: Vec<SupplierRow> = response.take(0)?;

        let supplier_row = match suppliers.len() {
            1 => suppliers.into_iter().next().unwrap(),
            n => {
                return Err(crate::error::PipelineError::unknown_supplier(format!(
                    "recipient '{recipient_address}' matched {n} suppliers"
                )))
            }
        };

        let formats = self.formats_for_supplier(&supplier_row.id).await?;
        let supplier = Supplier {
            id: supplier_row.id,
            name: supplier_row.name.clone(),
            email_recipient: supplier_row.email_recipient,
            formats,
        };

        let mut alias_response = self
            .external
            .query("SELECT * FROM supplier_alias WHERE name = $name")
            .bind(("name", supplier_row.name))
            .await?;
        let alias: Option<SupplierAlias> = alias_response.take::<Vec<SupplierAlias>>(0)?.into_iter().next();

        Ok((supplier, alias))
    }

    async fn formats_for_supplier(&self, supplier_id: &str) -> Result<Vec<MatrixFormat>, surrealdb::Error> {
        let mut response = self
            .primary
            .query("SELECT meta::id(id) AS id, supplier_id, name, attachment_pattern, match_body FROM matrix_format WHERE supplier_id = $supplier_id")
            .bind(("supplier_id", supplier_id.to_string()))
            .await?;
        let rows: Vec<MatrixFormatRow> = response.take(0)?;
        Ok(rows
            .into_iter()
            .map(|r| MatrixFormat {
                id: r.id,
                supplier_id: r.supplier_id,
                name: r.name,
                attachment_pattern: r.attachment_pattern,
                match_body: r.match_body,
            })
            .collect())
    }

    /// `find_format` (spec.md §4.7): delegates to the Format Resolver
    /// (C7), which needs no I/O of its own.
    pub fn find_format<'a>(&self, supplier: &'a Supplier, file_name: &str, match_body: bool) -> crate::error::Result<&'a MatrixFormat> {
        resolve_format(supplier, file_name, match_body).map_err(|e| crate::error::PipelineError::unknown_format(e.to_string()))
    }

    /// Opens the per-file transaction on `external`, the store
    /// `insert_quotes` actually writes to — `primary` is read-only during
    /// a file's processing (`find_supplier`/`find_format` both run before
    /// `begin` is ever called), so wrapping it would leave quote inserts
    /// unrollbackable.
    pub async fn begin(&self) -> Result<(), surrealdb::Error> {
        self.external.query("BEGIN TRANSACTION").await?;
        Ok(())
    }

    pub async fn commit(&self) -> Result<(), surrealdb::Error> {
        self.external.query("COMMIT TRANSACTION").await?;
        Ok(())
    }

    pub async fn rollback(&self) -> Result<(), surrealdb::Error> {
        self.external.query("CANCEL TRANSACTION").await?;
        Ok(())
    }

    /// Bulk inserts `quotes` into the external store with a single
    /// round-trip; callers are responsible for chunking to at most
    /// `BATCH_SIZE` (spec.md §8's batching property).
    pub async fn insert_quotes(&self, quotes: &[Quote]) -> Result<(), surrealdb::Error> {
        if quotes.is_empty() {
            return Ok(());
        }
        self.external
            .query("INSERT INTO quote $values")
            .bind(("values", quotes.to_vec()))
            .await?;
        Ok(())
    }

    /// Seeds a supplier and its formats directly, for driver tests that
    /// need a populated primary store without a live upstream feed.
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn seed_supplier(&self, supplier: &Supplier) -> Result<(), surrealdb::Error> {
        self.primary
            .query("CREATE type::thing('supplier', $id) SET name = $name, email_recipient = $email_recipient")
            .bind(("id", supplier.id.clone()))
            .bind(("name", supplier.name.clone()))
            .bind(("email_recipient", supplier.email_recipient.clone()))
            .await?;
        for format in &supplier.formats {
            self.primary
                .query(
                    "CREATE type::thing('matrix_format', $id) SET supplier_id = $supplier_id, name = $name, attachment_pattern = $attachment_pattern, match_body = $match_body",
                )
                .bind(("id", format.id))
                .bind(("supplier_id", format.supplier_id.clone()))
                .bind(("name", format.name.clone()))
                .bind(("attachment_pattern", format.attachment_pattern.clone()))
                .bind(("match_body", format.match_body))
                .await?;
        }
        Ok(())
    }

    /// Reads back everything committed to the external store, for
    /// assertions in driver tests.
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn all_quotes(&self) -> Result<Vec<Quote>, surrealdb::Error> {
        let mut response = self.external.query("SELECT * FROM quote").await?;
        response.take(0)
    }
}

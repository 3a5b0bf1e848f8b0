//! Persistence of [`StockRecord`]s in a CouchDB-compatible document database.
//!
//! One document per company, `_id` = company name. Upserts fetch the current
//! `_rev` first, so a record written by a previous run is replaced rather than
//! rejected as a conflict.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::StoreConfig;
use crate::error::UpdateError;
use crate::models::StockRecord;
use crate::sources::success_text;

/// Storage for per-company records.
pub trait DocumentStore {
    /// Every stored record.
    async fn list(&self) -> Result<Vec<StockRecord>, UpdateError>;

    /// Insert or replace the record keyed by `record.company`.
    async fn upsert(&self, record: &StockRecord) -> Result<(), UpdateError>;
}

#[derive(Debug, Deserialize)]
struct AllDocs {
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    id: String,
    doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RevOnly {
    #[serde(rename = "_rev")]
    rev: String,
}

/// HTTP client for a single CouchDB database.
#[derive(Debug, Clone)]
pub struct CouchStore {
    http: Client,
    database: Url,
    username: Option<String>,
    password: Option<String>,
}

impl CouchStore {
    pub fn new(http: Client, config: &StoreConfig) -> Result<Self, UpdateError> {
        if config.database.trim().is_empty() {
            return Err(UpdateError::Config("store.database is not set".to_string()));
        }
        let database = Url::parse(&format!(
            "{}/{}/",
            config.url.trim_end_matches('/'),
            urlencoding::encode(&config.database)
        ))?;
        Ok(Self {
            http,
            database,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => req.basic_auth(user, self.password.as_ref()),
            None => req,
        }
    }

    fn doc_url(&self, company: &str) -> Result<Url, UpdateError> {
        Ok(self.database.join(&urlencoding::encode(company))?)
    }

    async fn current_rev(&self, url: &Url) -> Result<Option<String>, UpdateError> {
        let resp = self.authed(self.http.get(url.clone())).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = success_text(resp).await?;
        let doc: RevOnly = serde_json::from_str(&body)?;
        Ok(Some(doc.rev))
    }
}

impl DocumentStore for CouchStore {
    #[instrument(level = "info", skip(self))]
    async fn list(&self) -> Result<Vec<StockRecord>, UpdateError> {
        let mut url = self.database.join("_all_docs")?;
        url.query_pairs_mut().append_pair("include_docs", "true");

        let body = success_text(self.authed(self.http.get(url)).send().await?).await?;
        let all: AllDocs = serde_json::from_str(&body)?;

        let mut records = Vec::with_capacity(all.rows.len());
        for row in all.rows {
            if row.id.starts_with("_design/") {
                continue;
            }
            let Some(doc) = row.doc else {
                debug!(id = %row.id, "Row without document");
                continue;
            };
            match serde_json::from_value::<StockRecord>(doc) {
                Ok(record) => records.push(record),
                Err(e) => warn!(id = %row.id, error = %e, "Skipping unreadable stock document"),
            }
        }
        info!(count = records.len(), "Listed stock records");
        Ok(records)
    }

    #[instrument(level = "info", skip_all, fields(company = %record.company))]
    async fn upsert(&self, record: &StockRecord) -> Result<(), UpdateError> {
        let url = self.doc_url(&record.company)?;
        let rev = self.current_rev(&url).await?;

        let mut doc = serde_json::to_value(record)?;
        if let Value::Object(fields) = &mut doc {
            fields.insert("_id".to_string(), Value::String(record.company.clone()));
            if let Some(rev) = &rev {
                fields.insert("_rev".to_string(), Value::String(rev.clone()));
            }
        }

        let resp = self.authed(self.http.put(url).json(&doc)).send().await?;
        success_text(resp).await?;
        info!(replaced = rev.is_some(), articles = record.history.len(), "Stored stock record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, PUT};
    use httpmock::MockServer;

    fn config(url: String) -> StoreConfig {
        StoreConfig {
            url,
            database: "stocks".to_string(),
            username: Some("admin".to_string()),
            password: Some("pw".to_string()),
        }
    }

    #[tokio::test]
    async fn test_list_skips_design_docs_and_bad_rows() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/stocks/_all_docs")
                .query_param("include_docs", "true");
            then.status(200).body(
                r#"{"total_rows": 4, "offset": 0, "rows": [
                  {"id": "IBM", "key": "IBM", "doc": {"_id": "IBM", "_rev": "1-a", "company": "IBM", "ticker": "IBM", "history": [], "priceHistory": {}}},
                  {"id": "_design/views", "key": "_design/views", "doc": {"_id": "_design/views"}},
                  {"id": "junk", "key": "junk", "doc": {"_id": "junk", "unrelated": true}},
                  {"id": "Acme", "key": "Acme", "doc": {"_id": "Acme", "company": "Acme", "ticker": "not found"}}
                ]}"#,
            );
        });

        let store = CouchStore::new(Client::new(), &config(server.base_url())).unwrap();
        let records = store.list().await.unwrap();
        mock.assert();

        let companies: Vec<&str> = records.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(companies, vec!["IBM", "Acme"]);
    }

    #[tokio::test]
    async fn test_list_failure_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/stocks/_all_docs");
            then.status(404).body(r#"{"error":"not_found"}"#);
        });

        let store = CouchStore::new(Client::new(), &config(server.base_url())).unwrap();
        assert!(matches!(
            store.list().await,
            Err(UpdateError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_upsert_new_document() {
        let server = MockServer::start();
        let lookup = server.mock(|when, then| {
            when.method(GET).path("/stocks/Acme");
            then.status(404).body(r#"{"error":"not_found"}"#);
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/stocks/Acme")
                .json_body_includes(r#"{"_id": "Acme", "company": "Acme"}"#);
            then.status(201).body(r#"{"ok":true,"id":"Acme","rev":"1-x"}"#);
        });

        let store = CouchStore::new(Client::new(), &config(server.base_url())).unwrap();
        store
            .upsert(&StockRecord::new("Acme", "not found"))
            .await
            .unwrap();
        lookup.assert();
        put.assert();
    }

    #[tokio::test]
    async fn test_upsert_existing_document_carries_rev() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/stocks/IBM");
            then.status(200)
                .body(r#"{"_id":"IBM","_rev":"7-abc","company":"IBM","ticker":"IBM"}"#);
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/stocks/IBM")
                .json_body_includes(r#"{"_rev": "7-abc", "ticker": "IBM"}"#);
            then.status(201).body(r#"{"ok":true}"#);
        });

        let store = CouchStore::new(Client::new(), &config(server.base_url())).unwrap();
        store.upsert(&StockRecord::new("IBM", "IBM")).await.unwrap();
        put.assert();
    }

    #[tokio::test]
    async fn test_upsert_conflict_is_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/stocks/IBM");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(PUT).path("/stocks/IBM");
            then.status(409).body(r#"{"error":"conflict"}"#);
        });

        let store = CouchStore::new(Client::new(), &config(server.base_url())).unwrap();
        assert!(matches!(
            store.upsert(&StockRecord::new("IBM", "IBM")).await,
            Err(UpdateError::Status { status: 409, .. })
        ));
    }
}

//! The refresh run: discovery, price alignment, image lookup, persistence.
//!
//! # Pipeline
//!
//! 1. **Targets**: the explicit company list, or every company in the store
//! 2. **Discovery**: one query per company, all settled jointly
//! 3. **Merge**: locate or create each company's record and find new articles
//! 4. **Prices**: refresh closing prices when there is something new
//! 5. **Trim**: keep only prices for dates the articles refer to
//! 6. **Images + persist**: scrape images for new articles, merge, upsert
//!
//! Companies are processed concurrently on the calling task. Only a failed
//! store listing or an empty target list rejects the run; every other
//! failure is logged and reported in [`UpdateReport::failures`].

use std::collections::HashMap;
use std::time::Instant;

use futures::future::join_all;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::articles::{merge_articles, new_articles};
use crate::config::Config;
use crate::error::UpdateError;
use crate::models::{Article, Company, StockRecord, UNRESOLVED_TICKER};
use crate::prices::trim_price_history;
use crate::settle::{settle_all, split_outcomes};
use crate::sources::images::resolve_images;
use crate::sources::{DiscoverySource, MarketData, PageFetcher};
use crate::store::DocumentStore;
use crate::utils::to_market_date;

/// Where in the pipeline a company's soft failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Discovery,
    Prices,
    Persist,
}

/// A failure that degraded one company's update without stopping the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyFailure {
    pub company: String,
    pub stage: FailureStage,
    pub error: String,
}

impl CompanyFailure {
    fn new(company: &str, stage: FailureStage, error: &UpdateError) -> Self {
        Self {
            company: company.to_string(),
            stage,
            error: error.to_string(),
        }
    }
}

/// Best-effort outcome of a run.
///
/// A record in `records` is the in-memory result; a matching
/// [`FailureStage::Persist`] entry means it was not stored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    pub records: Vec<StockRecord>,
    pub failures: Vec<CompanyFailure>,
}

/// Tunables the updater needs from [`Config`].
#[derive(Debug, Clone)]
pub struct UpdaterSettings {
    pub companies: Vec<Company>,
    pub max_history: usize,
    pub image_concurrency: usize,
}

impl From<&Config> for UpdaterSettings {
    fn from(config: &Config) -> Self {
        Self {
            companies: config.companies.clone(),
            max_history: config.max_history,
            image_concurrency: config.image_concurrency,
        }
    }
}

/// Drives a refresh run over its collaborators.
pub struct StockUpdater<D, M, S, P> {
    discovery: D,
    market: M,
    store: S,
    pages: P,
    settings: UpdaterSettings,
}

impl<D, M, S, P> StockUpdater<D, M, S, P>
where
    D: DiscoverySource,
    M: MarketData,
    S: DocumentStore,
    P: PageFetcher,
{
    pub fn new(settings: UpdaterSettings, discovery: D, market: M, store: S, pages: P) -> Self {
        Self {
            discovery,
            market,
            store,
            pages,
            settings,
        }
    }

    /// Refresh `companies`, or every stored company when `None`.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, companies: Option<Vec<String>>) -> Result<UpdateReport, UpdateError> {
        let t0 = Instant::now();
        let existing = self.store.list().await?;

        let targets: Vec<String> = companies
            .unwrap_or_else(|| existing.iter().map(|r| r.company.clone()).collect())
            .into_iter()
            .unique()
            .collect();
        if targets.is_empty() {
            return Err(UpdateError::NoCompanies);
        }
        info!(count = targets.len(), stored = existing.len(), "Refreshing companies");

        // ---- Discovery fan-out ----
        let outcomes = settle_all(targets.iter().map(|company| async move {
            match self.discovery.query(company).await {
                Ok(articles) => Ok((company.as_str(), articles)),
                Err(e) => Err((company.as_str(), e)),
            }
        }))
        .await;
        let (fetched, discovery_errors) = split_outcomes(outcomes);

        let mut report = UpdateReport::default();
        for (company, e) in discovery_errors {
            error!(%company, error = %e, "Discovery query failed");
            report
                .failures
                .push(CompanyFailure::new(company, FailureStage::Discovery, &e));
        }

        // ---- Per-company merge, prices, images, persist ----
        let stored: HashMap<&str, &StockRecord> =
            existing.iter().map(|r| (r.company.as_str(), r)).collect();
        let updates = join_all(fetched.into_iter().map(|(company, articles)| {
            let record = match stored.get(company) {
                Some(record) => (*record).clone(),
                None => self.new_record(company),
            };
            self.refresh_company(record, articles)
        }))
        .await;

        for (record, failures) in updates {
            report.records.push(record);
            report.failures.extend(failures);
        }

        info!(
            records = report.records.len(),
            failures = report.failures.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Refresh run complete"
        );
        Ok(report)
    }

    fn new_record(&self, company: &str) -> StockRecord {
        let ticker = self
            .settings
            .companies
            .iter()
            .find(|c| c.name == company)
            .map(|c| c.ticker.as_str())
            .unwrap_or(UNRESOLVED_TICKER);
        info!(%company, %ticker, "Creating stock record");
        StockRecord::new(company, ticker)
    }

    #[instrument(level = "info", skip_all, fields(company = %record.company))]
    async fn refresh_company(
        &self,
        mut record: StockRecord,
        fetched: Vec<Article>,
    ) -> (StockRecord, Vec<CompanyFailure>) {
        let mut failures = Vec::new();
        let fresh = new_articles(&record.history, &fetched);
        debug!(fetched = fetched.len(), new = fresh.len(), "Compared with history");

        if !fresh.is_empty() {
            if record.has_ticker() {
                match self.market.price_history(&record.ticker).await {
                    Ok(prices) => record.price_history.extend(prices),
                    Err(e) => {
                        warn!(ticker = %record.ticker, error = %e, "Price refresh failed; keeping stored prices");
                        failures.push(CompanyFailure::new(&record.company, FailureStage::Prices, &e));
                    }
                }
            } else {
                debug!("Ticker unresolved; skipping price refresh");
            }
        }

        let needed_dates: Vec<String> = record
            .history
            .iter()
            .chain(&fresh)
            .filter_map(|a| match to_market_date(&a.date) {
                Ok(date) => Some(date),
                Err(e) => {
                    warn!(url = %a.url, error = %e, "Article date not convertible");
                    None
                }
            })
            .collect();
        record.price_history =
            trim_price_history(needed_dates.iter().map(String::as_str), &record.price_history);

        let images = resolve_images(&self.pages, &fresh, self.settings.image_concurrency).await;
        let image_by_url: HashMap<&str, &str> = images
            .iter()
            .map(|r| (r.url.as_str(), r.image_url.as_str()))
            .collect();
        let fresh: Vec<Article> = fresh
            .into_iter()
            .map(|mut article| {
                if let Some(image) = image_by_url.get(article.url.as_str()) {
                    article.image_url = Some((*image).to_string());
                }
                article
            })
            .collect();

        record.history = merge_articles(&record.history, &fresh, self.settings.max_history);

        if let Err(e) = self.store.upsert(&record).await {
            error!(error = %e, "Failed to persist stock record");
            failures.push(CompanyFailure::new(&record.company, FailureStage::Persist, &e));
        }
        (record, failures)
    }
}

//! Request-level orchestration: filter string in, result envelope out.

use std::sync::Arc;

use dynafilter_model::{Item, ResultEnvelope};
use tracing::{debug, info, info_span, warn};

use crate::backend::{Backend, BackendRequest, ReadOptions};
use crate::collector::{collect, first_page};
use crate::condition::ConditionList;
use crate::config::DynaFilterConfig;
use crate::error::QueryResult;
use crate::expression::compile;
use crate::parser::parse_filter;
use crate::planner::{QueryPlan, plan, plan_scan};
use crate::post_filter::PostFilter;

/// A request that passed parsing, planning and compiling, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    /// Parsed conditions in filter-string order.
    pub conditions: ConditionList,
    /// Key and filter buckets.
    pub plan: QueryPlan,
    /// The backend request every page is issued with.
    pub request: BackendRequest,
    post_filter: PostFilter,
}

impl PreparedQuery {
    /// Whether results are re-checked in memory after retrieval.
    #[must_use]
    pub fn has_post_filter(&self) -> bool {
        !self.post_filter.is_empty()
    }
}

/// Runs filter queries against a backend.
#[derive(Debug)]
pub struct FilterQueryService<B> {
    backend: B,
    config: Arc<DynaFilterConfig>,
}

impl<B: Backend> FilterQueryService<B> {
    /// Create a service over `backend`.
    #[must_use]
    pub fn new(backend: B, config: DynaFilterConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    /// The backend this service issues calls through.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &DynaFilterConfig {
        &self.config
    }

    /// Parse, plan and compile without contacting the backend.
    ///
    /// `None` or a blank filter prepares an unfiltered scan.
    ///
    /// # Errors
    ///
    /// Parse, validation and type-coercion errors.
    pub fn prepare(
        &self,
        table: &str,
        filter: Option<&str>,
        projection: Option<&str>,
    ) -> QueryResult<PreparedQuery> {
        let conditions = parse(filter)?;
        let plan = plan(&conditions, self.config.key_schema(table))?;
        self.finish_prepare(table, conditions, plan, projection)
    }

    /// Like [`Self::prepare`], but every condition becomes a scan filter
    /// whatever the table's key schema says.
    ///
    /// # Errors
    ///
    /// Parse, validation and type-coercion errors.
    pub fn prepare_scan(
        &self,
        table: &str,
        filter: Option<&str>,
        projection: Option<&str>,
    ) -> QueryResult<PreparedQuery> {
        let conditions = parse(filter)?;
        let plan = plan_scan(&conditions);
        self.finish_prepare(table, conditions, plan, projection)
    }

    fn finish_prepare(
        &self,
        table: &str,
        conditions: ConditionList,
        plan: QueryPlan,
        projection: Option<&str>,
    ) -> QueryResult<PreparedQuery> {
        let compiled = compile(&plan, projection)?;
        let post_filter = PostFilter::from_compiled(&compiled);
        let options = ReadOptions {
            limit: self.config.page_limit,
            consistent_read: self.config.consistent_read,
        };
        let request = BackendRequest::from_compiled(table, compiled, options);

        debug!(
            table,
            conditions = conditions.len(),
            operation = %request.operation(),
            post_filter = !post_filter.is_empty(),
            "prepared filter query"
        );
        Ok(PreparedQuery {
            conditions,
            plan,
            request,
            post_filter,
        })
    }

    /// Collect every page, apply the post-filter and wrap the result.
    ///
    /// # Errors
    ///
    /// The first backend failure; partial results are discarded.
    pub fn execute(&self, prepared: &PreparedQuery) -> QueryResult<ResultEnvelope> {
        let items = collect(&self.backend, &prepared.request)?;
        finish(prepared, items)
    }

    /// Issue one page only, apply the post-filter and wrap the result. Any
    /// cursor the backend returns is dropped.
    ///
    /// # Errors
    ///
    /// The backend failure, if any.
    pub fn execute_first_page(&self, prepared: &PreparedQuery) -> QueryResult<ResultEnvelope> {
        let items = first_page(&self.backend, &prepared.request)?;
        finish(prepared, items)
    }

    /// Run a filter query end to end.
    ///
    /// # Errors
    ///
    /// Any [`crate::QueryError`]; no partial envelope is ever returned.
    pub fn query_items(
        &self,
        table: &str,
        filter: Option<&str>,
        projection: Option<&str>,
    ) -> QueryResult<ResultEnvelope> {
        traced(table, "query_items", || {
            let prepared = self.prepare(table, filter, projection)?;
            self.execute(&prepared)
        })
    }

    /// Run a filter query but return only the first page.
    ///
    /// # Errors
    ///
    /// Any [`crate::QueryError`].
    pub fn query_first_page(
        &self,
        table: &str,
        filter: Option<&str>,
        projection: Option<&str>,
    ) -> QueryResult<ResultEnvelope> {
        traced(table, "query_first_page", || {
            let prepared = self.prepare(table, filter, projection)?;
            self.execute_first_page(&prepared)
        })
    }

    /// Run a forced scan: every condition is a filter, all pages collected.
    ///
    /// # Errors
    ///
    /// Any [`crate::QueryError`]; no partial envelope is ever returned.
    pub fn scan_items(
        &self,
        table: &str,
        filter: Option<&str>,
        projection: Option<&str>,
    ) -> QueryResult<ResultEnvelope> {
        traced(table, "scan_items", || {
            let prepared = self.prepare_scan(table, filter, projection)?;
            self.execute(&prepared)
        })
    }

    /// List every item of `table`.
    ///
    /// # Errors
    ///
    /// Any backend failure.
    pub fn scan_all(&self, table: &str) -> QueryResult<ResultEnvelope> {
        self.scan_items(table, None, None)
    }
}

fn parse(filter: Option<&str>) -> QueryResult<ConditionList> {
    match filter {
        Some(text) => Ok(parse_filter(text)?),
        None => Ok(ConditionList::new()),
    }
}

fn finish(prepared: &PreparedQuery, items: Vec<Item>) -> QueryResult<ResultEnvelope> {
    let fetched = items.len();
    let items = prepared.post_filter.apply(items)?;
    info!(
        table = prepared.request.table_name(),
        operation = %prepared.request.operation(),
        fetched,
        returned = items.len(),
        "filter query completed"
    );
    Ok(ResultEnvelope::new(items))
}

/// Run `run` inside a request span and log its failure.
fn traced<F>(table: &str, entry: &'static str, run: F) -> QueryResult<ResultEnvelope>
where
    F: FnOnce() -> QueryResult<ResultEnvelope>,
{
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("filter_query", %request_id, table, entry);
    let _guard = span.enter();

    let result = run();
    if let Err(e) = &result {
        warn!(kind = e.kind(), error = %e, "filter query failed");
    }
    result
}

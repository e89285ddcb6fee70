//! Module: repository
//! Responsibility: the read paths callers use: compile a payload into a plan
//! with the configured mode and run it on an executor.
//! Does not own: plan assembly rules or executor semantics.

use crate::{EngineSettings, Error, PageRequest};
use rowscope_core::{
    db::{
        engine::{ApplyOptions, FilterEngine},
        executor::{Page, QueryExecutor, fetch_page},
        filter::FilterPayload,
        plan::QueryPlan,
    },
    identity::Identity,
    model::{entity::EntityDescriptor, row::Row},
};

///
/// Repository
///
/// Read access to one entity through one executor.
///

pub struct Repository<'a, X> {
    descriptor: &'a dyn EntityDescriptor,
    executor: &'a X,
    settings: &'a EngineSettings,
}

impl<'a, X: QueryExecutor> Repository<'a, X> {
    #[must_use]
    pub const fn new(
        descriptor: &'a dyn EntityDescriptor,
        executor: &'a X,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            descriptor,
            executor,
            settings,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &'a dyn EntityDescriptor {
        self.descriptor
    }

    #[must_use]
    pub const fn executor(&self) -> &'a X {
        self.executor
    }

    #[must_use]
    pub const fn settings(&self) -> &'a EngineSettings {
        self.settings
    }

    fn engine(&self) -> FilterEngine<'a> {
        FilterEngine::new(self.descriptor, &self.settings.policies)
    }

    /// Compile `payload` with the configured pipeline mode.
    pub fn plan(
        &self,
        payload: &FilterPayload,
        identity: &Identity,
        sorting: bool,
    ) -> Result<QueryPlan, Error> {
        let options = ApplyOptions::new(sorting, self.settings.mode);

        Ok(self.engine().apply(payload, identity, None, options)?)
    }

    /// Compile `payload` into a top-1-per-group plan.
    pub fn plan_distinct(
        &self,
        payload: &FilterPayload,
        identity: &Identity,
        sorting: bool,
    ) -> Result<QueryPlan, Error> {
        Ok(self
            .engine()
            .apply_with_dedup(payload, identity, None, sorting)?)
    }

    /// One sorted page plus the unpaginated total.
    pub async fn list(
        &self,
        payload: &FilterPayload,
        identity: &Identity,
        page: PageRequest,
    ) -> Result<Page, Error> {
        let plan = self.plan(payload, identity, true)?;

        self.fetch_window(plan, page).await
    }

    /// Like `list`, but one row per `distinct_by` group.
    pub async fn list_distinct(
        &self,
        payload: &FilterPayload,
        identity: &Identity,
        page: PageRequest,
    ) -> Result<Page, Error> {
        let plan = self.plan_distinct(payload, identity, true)?;

        self.fetch_window(plan, page).await
    }

    /// `list` for read paths that prefer an empty page over a store failure.
    ///
    /// Only executor failures are swallowed; malformed requests and invariant
    /// violations still surface as errors.
    pub async fn list_or_default(
        &self,
        payload: &FilterPayload,
        identity: &Identity,
        page: PageRequest,
    ) -> Result<Page, Error> {
        let plan = self.plan(payload, identity, true)?;
        let (limit, offset) = page.resolve(&self.settings.pagination);
        let plan = plan.paginate(Some(limit), offset)?;

        match fetch_page(self.executor, &plan).await {
            Ok(page) => Ok(page),
            Err(err) => {
                tracing::error!(
                    entity = plan.entity(),
                    error = %err,
                    transient = err.is_transient(),
                    "store failure on read path; returning an empty page"
                );
                Ok(Page::default())
            }
        }
    }

    /// Number of rows the payload matches for `identity`.
    pub async fn count(&self, payload: &FilterPayload, identity: &Identity) -> Result<u64, Error> {
        let plan = self.plan(payload, identity, false)?;
        let count_plan = self.engine().count_of(&plan);

        Ok(self.executor.count(&count_plan).await?)
    }

    /// Every matching row, unsorted and unpaginated.
    pub async fn load_all(
        &self,
        payload: &FilterPayload,
        identity: &Identity,
    ) -> Result<Vec<Row>, Error> {
        let plan = self.plan(payload, identity, false)?;

        Ok(self.executor.fetch(&plan).await?)
    }

    async fn fetch_window(&self, plan: QueryPlan, page: PageRequest) -> Result<Page, Error> {
        let (limit, offset) = page.resolve(&self.settings.pagination);
        let plan = plan.paginate(Some(limit), offset)?;

        Ok(fetch_page(self.executor, &plan).await?)
    }
}

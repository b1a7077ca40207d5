//! Evaluation Service
//!
//! Wires a record source, the result cache and seeded synthesis together.
//! Network-backed reads go through the cache; the comparison itself is the
//! pure engine over whatever records were obtained.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::analysis::{
    cap_for_display, compare_on, rank_dimensions, select_dimensions, ComparisonBasis, ComparisonResult,
    DimensionStats, FilterMode,
};
use crate::cache::{
    comparison_key, CacheNamespace, Fetched, Freshness, FileSessionStore, MemorySessionStore, ResultCache,
    SessionStore, SystemClock,
};
use crate::client::EvaluationSource;
use crate::config::EngineConfig;
use crate::dimensions::{
    Category, CulturalPerspective, DimensionCatalog, DimensionInfo, DimensionKey, PerspectiveCatalog, PerspectiveInfo,
};
use crate::error::{CatalogKind, EngineError, EngineResult, FetchError, FetchErrorKind};
use crate::scoring::{normalize, EvaluationRecord};
use crate::viz::{select_chart, ChartRequest, ViewMode, ViewSettings, VisualizationDecision};

const CATALOG_KEY: &str = "all";

/// Everything the chart layer needs to draw one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub view: ViewSettings,
    pub result: ComparisonResult,
    /// Empty in 6D mode
    pub ranked_dimensions: Vec<DimensionStats>,
    pub selected_dimensions: Vec<DimensionKey>,
    /// `selected_dimensions` truncated to the display cap
    pub displayed_dimensions: Vec<DimensionKey>,
    /// Catalog entries for `selected_dimensions`
    pub dimensions: Vec<DimensionInfo>,
    /// Catalog entries for the perspectives in `result.cultural_analysis`
    #[serde(default)]
    pub perspectives: Vec<PerspectiveInfo>,
    pub decision: VisualizationDecision,
    /// Inputs that were served from stale fallback data
    pub stale_inputs: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl ComparisonReport {
    /// True when any input came from an expired fallback
    pub fn is_degraded(&self) -> bool {
        !self.stale_inputs.is_empty()
    }

    pub fn has_synthesized_data(&self) -> bool {
        self.result.subjects.iter().any(|r| r.is_synthesized())
    }

    /// Stats for `displayed_dimensions`, in that order
    pub fn displayed_stats(&self) -> Vec<&DimensionStats> {
        self.displayed_dimensions
            .iter()
            .filter_map(|d| self.ranked_dimensions.iter().find(|s| s.dim == *d))
            .collect()
    }
}

pub struct EvaluationService<S: EvaluationSource> {
    source: S,
    cache: ResultCache,
    config: EngineConfig,
    rng: Mutex<StdRng>,
}

impl<S: EvaluationSource> EvaluationService<S> {
    /// Cache and session store built from `config`
    pub fn new(source: S, config: EngineConfig) -> Self {
        let session: Arc<dyn SessionStore> = match &config.session_store_path {
            Some(path) => Arc::new(FileSessionStore::new(path.clone())),
            None => Arc::new(MemorySessionStore::new()),
        };
        let cache = ResultCache::new(Arc::new(SystemClock), config.cache_ttl, session);
        Self::with_cache(source, config, cache)
    }

    pub fn with_cache(source: S, config: EngineConfig, cache: ResultCache) -> Self {
        let rng = match config.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { source, cache, config, rng: Mutex::new(rng) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn normalize(&self, record: &EvaluationRecord) -> EvaluationRecord {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        normalize(record, &mut *rng)
    }

    // ──────────────────────────────────────────────────────────────────────────
    // CATALOGS
    // ──────────────────────────────────────────────────────────────────────────

    /// An invalid catalog counts as a failed fetch, so it never replaces a
    /// good snapshot.
    pub async fn dimension_catalog(&self) -> EngineResult<Fetched<DimensionCatalog>> {
        self.cache
            .get_or_fetch(CacheNamespace::DimensionCatalog, CATALOG_KEY, || async {
                let catalog = self.source.fetch_dimension_catalog().await?;
                reject_invalid(CatalogKind::Dimensions, catalog.validate())?;
                Ok::<_, FetchError>(catalog)
            })
            .await
            .map_err(|e| catalog_unavailable(CatalogKind::Dimensions, e))
    }

    pub async fn perspective_catalog(&self) -> EngineResult<Fetched<PerspectiveCatalog>> {
        self.cache
            .get_or_fetch(CacheNamespace::PerspectiveCatalog, CATALOG_KEY, || async {
                let catalog = self.source.fetch_perspective_catalog().await?;
                reject_invalid(CatalogKind::Perspectives, catalog.validate())?;
                Ok::<_, FetchError>(catalog)
            })
            .await
            .map_err(|e| catalog_unavailable(CatalogKind::Perspectives, e))
    }

    // ──────────────────────────────────────────────────────────────────────────
    // EVALUATIONS
    // ──────────────────────────────────────────────────────────────────────────

    /// One subject's normalized record. Synthesized 47D values are cached with
    /// the record, so repeated reads within the TTL see the same jitter.
    pub async fn evaluation(&self, subject_id: &str) -> EngineResult<Fetched<EvaluationRecord>> {
        self.cache
            .get_or_fetch(CacheNamespace::Evaluations, subject_id, || async move {
                let raw = self.source.fetch_evaluation(subject_id).await?;
                Ok::<_, FetchError>(self.normalize(&raw.into_record()))
            })
            .await
    }

    /// Records for each id, in order. The first unrecoverable fetch aborts.
    pub async fn evaluations(&self, subject_ids: &[String]) -> EngineResult<Vec<Fetched<EvaluationRecord>>> {
        let mut records = Vec::with_capacity(subject_ids.len());
        for id in subject_ids {
            records.push(self.evaluation(id).await?);
        }
        Ok(records)
    }

    // ──────────────────────────────────────────────────────────────────────────
    // COMPARISON
    // ──────────────────────────────────────────────────────────────────────────

    pub async fn compare_subjects(&self, subject_ids: &[String], view_mode: ViewMode) -> EngineResult<ComparisonReport> {
        self.compare_with(subject_ids, ViewSettings::new(view_mode)).await
    }

    /// Fetch, normalize and compare the given subjects under `view`.
    ///
    /// 6D comparisons run on categories and never touch the dimension
    /// catalog. 47D comparisons need it and fail with `CatalogUnavailable`
    /// when neither the source nor any fallback can provide it.
    pub async fn compare_with(&self, subject_ids: &[String], view: ViewSettings) -> EngineResult<ComparisonReport> {
        let ids = dedup(subject_ids);
        if ids.len() < 2 {
            return Err(EngineError::InsufficientSubjects { found: ids.len() });
        }

        let mut stale_inputs = Vec::new();

        let catalog = match view.view_mode {
            ViewMode::SixD => None,
            ViewMode::FortySevenD => {
                let fetched = self.dimension_catalog().await?;
                if fetched.is_degraded() {
                    stale_inputs.push("dimension_catalog".to_string());
                }
                Some(fetched.value)
            }
        };

        let mut records = Vec::with_capacity(ids.len());
        for fetched in self.evaluations(&ids).await? {
            if fetched.is_degraded() {
                stale_inputs.push(format!("evaluation:{}", fetched.value.subject_id));
            }
            records.push(fetched.value);
        }

        let basis = match view.view_mode {
            ViewMode::SixD => ComparisonBasis::Categories,
            ViewMode::FortySevenD => ComparisonBasis::Dimensions,
        };
        let result = self.comparison(&records, basis).await?;

        let (ranked, selected) = match view.view_mode {
            ViewMode::SixD => (Vec::new(), Vec::new()),
            ViewMode::FortySevenD => {
                let ranked = rank_dimensions(&result.subjects);
                let custom_count = match view.filter_mode {
                    FilterMode::Custom => Some(view.custom_count.unwrap_or(self.config.default_custom_count)),
                    _ => None,
                };
                let selected = select_dimensions(&ranked, view.filter_mode, custom_count);
                (ranked, selected)
            }
        };
        let displayed = cap_for_display(selected.clone(), self.config.display_cap);

        let dimension_count = match view.view_mode {
            ViewMode::SixD => Category::ALL.len(),
            ViewMode::FortySevenD => displayed.len(),
        };
        let decision = select_chart(&ChartRequest {
            view_mode: view.view_mode,
            view_level: view.view_level,
            subject_count: result.subjects.len(),
            dimension_count,
        });

        let dimensions = catalog.map(|c| c.subset(&selected)).unwrap_or_default();

        let in_use: Vec<CulturalPerspective> = result.cultural_analysis.keys().copied().collect();
        let perspectives = if in_use.is_empty() {
            Vec::new()
        } else {
            match self.perspective_catalog().await {
                Ok(fetched) => {
                    if fetched.is_degraded() {
                        stale_inputs.push("perspective_catalog".to_string());
                    }
                    fetched.value.subset(&in_use)
                }
                Err(e) => {
                    warn!(error = %e, "perspective catalog unavailable, using built-in descriptions");
                    PerspectiveCatalog::builtin().subset(&in_use)
                }
            }
        };

        if !stale_inputs.is_empty() {
            warn!(stale = ?stale_inputs, "comparison built from stale data");
        }
        info!(
            subjects = result.subjects.len(),
            view = %view.view_mode,
            chart = ?decision.chart_type,
            "comparison ready"
        );

        Ok(ComparisonReport {
            view,
            result,
            ranked_dimensions: ranked,
            selected_dimensions: selected,
            displayed_dimensions: displayed,
            dimensions,
            perspectives,
            decision,
            stale_inputs,
            generated_at: Utc::now(),
        })
    }

    /// Cached by subject ids, their evaluation timestamps and the basis
    async fn comparison(&self, records: &[EvaluationRecord], basis: ComparisonBasis) -> EngineResult<ComparisonResult> {
        let parts: Vec<String> =
            records.iter().map(|r| format!("{}@{}", r.subject_id, r.evaluated_at.to_rfc3339())).collect();
        let scope = match basis {
            ComparisonBasis::Categories => "6d",
            ComparisonBasis::Dimensions => "47d",
        };
        let key = comparison_key(&parts, scope);

        if let Some(result) = self.cache.peek::<ComparisonResult>(CacheNamespace::Comparisons, &key).await {
            if result.subjects.len() + result.excluded_subjects.len() == records.len() {
                debug!(key = %key, "comparison served from cache");
                return Ok(reorder(result, records));
            }
        }

        let result = compare_on(records, basis)?;
        if let Err(e) = self.cache.put(CacheNamespace::Comparisons, &key, &result).await {
            warn!(error = %e, "failed to cache comparison");
        }
        Ok(result)
    }
}

fn catalog_unavailable(catalog: CatalogKind, err: EngineError) -> EngineError {
    match err {
        EngineError::Fetch(e) => {
            warn!(catalog = %catalog, error = %e, "catalog unavailable, no fallback");
            EngineError::CatalogUnavailable { catalog, cause: e.to_string() }
        }
        other => other,
    }
}

fn reject_invalid(catalog: CatalogKind, problems: Vec<String>) -> Result<(), FetchError> {
    if problems.is_empty() {
        return Ok(());
    }
    warn!(catalog = %catalog, problems = ?problems, "rejecting invalid catalog");
    Err(FetchError::new(FetchErrorKind::Decode, catalog.endpoint(), problems.join("; ")))
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect()
}

/// The cache key ignores input order; a hit computed for another order is
/// recomputed so matrices line up with the caller's subject order.
fn reorder(cached: ComparisonResult, records: &[EvaluationRecord]) -> ComparisonResult {
    let same_order = cached
        .subjects
        .iter()
        .map(|r| r.subject_id.as_str())
        .eq(records.iter().filter(|r| !cached.excluded_subjects.contains(&r.subject_id)).map(|r| r.subject_id.as_str()));
    if same_order {
        return cached;
    }
    compare_on(records, cached.basis).unwrap_or(cached)
}

/// Stale-vs-live summary of a set of fetches, for status displays
pub fn freshness_summary<T>(fetched: &[Fetched<T>]) -> (usize, usize, usize) {
    fetched.iter().fold((0, 0, 0), |(live, cached, stale), f| match f.freshness {
        Freshness::Live => (live + 1, cached, stale),
        Freshness::Cached => (live, cached + 1, stale),
        Freshness::StaleFallback { .. } => (live, cached, stale + 1),
    })
}

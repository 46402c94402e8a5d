use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::alignment::{calculate_alignment, zone_surfaces, AlignmentResult, ZoneSurfaceResult};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Requirement};
use crate::influence::{
    influence_status, BatterInfluence, CohortSelection, EligibleBatter, InfluenceAnalyzer,
    InfluenceCohortResult, InfluenceStatus,
};
use crate::names::{NameDirectory, NameLookup};
use crate::pitch::BatSide;
use crate::table::{BatterListing, PitchFilter, PitchTable, TableSummary, UmpireListing};

const MAX_LISTED_BATTERS: usize = 100;
const MAX_LISTED_UMPIRES: usize = 100;
const MAX_ELIGIBLE_BATTERS: usize = 50;

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AnalysisConfig>,
    pub table: Arc<PitchTable>,
    pub names: Arc<NameDirectory>,
}

impl AppState {
    pub fn new(config: AnalysisConfig, table: PitchTable, names: NameDirectory) -> Self {
        Self {
            config: Arc::new(config),
            table: Arc::new(table),
            names: Arc::new(names),
        }
    }

    fn analyzer(&self) -> InfluenceAnalyzer<'_> {
        InfluenceAnalyzer::new(&self.config, self.names.as_ref())
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/szas/calculate", post(calculate))
        .route("/api/szas/zones", post(zones))
        .route("/api/data/summary", get(data_summary))
        .route("/api/data/pitch-count", get(pitch_count))
        .route("/api/data/batters", get(batters))
        .route("/api/data/batter/:batter_id", get(batter_profile))
        .route("/api/data/umpires", get(umpires))
        .route("/api/bayesian/analyze", post(analyze_cohort))
        .route("/api/bayesian/analyze-batter/:batter_id", get(analyze_batter))
        .route("/api/bayesian/batters", get(eligible_batters))
        .route("/api/bayesian/status", get(status))
        .with_state(state)
}

// ---------- Errors ----------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({ "error": "Not found", "message": message.into() }),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        let (status, label) = match &err {
            AnalysisError::InsufficientData { .. } => (StatusCode::BAD_REQUEST, "Insufficient data"),
            AnalysisError::MissingColumns { .. } => {
                (StatusCode::BAD_REQUEST, "Data missing required columns")
            }
            AnalysisError::NumericalFitFailure { .. } => (StatusCode::BAD_REQUEST, "Model fit failed"),
        };
        warn!("request rejected: {err}");
        Self {
            status,
            body: json!({ "error": label, "message": err.to_string(), "detail": err }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------- Request types ----------

/// Query-string form of [`PitchFilter`].
#[derive(Deserialize, Debug, Default)]
struct FilterQuery {
    batter_id: Option<u32>,
    umpire_id: Option<u32>,
    bat_side: Option<BatSide>,
}

impl From<FilterQuery> for PitchFilter {
    fn from(q: FilterQuery) -> Self {
        PitchFilter {
            batter_id: q.batter_id,
            umpire_id: q.umpire_id,
            bat_side: q.bat_side,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct CohortRequest {
    batter_ids: Option<Vec<u32>>,
    top_n: Option<usize>,
}

#[derive(Deserialize, Debug)]
struct EligibleQuery {
    min_long_abs: Option<usize>,
}

// ---------- Response types ----------

#[derive(Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    pitches_loaded: usize,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PitchCountPreview {
    pub pitch_count: usize,
    pub sufficient: bool,
    pub minimum_required: usize,
}

#[derive(Serialize)]
struct BatterProfile {
    batter_id: u32,
    name: String,
    bat_sides: Vec<BatSide>,
    is_switch_hitter: bool,
    pitch_count: usize,
    pitches_by_side: BTreeMap<BatSide, usize>,
}

// ---------- Handlers ----------

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        service: "SZAS API",
        version: env!("CARGO_PKG_VERSION"),
        pitches_loaded: state.table.len(),
    })
}

fn filtered_for_alignment(state: &AppState, filter: &PitchFilter) -> Result<PitchTable, ApiError> {
    let subset = state.table.filter(filter);
    let min = state.config.thresholds.min_alignment_pitches;
    if subset.len() < min {
        return Err(AnalysisError::insufficient(Requirement::AlignmentPitches, min, subset.len()).into());
    }
    Ok(subset)
}

async fn calculate(
    State(state): State<AppState>,
    Json(filter): Json<PitchFilter>,
) -> ApiResult<AlignmentResult> {
    let subset = filtered_for_alignment(&state, &filter)?;
    info!("alignment request {:?}: {} pitches", filter, subset.len());
    Ok(Json(calculate_alignment(subset.records(), &state.config)))
}

async fn zones(
    State(state): State<AppState>,
    Json(filter): Json<PitchFilter>,
) -> Json<ZoneSurfaceResult> {
    let subset = state.table.filter(&filter);
    info!("zone surface request {:?}: {} pitches", filter, subset.len());
    Json(zone_surfaces(subset.records(), &state.config))
}

async fn data_summary(State(state): State<AppState>) -> Json<TableSummary> {
    Json(state.table.summary())
}

async fn pitch_count(
    State(state): State<AppState>,
    Query(q): Query<FilterQuery>,
) -> Json<PitchCountPreview> {
    let count = state.table.count_matching(&q.into());
    let minimum_required = state.config.thresholds.min_alignment_pitches;
    Json(PitchCountPreview {
        pitch_count: count,
        sufficient: count >= minimum_required,
        minimum_required,
    })
}

async fn batters(State(state): State<AppState>) -> Json<Vec<BatterListing>> {
    let mut roster = state
        .table
        .batter_roster(state.config.thresholds.min_roster_pitches, state.names.as_ref());
    roster.truncate(MAX_LISTED_BATTERS);
    Json(roster)
}

async fn batter_profile(
    State(state): State<AppState>,
    Path(batter_id): Path<u32>,
) -> ApiResult<BatterProfile> {
    let records = state.table.batter_records(batter_id);
    if records.is_empty() {
        return Err(ApiError::not_found(format!("batter {batter_id} not found")));
    }
    let mut pitches_by_side = BTreeMap::new();
    for side in records.iter().filter_map(|r| r.side) {
        *pitches_by_side.entry(side).or_insert(0) += 1;
    }
    let bat_sides: Vec<BatSide> = pitches_by_side.keys().copied().collect();
    Ok(Json(BatterProfile {
        batter_id,
        name: state.names.display_name(batter_id),
        is_switch_hitter: bat_sides.len() > 1,
        bat_sides,
        pitch_count: records.len(),
        pitches_by_side,
    }))
}

async fn umpires(State(state): State<AppState>) -> Json<Vec<UmpireListing>> {
    let mut roster = state.table.umpire_roster();
    roster.truncate(MAX_LISTED_UMPIRES);
    Json(roster)
}

async fn analyze_cohort(
    State(state): State<AppState>,
    req: Option<Json<CohortRequest>>,
) -> ApiResult<InfluenceCohortResult> {
    // a bare POST means the default top-N cohort
    let req = req.map(|Json(r)| r).unwrap_or_default();
    state.table.columns().require(&crate::table::AT_BAT_TRACKING)?;
    let selection = match req.batter_ids {
        Some(ids) if !ids.is_empty() => CohortSelection::Batters(ids),
        _ => CohortSelection::TopByPitches(req.top_n.unwrap_or(state.config.default_cohort_size)),
    };
    info!("influence cohort request: {:?}", selection);
    Ok(Json(state.analyzer().analyze_cohort(&state.table, &selection)))
}

async fn analyze_batter(
    State(state): State<AppState>,
    Path(batter_id): Path<u32>,
) -> ApiResult<BatterInfluence> {
    Ok(Json(state.analyzer().analyze_batter(&state.table, batter_id)?))
}

async fn eligible_batters(
    State(state): State<AppState>,
    Query(q): Query<EligibleQuery>,
) -> ApiResult<Vec<EligibleBatter>> {
    let min_long_abs = q.min_long_abs.unwrap_or(state.config.default_min_long_abs);
    let mut out = state.analyzer().available_batters(&state.table, min_long_abs)?;
    out.truncate(MAX_ELIGIBLE_BATTERS);
    Ok(Json(out))
}

async fn status(State(state): State<AppState>) -> Json<InfluenceStatus> {
    Json(influence_status(&state.table))
}

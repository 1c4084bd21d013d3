use crate::chart::{self, ChartView};
use crate::config::AppConfig;
use crate::data::{normalize_ags, SourceData};
use crate::map::{ClickOutcome, MapLayer, MapView};
use crate::selection::SelectionStore;
use crate::selector::{Selector, SelectorEntry};
use crate::types::Selection;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub view: MapView,
    pub selector: Selector,
    pub selection: SelectionStore,
    pub statistic: RwLock<String>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, data: SourceData) -> Result<Self> {
        Ok(Self {
            view: MapView::new(data, config.style.clone())?,
            selector: Selector::new(config.datasets.clone()),
            selection: SelectionStore::new(),
            statistic: RwLock::new(config.default_statistic()),
            config,
        })
    }
}

#[derive(Deserialize)]
pub struct StatisticRequest {
    value: String,
}

#[derive(Deserialize)]
pub struct LayerParams {
    statistic: Option<String>,
}

#[derive(Deserialize)]
pub struct ClickRequest {
    ags: String,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    ags: String,
    name: String,
    statistic: String,
    value: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let tile_service = ServeDir::new(&state.config.output.tile_dir);
    let static_service = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/api/datasets", get(datasets_handler))
        .route("/api/statistic", put(statistic_handler))
        .route("/api/layer", get(layer_handler))
        .route("/api/click", post(click_handler))
        .route("/api/query", get(query_handler))
        .route("/api/selection", get(selection_handler).delete(clear_selection_handler))
        .route("/api/chart", get(chart_handler))
        .nest_service("/tiles", tile_service)
        .fallback_service(static_service)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, data: SourceData) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, data)?);

    tokio::spawn(log_selection_changes(state.selection.subscribe()));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn log_selection_changes(mut rx: watch::Receiver<Option<Selection>>) {
    while rx.changed().await.is_ok() {
        match rx.borrow_and_update().as_ref() {
            Some(s) => info!(ags = %s.ags, name = %s.gen, "Selected municipality"),
            None => info!("Selection cleared"),
        }
    }
}

async fn datasets_handler(State(state): State<Arc<AppState>>) -> Json<Vec<SelectorEntry>> {
    let active = state.statistic.read().await;
    Json(state.selector.entries(&active))
}

async fn statistic_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StatisticRequest>,
) -> Result<Json<Vec<SelectorEntry>>, StatusCode> {
    let chosen = state.selector.choose(&request.value).ok_or(StatusCode::NOT_FOUND)?;
    info!("Active statistic: {}", chosen);
    let entries = state.selector.entries(&chosen);
    *state.statistic.write().await = chosen;
    Ok(Json(entries))
}

async fn layer_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LayerParams>,
) -> Json<Option<MapLayer>> {
    let statistic = match params.statistic {
        Some(s) => s,
        None => state.statistic.read().await.clone(),
    };
    let selection = state.selection.get();
    Json(state.view.layer(&statistic, selection.as_ref()))
}

async fn click_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClickRequest>,
) -> Result<Json<ClickOutcome>, StatusCode> {
    let statistic = state.statistic.read().await.clone();
    state.view.click(&state.selection, &normalize_ags(&request.ags), &statistic)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let statistic = state.statistic.read().await.clone();
    let response = state.view.feature_at(params.lon, params.lat).map(|feature| {
        let value = state.view.records()
            .and_then(|r| r.get(&feature.ags))
            .and_then(|r| r.raw(&statistic))
            .map(str::to_string);
        QueryResponse {
            ags: feature.ags.clone(),
            name: feature.name.clone(),
            statistic: statistic.clone(),
            value,
        }
    });
    Json(response)
}

async fn selection_handler(State(state): State<Arc<AppState>>) -> Json<Option<Selection>> {
    Json(state.selection.get())
}

async fn clear_selection_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.selection.clear();
    StatusCode::NO_CONTENT
}

async fn chart_handler(State(state): State<Arc<AppState>>) -> Json<ChartView> {
    let statistic = state.statistic.read().await.clone();
    let selection = state.selection.get();
    Json(chart::breakdown(state.view.records(), selection.as_ref(), &statistic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{config, sources};

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(config(), sources()).unwrap())
    }

    fn click(ags: &str) -> Json<ClickRequest> {
        Json(ClickRequest { ags: ags.to_string() })
    }

    #[test]
    fn router_builds() {
        let _ = router(state());
    }

    #[tokio::test]
    async fn switching_statistic_rekeys_the_layer() {
        let state = state();

        let Json(layer) = layer_handler(State(state.clone()), Query(LayerParams { statistic: None })).await;
        assert_eq!(layer.unwrap().key, "question_01");

        let Json(entries) = statistic_handler(
            State(state.clone()),
            Json(StatisticRequest { value: "question_02".to_string() }),
        )
        .await
        .unwrap();
        assert!(entries.iter().any(|e| e.value == "question_02" && e.selected));

        let Json(layer) = layer_handler(State(state.clone()), Query(LayerParams { statistic: None })).await;
        assert_eq!(layer.unwrap().key, "question_02");

        let unknown = statistic_handler(State(state), Json(StatisticRequest { value: "nope".to_string() })).await;
        assert_eq!(unknown.err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn click_then_chart_then_click_again() {
        let state = state();

        // Unpadded code is normalised before lookup
        let Json(outcome) = click_handler(State(state.clone()), click("1002")).await.unwrap();
        assert!(matches!(outcome, ClickOutcome::Selected { .. }));

        let Json(selected) = selection_handler(State(state.clone())).await;
        assert_eq!(selected.map(|s| s.gen), Some("Kiel".to_string()));

        let Json(view) = chart_handler(State(state.clone())).await;
        let ChartView::Pie { slices, .. } = view else {
            panic!("expected a pie");
        };
        let names: Vec<&str> = slices.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Flensburg", "Kiel"]);

        let Json(outcome) = click_handler(State(state.clone()), click("01002")).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Cleared);

        let Json(view) = chart_handler(State(state.clone())).await;
        assert!(matches!(view, ChartView::NoSelection { .. }));

        assert_eq!(click_handler(State(state), click("77777")).await.err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn delete_clears_selection() {
        let state = state();
        click_handler(State(state.clone()), click("09162")).await.unwrap();
        assert_eq!(clear_selection_handler(State(state.clone())).await, StatusCode::NO_CONTENT);
        assert_eq!(state.selection.get(), None);
    }

    #[tokio::test]
    async fn point_query_reports_value() {
        let state = state();
        let Json(hit) = query_handler(State(state.clone()), Query(QueryParams { lat: 54.5, lon: 10.5 })).await;
        let hit = hit.unwrap();
        assert_eq!(hit.ags, "01002");
        assert_eq!(hit.value.as_deref(), Some("30"));

        let Json(miss) = query_handler(State(state), Query(QueryParams { lat: 0.0, lon: 0.0 })).await;
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn chart_without_records_says_no_data() {
        let mut data = sources();
        data.records = None;
        let state = Arc::new(AppState::new(config(), data).unwrap());

        click_handler(State(state.clone()), click("01001")).await.unwrap();
        let Json(view) = chart_handler(State(state)).await;
        assert_eq!(
            view,
            ChartView::NoData {
                selected: Selection { ags: "01001".to_string(), gen: "Flensburg".to_string() },
                message: chart::NO_DATA,
            }
        );
    }
}

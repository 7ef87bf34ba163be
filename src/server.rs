//! HTTP surface of the panel: JSON views and the token-protected `/refresh` hook.

use crate::error::PanelError;
use crate::forecast::builder::DatasetBuilder;
use crate::panel::HumidityPanel;
use crate::types::classification::HumidityClass;
use crate::types::day_key::Clock;
use crate::views::filter::{parse_states, PanelFilter};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Filter values shared by the map and class listing routes.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub uf: Option<String>,
    pub municipality: Option<String>,
    pub date: Option<String>,
}

impl ViewQuery {
    fn filter(&self) -> PanelFilter {
        PanelFilter::from_query(
            self.uf.as_deref(),
            self.municipality.as_deref(),
            self.date.as_deref(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// All routes, logged under the `inmet_humidity::http` target.
///
/// `refresh_token` protects `/refresh`; an empty token leaves it open.
pub fn routes<B, C>(
    panel: Arc<HumidityPanel<B, C>>,
    refresh_token: String,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    B: DatasetBuilder + 'static,
    C: Clock + 'static,
{
    let status = warp::get()
        .and(warp::path!("api" / "status"))
        .and(with_panel(&panel))
        .and_then(status_handler::<B, C>);

    let dates = warp::get()
        .and(warp::path!("api" / "dates"))
        .and(with_panel(&panel))
        .and_then(dates_handler::<B, C>);

    let states = warp::get()
        .and(warp::path!("api" / "states"))
        .and(with_panel(&panel))
        .and_then(states_handler::<B, C>);

    let municipalities = warp::get()
        .and(warp::path!("api" / "municipalities"))
        .and(warp::query::<ViewQuery>())
        .and(with_panel(&panel))
        .and_then(municipalities_handler::<B, C>);

    let map = warp::get()
        .and(warp::path!("api" / "map"))
        .and(warp::query::<ViewQuery>())
        .and(with_panel(&panel))
        .and_then(map_handler::<B, C>);

    let trend = warp::get()
        .and(warp::path!("api" / "municipalities" / String / "trend"))
        .and(with_panel(&panel))
        .and_then(trend_handler::<B, C>);

    let classes = warp::get()
        .and(warp::path!("api" / "classes" / String))
        .and(warp::query::<ViewQuery>())
        .and(with_panel(&panel))
        .and_then(class_list_handler::<B, C>);

    let token = Arc::new(refresh_token);
    let refresh = warp::get()
        .or(warp::post())
        .unify()
        .and(warp::path!("refresh"))
        .and(warp::query::<RefreshQuery>())
        .and(warp::any().map(move || Arc::clone(&token)))
        .and(with_panel(&panel))
        .and_then(refresh_handler::<B, C>);

    status
        .or(dates)
        .or(states)
        .or(municipalities)
        .or(map)
        .or(trend)
        .or(classes)
        .or(refresh)
        .with(warp::log("inmet_humidity::http"))
}

fn with_panel<B, C>(
    panel: &Arc<HumidityPanel<B, C>>,
) -> impl Filter<Extract = (Arc<HumidityPanel<B, C>>,), Error = Infallible> + Clone
where
    B: DatasetBuilder + 'static,
    C: Clock + 'static,
{
    let panel = Arc::clone(panel);
    warp::any().map(move || Arc::clone(&panel))
}

fn json_response<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn error_response(message: impl Into<String>, status: StatusCode) -> Response {
    json_response(
        &ErrorBody {
            error: message.into(),
        },
        status,
    )
}

fn respond<T: Serialize>(result: Result<T, PanelError>) -> Response {
    match result {
        Ok(value) => json_response(&value, StatusCode::OK),
        Err(e) => {
            error!("Request failed: {}", e);
            error_response(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn status_handler<B: DatasetBuilder, C: Clock>(
    panel: Arc<HumidityPanel<B, C>>,
) -> Result<Response, Infallible> {
    Ok(respond(panel.status().await))
}

async fn dates_handler<B: DatasetBuilder, C: Clock>(
    panel: Arc<HumidityPanel<B, C>>,
) -> Result<Response, Infallible> {
    Ok(respond(panel.dates().await))
}

async fn states_handler<B: DatasetBuilder, C: Clock>(
    panel: Arc<HumidityPanel<B, C>>,
) -> Result<Response, Infallible> {
    Ok(respond(panel.states().await))
}

async fn municipalities_handler<B: DatasetBuilder, C: Clock>(
    query: ViewQuery,
    panel: Arc<HumidityPanel<B, C>>,
) -> Result<Response, Infallible> {
    let states = query.uf.as_deref().map(parse_states).unwrap_or_default();
    Ok(respond(panel.municipalities(&states).await))
}

async fn map_handler<B: DatasetBuilder, C: Clock>(
    query: ViewQuery,
    panel: Arc<HumidityPanel<B, C>>,
) -> Result<Response, Infallible> {
    Ok(respond(panel.map(&query.filter()).await))
}

async fn trend_handler<B: DatasetBuilder, C: Clock>(
    code: String,
    panel: Arc<HumidityPanel<B, C>>,
) -> Result<Response, Infallible> {
    Ok(match panel.trend(&code).await {
        Ok(Some(trend)) => json_response(&trend, StatusCode::OK),
        Ok(None) => error_response(
            format!("Unknown municipality '{}'", code),
            StatusCode::NOT_FOUND,
        ),
        Err(e) => respond::<()>(Err(e)),
    })
}

async fn class_list_handler<B: DatasetBuilder, C: Clock>(
    class: String,
    query: ViewQuery,
    panel: Arc<HumidityPanel<B, C>>,
) -> Result<Response, Infallible> {
    let class: HumidityClass = match class.parse() {
        Ok(class) => class,
        Err(e) => return Ok(error_response(format!("{}", e), StatusCode::BAD_REQUEST)),
    };
    Ok(respond(panel.class_list(class, &query.filter()).await))
}

async fn refresh_handler<B: DatasetBuilder, C: Clock>(
    query: RefreshQuery,
    token: Arc<String>,
    panel: Arc<HumidityPanel<B, C>>,
) -> Result<Response, Infallible> {
    if !token.is_empty() && query.token.as_deref() != Some(token.as_str()) {
        return Ok(warp::reply::with_status("forbidden", StatusCode::FORBIDDEN).into_response());
    }

    Ok(match panel.refresh().await {
        Ok(dataset) => {
            info!(
                "Refreshed dataset for {} ({} rows)",
                dataset.day_key(),
                dataset.len()
            );
            json_response(&json!({"ok": true}), StatusCode::OK)
        }
        Err(e) => {
            error!("Refresh failed: {}", e);
            json_response(
                &json!({"ok": false, "error": e.to_string()}),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    })
}

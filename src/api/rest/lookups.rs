use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::models::vendor::Location;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/get-service/categories/", get(categories))
        .route("/api/district-blocks/", get(district_blocks))
}

async fn categories(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let categories: BTreeSet<String> = state
        .vendors
        .iter()
        .flat_map(|entry| entry.value().categories.clone())
        .collect();

    Json(categories.into_iter().collect())
}

async fn district_blocks(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, Vec<String>>> {
    let mut locations: Vec<Location> = state
        .vendors
        .iter()
        .map(|entry| entry.value().location.clone())
        .collect();
    locations.extend(
        state
            .customers
            .iter()
            .map(|entry| entry.value().location.clone()),
    );

    Json(group_blocks(locations))
}

fn group_blocks(locations: Vec<Location>) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for location in locations {
        if location.district.is_empty() {
            continue;
        }
        let blocks = grouped.entry(location.district).or_default();
        if !location.block.is_empty() {
            blocks.insert(location.block);
        }
    }

    grouped
        .into_iter()
        .map(|(district, blocks)| (district, blocks.into_iter().collect()))
        .collect()
}

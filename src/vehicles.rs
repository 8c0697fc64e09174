//! Vehicle listing endpoint

use axum::{extract::State, routing::get, Json, Router};
use tracing::error;

use crate::{
    database::{Database, Row},
    errors::ApiError,
};

pub const LIST_VEHICLES_SQL: &str = "SELECT * FROM vehicles LIMIT 10";

/// Routes for the vehicles resource, relative to its mount prefix
pub fn vehicle_routes(db: Database) -> Router {
    Router::new()
        .route("/", get(list_vehicles))
        .with_state(db)
}

/// Return up to ten vehicle rows as a JSON array.
///
/// Query string parameters are ignored.
pub async fn list_vehicles(State(db): State<Database>) -> Result<Json<Vec<Row>>, ApiError> {
    match db.query(LIST_VEHICLES_SQL, &[]).await {
        Ok(result) => Ok(Json(result.rows)),
        Err(e) => {
            error!("Failed to fetch vehicles: {}", e);
            Err(ApiError::QueryFailure(e))
        }
    }
}

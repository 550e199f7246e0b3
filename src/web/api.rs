use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::climate::{ClimateRequest, ClimateSnapshot};
use crate::device_manager::{DeviceError, DeviceSnapshot, SharedManager, lock_manager};
use crate::discovery::DeviceClass;
use crate::light::{LightRequest, LightSnapshot};
use crate::sensor::SensorSnapshot;
use crate::water_heater::{WaterHeaterRequest, WaterHeaterSnapshot};

#[derive(Clone)]
pub struct AppState {
    pub manager: SharedManager,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceSnapshot>,
    pub sensors: Vec<SensorSnapshot>,
}

/// Body of `POST /api/names`.
#[derive(Debug, Clone, Deserialize)]
pub struct NameRequest {
    pub class: DeviceClass,
    pub instance: u8,
    pub name: String,
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn respond<T>(result: Result<T, DeviceError>) -> ApiResult<T> {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))),
        Err(e) => {
            let status = match e {
                DeviceError::NotFound { .. } => StatusCode::NOT_FOUND,
                DeviceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                DeviceError::Publish(_) => StatusCode::SERVICE_UNAVAILABLE,
            };
            error!(error = %e, "Device request failed");
            (status, Json(ApiResponse::error(e.to_string())))
        }
    }
}

pub async fn get_devices(State(state): State<AppState>) -> Json<ApiResponse<DevicesResponse>> {
    info!("GET /api/devices called");
    let manager = lock_manager(&state.manager);
    Json(ApiResponse::ok(DevicesResponse {
        devices: manager.devices(),
        sensors: manager.sensors(),
    }))
}

pub async fn post_light(
    State(state): State<AppState>,
    Path(instance): Path<u8>,
    Json(request): Json<LightRequest>,
) -> ApiResult<LightSnapshot> {
    info!(instance, ?request, "POST /api/lights called");
    respond(lock_manager(&state.manager).light_command(instance, &request))
}

pub async fn post_climate(
    State(state): State<AppState>,
    Path(instance): Path<u8>,
    Json(request): Json<ClimateRequest>,
) -> ApiResult<ClimateSnapshot> {
    info!(instance, ?request, "POST /api/climate called");
    respond(lock_manager(&state.manager).climate_command(instance, &request))
}

pub async fn post_water_heater(
    State(state): State<AppState>,
    Path(instance): Path<u8>,
    Json(request): Json<WaterHeaterRequest>,
) -> ApiResult<WaterHeaterSnapshot> {
    info!(instance, ?request, "POST /api/water_heaters called");
    respond(lock_manager(&state.manager).water_heater_command(instance, &request))
}

pub async fn post_name(
    State(state): State<AppState>,
    Json(request): Json<NameRequest>,
) -> ApiResult<DeviceSnapshot> {
    info!(?request, "POST /api/names called");
    respond(lock_manager(&state.manager).name_device(request.class, request.instance, &request.name))
}

pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route("/devices", get(get_devices))
        .route("/lights/:instance", post(post_light))
        .route("/climate/:instance", post(post_climate))
        .route("/water_heaters/:instance", post(post_water_heater))
        .route("/names", post(post_name))
        .with_state(state)
}

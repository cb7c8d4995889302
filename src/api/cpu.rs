use axum::{
    body::Bytes,
    extract::rejection::BytesRejection,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{
    api::error::ApiError,
    cpu::{load_percent, logical_cpus, CpuInfo},
    utils::format_number,
    workload::{self, BenchmarkRating, CalcRating},
};

pub fn router() -> Router {
    Router::new()
        .route("/info", get(cpu_info))
        .route("/test", get(cpu_test))
        .route("/load", post(cpu_load))
        .route("/benchmark", get(cpu_benchmark))
        .route("/calc-test", post(calc_test))
}

/// Reads one field of a JSON object body, tolerating any malformed input by
/// returning `None`.
fn body_field(body: &[u8], field: &str) -> Option<Value> {
    let mut value: Value = serde_json::from_slice(body).ok()?;
    value.get_mut(field).map(Value::take)
}

/// A body that could not be read (over the size limit, aborted upload) is
/// treated like an empty one, so the request runs with defaults.
fn readable_body(body: Result<Bytes, BytesRejection>) -> Bytes {
    body.unwrap_or_else(|rejection| {
        tracing::debug!(%rejection, "unreadable request body, using defaults");
        Bytes::new()
    })
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadRequest {
    /// Seconds of load to generate. Defaults to 5.
    pub duration: f64,
}

impl LoadRequest {
    pub fn from_body(body: &[u8]) -> Self {
        let duration = body_field(body, "duration")
            .and_then(|v| v.as_f64())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(workload::DEFAULT_LOAD_SECONDS);
        Self { duration }
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalcRequest {
    /// Loop iterations. Defaults to 1,000,000.
    pub iterations: u64,
}

impl CalcRequest {
    pub fn from_body(body: &[u8]) -> Self {
        let iterations = body_field(body, "iterations")
            .and_then(|v| v.as_u64())
            .unwrap_or(workload::DEFAULT_CALC_ITERATIONS);
        Self { iterations }
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadAveragePercent {
    pub one_minute: String,
    pub five_minutes: String,
    pub fifteen_minutes: String,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuInfoResponse {
    pub cores: usize,
    pub model: String,
    pub speed: String,
    pub architecture: String,
    pub load_average: LoadAveragePercent,
    pub sampled_at: DateTime<Utc>,
}

fn percent(load: f64, cores: usize) -> String {
    format!("{:.1}%", load_percent(load, cores))
}

#[cfg_attr(feature = "swagger", utoipa::path(
    get,
    path = "/api/cpu/info",
    responses(
        (status = 200, body = CpuInfoResponse),
        (status = 500, body = crate::api::error::ErrorBody),
    ),
    tag = "cpu"
))]
pub async fn cpu_info() -> Result<Json<CpuInfoResponse>, ApiError> {
    let info = CpuInfo::snapshot()?;
    let cores = info.cores;
    Ok(Json(CpuInfoResponse {
        cores,
        speed: format!("{} GHz", format_number(info.speed_ghz())),
        architecture: info.architecture.to_string(),
        load_average: LoadAveragePercent {
            one_minute: percent(info.load.one, cores),
            five_minutes: percent(info.load.five, cores),
            fifteen_minutes: percent(info.load.fifteen, cores),
        },
        model: info.model,
        sampled_at: Utc::now(),
    }))
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuTestResponse {
    pub message: String,
    pub duration_seconds: String,
    pub cores: usize,
    pub note: String,
}

/// GET /api/cpu/test - fixed two second busy loop
#[cfg_attr(feature = "swagger", utoipa::path(
    get,
    path = "/api/cpu/test",
    responses((status = 200, body = CpuTestResponse)),
    tag = "cpu"
))]
pub async fn cpu_test() -> Json<CpuTestResponse> {
    let outcome = workload::fixed_test(logical_cpus());
    let note = if outcome.is_efficient() {
        "CPU handled the test efficiently"
    } else {
        "CPU took longer than expected to complete the test"
    };
    tracing::debug!(elapsed_ms = outcome.elapsed.as_millis() as u64, "cpu test finished");
    Json(CpuTestResponse {
        message: "CPU test completed".to_string(),
        duration_seconds: format_number(outcome.elapsed.as_secs_f64()),
        cores: outcome.cores,
        note: note.to_string(),
    })
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuLoadResponse {
    pub message: String,
    /// Echo of the requested duration, unchanged.
    pub requested_duration: f64,
    pub actual_duration_seconds: String,
    pub cores: usize,
    pub note: String,
}

/// POST /api/cpu/load - one busy loop per core, run back to back
#[cfg_attr(feature = "swagger", utoipa::path(
    post,
    path = "/api/cpu/load",
    request_body = LoadRequest,
    responses((status = 200, body = CpuLoadResponse)),
    tag = "cpu"
))]
pub async fn cpu_load(body: Result<Bytes, BytesRejection>) -> Json<CpuLoadResponse> {
    let req = LoadRequest::from_body(&readable_body(body));
    tracing::info!(duration_secs = req.duration, "starting cpu load");
    let outcome = workload::sequential_load(req.duration, logical_cpus());
    let note = if outcome.within_tolerance() {
        "Load completed within the acceptable time range"
    } else {
        "Load took longer than requested; the CPU may be under heavy pressure"
    };
    Json(CpuLoadResponse {
        message: format!("CPU load generated across {} cores", outcome.cores),
        requested_duration: req.duration,
        actual_duration_seconds: format_number(outcome.elapsed.as_secs_f64()),
        cores: outcome.cores,
        note: note.to_string(),
    })
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResponse {
    pub iterations: u64,
    pub duration_ms: String,
    pub ops_per_second: String,
    pub cpu_score: String,
    pub rating: BenchmarkRating,
}

#[cfg_attr(feature = "swagger", utoipa::path(
    get,
    path = "/api/cpu/benchmark",
    responses((status = 200, body = BenchmarkResponse)),
    tag = "cpu"
))]
pub async fn cpu_benchmark() -> Json<BenchmarkResponse> {
    let outcome = workload::benchmark(workload::BENCHMARK_ITERATIONS);
    let cores = logical_cpus();
    Json(BenchmarkResponse {
        iterations: outcome.iterations,
        duration_ms: format_number(outcome.elapsed.as_secs_f64() * 1000.0),
        ops_per_second: format_number(outcome.ops_per_sec),
        cpu_score: format_number(outcome.score(cores)),
        rating: outcome.rating(),
    })
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcTestResponse {
    /// Iterations performed; equal to the request.
    pub iterations: u64,
    pub duration_ms: String,
    pub ops_per_second: String,
    pub rating: CalcRating,
}

#[cfg_attr(feature = "swagger", utoipa::path(
    post,
    path = "/api/cpu/calc-test",
    request_body = CalcRequest,
    responses((status = 200, body = CalcTestResponse)),
    tag = "cpu"
))]
pub async fn calc_test(body: Result<Bytes, BytesRejection>) -> Json<CalcTestResponse> {
    let req = CalcRequest::from_body(&readable_body(body));
    let outcome = workload::calculation_load_test(req.iterations);
    Json(CalcTestResponse {
        iterations: outcome.iterations,
        duration_ms: format_number(outcome.elapsed.as_secs_f64() * 1000.0),
        ops_per_second: format_number(outcome.ops_per_sec),
        rating: outcome.rating(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(br#"{"duration": 2.5}"#.as_slice(), 2.5)]
    #[case(br#"{"duration": 0}"#.as_slice(), 0.0)]
    #[case(br#"{"duration": -1}"#.as_slice(), 5.0)]
    #[case(br#"{"duration": "10"}"#.as_slice(), 5.0)]
    #[case(br#"{}"#.as_slice(), 5.0)]
    #[case(br#"[1, 2]"#.as_slice(), 5.0)]
    #[case(b"not json".as_slice(), 5.0)]
    #[case(b"".as_slice(), 5.0)]
    fn test_load_request_from_body(#[case] body: &[u8], #[case] expected: f64) {
        assert_eq!(LoadRequest::from_body(body).duration, expected);
    }

    #[rstest]
    #[case(br#"{"iterations": 42}"#.as_slice(), 42)]
    #[case(br#"{"iterations": 0}"#.as_slice(), 0)]
    #[case(br#"{"iterations": -5}"#.as_slice(), 1_000_000)]
    #[case(br#"{"iterations": 2.5}"#.as_slice(), 1_000_000)]
    #[case(br#"{"iterations": null}"#.as_slice(), 1_000_000)]
    #[case(b"".as_slice(), 1_000_000)]
    fn test_calc_request_from_body(#[case] body: &[u8], #[case] expected: u64) {
        assert_eq!(CalcRequest::from_body(body).iterations, expected);
    }

    #[test]
    fn test_percent_one_decimal() {
        assert_eq!(percent(1.0, 4), "25.0%");
        assert_eq!(percent(0.333, 1), "33.3%");
    }

    #[tokio::test]
    async fn test_calc_handler_echoes_iterations() {
        let Json(resp) = calc_test(Ok(Bytes::from_static(br#"{"iterations": 1234}"#))).await;
        assert_eq!(resp.iterations, 1234);
    }
}

use utoipa::OpenApi;

use crate::api::{cpu, error::ErrorBody, health};
use crate::workload::{BenchmarkRating, CalcRating};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CPU Stress API",
        description = "CPU information and synthetic CPU load generation"
    ),
    paths(
        cpu::cpu_info,
        cpu::cpu_test,
        cpu::cpu_load,
        cpu::cpu_benchmark,
        cpu::calc_test,
        health::healthz,
    ),
    components(schemas(
        cpu::CpuInfoResponse,
        cpu::LoadAveragePercent,
        cpu::CpuTestResponse,
        cpu::LoadRequest,
        cpu::CpuLoadResponse,
        cpu::BenchmarkResponse,
        cpu::CalcRequest,
        cpu::CalcTestResponse,
        health::HealthResponse,
        ErrorBody,
        BenchmarkRating,
        CalcRating,
    )),
    tags(
        (name = "cpu", description = "CPU information and load generation"),
        (name = "health", description = "Worker liveness")
    )
)]
pub struct ApiDoc;

/// OpenAPI document advertising `server_url` as the API server.
pub fn document(server_url: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![utoipa::openapi::Server::new(server_url)]);
    doc
}

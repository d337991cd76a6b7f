mod error;

use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    ContributionSearch, DEFAULT_MAX_AGE, DEFAULT_RETIREMENT_AGE, DEFAULT_YEARS_IN_RETIREMENT,
    DecayKind, NestEggRule, Projection, ProjectionConfig, ProjectionInput, TrajectoryPoint,
    point_at_age, run_projection,
};

pub use error::{ApiError, InputError};

const MAX_INPUT_AGE: u32 = 150;
const MAX_CURRENT_SAVINGS: f64 = 5_000_000.0;
const MAX_MONTHLY_CONTRIBUTION: f64 = 50_000.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliNestEggRule {
    WithdrawalRate,
    OverRetirement,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDecay {
    PowerLaw,
    Linear,
}

impl From<CliDecay> for DecayKind {
    fn from(value: CliDecay) -> Self {
        match value {
            CliDecay::PowerLaw => DecayKind::PowerLaw,
            CliDecay::Linear => DecayKind::Linear,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiNestEggRule {
    #[serde(alias = "withdrawalRate", alias = "withdrawal_rate")]
    WithdrawalRate,
    #[serde(alias = "overRetirement", alias = "over_retirement")]
    OverRetirement,
}

impl From<ApiNestEggRule> for CliNestEggRule {
    fn from(value: ApiNestEggRule) -> Self {
        match value {
            ApiNestEggRule::WithdrawalRate => CliNestEggRule::WithdrawalRate,
            ApiNestEggRule::OverRetirement => CliNestEggRule::OverRetirement,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiDecay {
    #[serde(alias = "powerLaw", alias = "power_law")]
    PowerLaw,
    Linear,
}

impl From<ApiDecay> for CliDecay {
    fn from(value: ApiDecay) -> Self {
        match value {
            ApiDecay::PowerLaw => CliDecay::PowerLaw,
            ApiDecay::Linear => CliDecay::Linear,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    max_age: Option<u32>,

    current_savings: Option<f64>,
    monthly_contribution: Option<f64>,
    secondary_monthly_contribution: Option<f64>,
    annual_return_rate: Option<f64>,

    annual_retirement_budget: Option<f64>,
    other_retirement_income: Option<f64>,
    withdrawal_rate: Option<f64>,
    nest_egg_rule: Option<ApiNestEggRule>,
    years_in_retirement: Option<u32>,

    search_min: Option<f64>,
    search_max: Option<f64>,
    search_iterations: Option<u32>,

    decay: Option<ApiDecay>,
    lookup_age: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nestegg",
    about = "Retirement projection: balance at retirement, runout age and target contribution"
)]
struct Cli {
    #[arg(long, default_value_t = 35)]
    current_age: u32,
    #[arg(long, default_value_t = DEFAULT_RETIREMENT_AGE)]
    retirement_age: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_AGE,
        help = "Age the runout walk and chart extrapolation stop at"
    )]
    max_age: u32,
    #[arg(long, default_value_t = 30_000.0)]
    current_savings: f64,
    #[arg(long, default_value_t = 500.0)]
    monthly_contribution: f64,
    #[arg(
        long,
        default_value_t = 200.0,
        help = "Monthly contribution to the secondary stream, which starts from zero"
    )]
    secondary_monthly_contribution: f64,
    #[arg(long, default_value_t = 7.0, help = "Expected annual return in percent")]
    annual_return_rate: f64,
    #[arg(long, default_value_t = 40_000.0)]
    annual_retirement_budget: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Annual income in retirement not drawn from savings (pensions, rent)"
    )]
    other_retirement_income: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Share of savings spent per year in retirement, in percent"
    )]
    withdrawal_rate: f64,
    #[arg(long, value_enum, default_value_t = CliNestEggRule::WithdrawalRate)]
    nest_egg_rule: CliNestEggRule,
    #[arg(
        long,
        default_value_t = DEFAULT_YEARS_IN_RETIREMENT,
        help = "Retirement years assumed by --nest-egg-rule=over-retirement"
    )]
    years_in_retirement: u32,
    #[arg(long, default_value_t = -1_000_000.0, allow_negative_numbers = true)]
    search_min: f64,
    #[arg(long, default_value_t = 1_000_000.0, allow_negative_numbers = true)]
    search_max: f64,
    #[arg(long, default_value_t = 40)]
    search_iterations: u32,
    #[arg(long, value_enum, default_value_t = CliDecay::PowerLaw)]
    decay: CliDecay,
    #[arg(long, help = "Also report the chart point for this age")]
    lookup_age: Option<u32>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: ProjectionInput,
    config: ProjectionConfig,
    lookup_age: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse<'a> {
    #[serde(flatten)]
    projection: &'a Projection,
    lookup_age: Option<u32>,
    lookup_point: Option<TrajectoryPoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn check_range(
    flag: &'static str,
    value: f64,
    min: f64,
    max: f64,
    requirement: &'static str,
) -> Result<(), InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite { flag });
    }
    if !(min..=max).contains(&value) {
        return Err(InputError::OutOfRange { flag, requirement });
    }
    Ok(())
}

fn build_inputs(cli: Cli) -> Result<(ProjectionInput, ProjectionConfig), InputError> {
    for (flag, age) in [
        ("--current-age", cli.current_age),
        ("--retirement-age", cli.retirement_age),
        ("--max-age", cli.max_age),
    ] {
        if age > MAX_INPUT_AGE {
            return Err(InputError::OutOfRange {
                flag,
                requirement: "at most 150",
            });
        }
    }

    if cli.max_age < cli.retirement_age {
        return Err(InputError::OutOfRange {
            flag: "--max-age",
            requirement: ">= --retirement-age",
        });
    }

    check_range(
        "--current-savings",
        cli.current_savings,
        0.0,
        MAX_CURRENT_SAVINGS,
        "between 0 and 5000000",
    )?;

    for (flag, value) in [
        ("--monthly-contribution", cli.monthly_contribution),
        (
            "--secondary-monthly-contribution",
            cli.secondary_monthly_contribution,
        ),
    ] {
        check_range(
            flag,
            value,
            0.0,
            MAX_MONTHLY_CONTRIBUTION,
            "between 0 and 50000",
        )?;
    }

    check_range(
        "--annual-return-rate",
        cli.annual_return_rate,
        0.0,
        100.0,
        "between 0 and 100",
    )?;

    for (flag, value) in [
        ("--annual-retirement-budget", cli.annual_retirement_budget),
        ("--other-retirement-income", cli.other_retirement_income),
    ] {
        check_range(flag, value, 0.0, f64::MAX, ">= 0")?;
    }

    check_range(
        "--withdrawal-rate",
        cli.withdrawal_rate,
        0.0,
        100.0,
        "> 0 and <= 100",
    )?;
    if cli.withdrawal_rate <= 0.0 {
        return Err(InputError::OutOfRange {
            flag: "--withdrawal-rate",
            requirement: "> 0 and <= 100",
        });
    }

    if cli.nest_egg_rule == CliNestEggRule::OverRetirement && cli.years_in_retirement == 0 {
        return Err(InputError::OutOfRange {
            flag: "--years-in-retirement",
            requirement: "> 0",
        });
    }

    if !cli.search_min.is_finite() {
        return Err(InputError::NotFinite {
            flag: "--search-min",
        });
    }
    if !cli.search_max.is_finite() {
        return Err(InputError::NotFinite {
            flag: "--search-max",
        });
    }
    if cli.search_max <= cli.search_min {
        return Err(InputError::EmptySearchBracket);
    }
    if cli.search_iterations == 0 {
        return Err(InputError::OutOfRange {
            flag: "--search-iterations",
            requirement: "> 0",
        });
    }

    let nest_egg_rule = match cli.nest_egg_rule {
        CliNestEggRule::WithdrawalRate => NestEggRule::WithdrawalRate,
        CliNestEggRule::OverRetirement => NestEggRule::OverRetirement {
            years: cli.years_in_retirement,
        },
    };

    let inputs = ProjectionInput {
        current_age: cli.current_age,
        retirement_age: cli.retirement_age,
        current_savings: cli.current_savings,
        monthly_contribution: cli.monthly_contribution,
        secondary_monthly_contribution: cli.secondary_monthly_contribution,
        annual_return_rate: cli.annual_return_rate,
        annual_retirement_budget: cli.annual_retirement_budget,
        other_retirement_income: cli.other_retirement_income,
        withdrawal_rate: cli.withdrawal_rate,
    };
    let config = ProjectionConfig {
        max_age: cli.max_age,
        nest_egg_rule,
        search: ContributionSearch {
            search_min: cli.search_min,
            search_max: cli.search_max,
            max_iterations: cli.search_iterations,
        },
        decay: cli.decay.into(),
    };
    Ok((inputs, config))
}

fn build_project_response<'a>(
    projection: &'a Projection,
    config: &ProjectionConfig,
    lookup_age: Option<u32>,
) -> ProjectResponse<'a> {
    let lookup_point = lookup_age.and_then(|age| {
        point_at_age(&projection.trajectory, age, config.max_age, &config.decay)
    });
    ProjectResponse {
        projection,
        lookup_age,
        lookup_point,
    }
}

pub fn run_cli<I, T>(args: I) -> Result<String, ApiError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let lookup_age = cli.lookup_age;
    let (inputs, config) = build_inputs(cli)?;
    let projection = run_projection(&inputs, &config);
    let response = build_project_response(&projection, &config, lookup_age);
    Ok(serde_json::to_string_pretty(&response)?)
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> Result<(), ApiError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("nestegg HTTP API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, router()).await?;
    Ok(())
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(query: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match query {
        Ok(Query(payload)) => project_handler_impl(payload).await,
        Err(rejection) => payload_rejected(rejection.body_text()),
    }
}

async fn project_post_handler(body: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match body {
        Ok(Json(payload)) => project_handler_impl(payload).await,
        Err(rejection) => payload_rejected(rejection.body_text()),
    }
}

fn payload_rejected(detail: String) -> Response {
    let err = InputError::Payload(detail);
    log::warn!("rejected projection request: {err}");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            log::warn!("rejected projection request: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let projection = run_projection(&request.inputs, &request.config);
    log::debug!(
        "projected {} -> {}: total {:.2}, required {:.2}, target contribution {:.0}",
        request.inputs.current_age,
        request.inputs.retirement_age,
        projection.summary.total_future_value,
        projection.summary.required_nest_egg,
        projection.summary.target_monthly_contribution,
    );
    let response = build_project_response(&projection, &request.config, request.lookup_age);
    json_response(StatusCode::OK, response)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, InputError> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| InputError::Payload(e.to_string()))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.max_age {
        cli.max_age = v;
    }

    if let Some(v) = payload.current_savings {
        cli.current_savings = v;
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }
    if let Some(v) = payload.secondary_monthly_contribution {
        cli.secondary_monthly_contribution = v;
    }
    if let Some(v) = payload.annual_return_rate {
        cli.annual_return_rate = v;
    }

    if let Some(v) = payload.annual_retirement_budget {
        cli.annual_retirement_budget = v;
    }
    if let Some(v) = payload.other_retirement_income {
        cli.other_retirement_income = v;
    }
    if let Some(v) = payload.withdrawal_rate {
        cli.withdrawal_rate = v;
    }
    if let Some(v) = payload.nest_egg_rule {
        cli.nest_egg_rule = v.into();
    }
    if let Some(v) = payload.years_in_retirement {
        cli.years_in_retirement = v;
    }

    if let Some(v) = payload.search_min {
        cli.search_min = v;
    }
    if let Some(v) = payload.search_max {
        cli.search_max = v;
    }
    if let Some(v) = payload.search_iterations {
        cli.search_iterations = v;
    }

    if let Some(v) = payload.decay {
        cli.decay = v.into();
    }
    if let Some(v) = payload.lookup_age {
        cli.lookup_age = Some(v);
    }

    let lookup_age = cli.lookup_age;
    let (inputs, config) = build_inputs(cli)?;
    Ok(ApiRequest {
        inputs,
        config,
        lookup_age,
    })
}

fn default_cli_for_api() -> Cli {
    let defaults = ProjectionInput::default();
    let search = ContributionSearch::default();
    Cli {
        current_age: defaults.current_age,
        retirement_age: defaults.retirement_age,
        max_age: DEFAULT_MAX_AGE,
        current_savings: defaults.current_savings,
        monthly_contribution: defaults.monthly_contribution,
        secondary_monthly_contribution: defaults.secondary_monthly_contribution,
        annual_return_rate: defaults.annual_return_rate,
        annual_retirement_budget: defaults.annual_retirement_budget,
        other_retirement_income: defaults.other_retirement_income,
        withdrawal_rate: defaults.withdrawal_rate,
        nest_egg_rule: CliNestEggRule::WithdrawalRate,
        years_in_retirement: DEFAULT_YEARS_IN_RETIREMENT,
        search_min: search.search_min,
        search_max: search.search_max,
        search_iterations: search.max_iterations,
        decay: CliDecay::PowerLaw,
        lookup_age: None,
    }
}

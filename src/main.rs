//! Allocation engine entry point (§6): `run(forecast_date)`, invoked once
//! per day by an external scheduler after actual inventory has been
//! counted. Loads configuration, connects to Postgres under the host's
//! resolved auth mode, evaluates the gate condition, loads dimensions and
//! facts for the forecast horizon, runs both passes of the driver, and
//! persists their outputs under the append-only CDC contract.

use allocation_persistence::{load_run_inputs, DimensionReader, FactWriter, PostgresDimensionReader, PostgresFactWriter, PostgresRunGate};
use chrono::NaiveDate;
use clap::Parser;
use erp_core::audit::{DatabaseRunEventRepository, RunLogger};
use erp_core::jobs::evaluate_gate;
use erp_core::{Config, DatabasePool};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `run(forecast_date)` with no flags in normal operation; `--forecast-date`
/// overrides the default of "today" for manual re-runs and local testing.
#[derive(Parser)]
#[command(name = "allocation-engine")]
#[command(about = "Daily supply-allocation engine")]
struct Cli {
    #[arg(long)]
    forecast_date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let forecast_date = cli.forecast_date.unwrap_or_else(|| chrono::Local::now().date_naive());

    match run(forecast_date).await {
        Ok(exit_code) => ExitCode::from(exit_code as u8),
        Err(err) => {
            error!(error = %err, "allocation run failed before completion");
            ExitCode::from(1)
        }
    }
}

async fn run(forecast_date: NaiveDate) -> anyhow::Result<i32> {
    info!(%forecast_date, "starting allocation run");

    let config = Config::load()?;

    let host_auth_mode = config.host_auth.resolve_mode();
    let db = DatabasePool::connect(config.database.clone(), host_auth_mode).await?;
    db.check_health().await?;

    let run_events = Arc::new(DatabaseRunEventRepository::new(Arc::new(db.pool.clone())));
    run_events.initialize().await?;

    let run_id = erp_core::jobs::RunId::new();
    let logger = RunLogger::new(run_events, run_id.to_string(), forecast_date);
    logger.log_run_started().await?;

    let gate = PostgresRunGate::new(db.clone());
    gate.initialize().await?;

    if let Some(reason) = evaluate_gate(&gate, forecast_date).await? {
        info!(%forecast_date, %reason, "gate declined");
        logger.log_gate_declined(&reason).await?;
        return Ok(0);
    }

    let reader = PostgresDimensionReader::new(db.clone());
    let horizon_days = config.app.forecast_horizon_days as i64;
    let (ctx, inputs) = load_run_inputs(&reader as &dyn DimensionReader, forecast_date, horizon_days, run_id.to_string()).await?;

    log_facility_timezones(&ctx);

    let (baseline, pending) = allocation_engine_lib::driver::run(&ctx, &inputs);
    logger.log_pass_completed("baseline").await?;
    logger.log_pass_completed("pending").await?;

    let writer = PostgresFactWriter::new(db.clone());
    if let Err(err) = persist_outputs(&writer, forecast_date, &baseline, &pending).await {
        logger.log_persistence_failure(&erp_core::Error::internal(err.to_string())).await?;
        return Err(err);
    }

    logger.log_run_completed().await?;
    info!(%forecast_date, "allocation run completed");
    Ok(0)
}

async fn persist_outputs(
    writer: &PostgresFactWriter,
    forecast_date: NaiveDate,
    baseline: &allocation_engine_lib::PassOutput,
    pending: &allocation_engine_lib::PassOutput,
) -> anyhow::Result<()> {
    writer.write_pass(allocation_domain::Pass::Baseline, forecast_date, baseline).await?;
    writer.write_pass(allocation_domain::Pass::Pending, forecast_date, pending).await?;
    Ok(())
}

/// Resolves each facility's timezone from its dimension row (§6) and logs
/// it once per run. Informational only: allocation dates are calendar
/// dates, so no downstream component consumes the offset.
fn log_facility_timezones(ctx: &allocation_domain::Context) {
    for facility in ctx.facilities() {
        info!(
            facility_id = facility.id,
            city_code = %facility.city_code,
            utc_offset_hours = facility.utc_offset_hours(),
            "resolved facility timezone"
        );
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "allocation_engine=info,allocation_engine_lib=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

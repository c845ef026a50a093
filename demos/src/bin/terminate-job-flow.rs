use std::{process::ExitCode, time::Duration};

use airflow_provider_amazon::{hooks::AwsEmrClientFactory, triggers::EmrTerminateJobFlowTrigger};
use airflow_task_sdk::{
    definitions::{Context, Operator, TaskDeferred, TaskOutcome},
    execution::ExecutionTIState,
    triggers::{TriggerEvent, TriggerRunner},
};
use clap::Parser;
use demos::{
    Error, StdTerminateJobFlowOperator,
    tokio::{TokioTriggerCanceller, TokioTriggerRuntime},
};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

type StdTrigger = EmrTerminateJobFlowTrigger<AwsEmrClientFactory>;

/// Terminate an EMR job flow, optionally waiting for it in a trigger.
///
/// AWS access is configured by the `AIRFLOW_CONN_{AWS_CONN_ID}` connection, or else by the
/// usual AWS environment, config files and roles.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// The id of the job flow to terminate.
    job_flow_id: String,
    #[arg(long, default_value = "aws_default")]
    aws_conn_id: String,
    /// Defer to a trigger after requesting the termination.
    /// Defaults to `[operators] default_deferrable`.
    #[arg(long)]
    deferrable: Option<bool>,
    /// Seconds between two status checks of the trigger.
    #[arg(long, default_value_t = 60)]
    waiter_delay: u64,
    #[arg(long, default_value_t = 20)]
    waiter_max_attempts: u32,
    /// The task instance id, random if not given.
    #[arg(long)]
    ti_id: Option<Uuid>,
    #[arg(long, default_value = "emr_terminate_job_flow")]
    dag_id: String,
    #[arg(long, default_value = "terminate_job_flow")]
    task_id: String,
    #[arg(long, default_value = "manual")]
    run_id: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(ExecutionTIState::Success) => ExitCode::SUCCESS,
        Ok(state) => {
            warn!("Task ended in state {state}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExecutionTIState, Error> {
    let mut operator =
        StdTerminateJobFlowOperator::new(&args.job_flow_id, AwsEmrClientFactory::default())
            .with_aws_conn_id(&args.aws_conn_id)
            .with_waiter_delay(Duration::from_secs(args.waiter_delay))
            .with_waiter_max_attempts(args.waiter_max_attempts);
    if let Some(deferrable) = args.deferrable {
        operator = operator.with_deferrable(deferrable);
    }
    let ctx = Context::new(
        args.ti_id.unwrap_or_else(Uuid::new_v4),
        &args.dag_id,
        &args.task_id,
        &args.run_id,
    );

    run_local(operator, &ctx).await
}

async fn run_local(
    mut operator: StdTerminateJobFlowOperator,
    ctx: &Context,
) -> Result<ExecutionTIState, Error> {
    let deferred = match operator.execute(ctx).await {
        Ok(TaskOutcome::Completed(())) => return Ok(ExecutionTIState::Success),
        Ok(TaskOutcome::Deferred(deferred)) => deferred,
        Err(e) => {
            error!("Task failed: {e}");
            return Ok(ExecutionTIState::Failed);
        }
    };
    let Some((method_name, event)) = wait_for(deferred).await? else {
        return Ok(ExecutionTIState::Deferred);
    };
    match operator.resume(ctx, &method_name, event).await {
        Ok(()) => Ok(ExecutionTIState::Success),
        Err(e) => {
            error!("Task failed: {e}");
            Ok(ExecutionTIState::Failed)
        }
    }
}

/// Run the trigger of a deferred task. Returns `None` if it got cancelled.
async fn wait_for(
    deferred: TaskDeferred<StdTrigger>,
) -> Result<Option<(String, TriggerEvent)>, Error> {
    let method_name = deferred.method_name().to_string();
    let timeout = deferred.timeout();
    let runtime = TokioTriggerRuntime::default();
    register_signal(runtime.canceller())?;

    let mut runner = TriggerRunner::new(runtime);
    let trigger = deferred.into_trigger();
    info!("Waiting for JobFlow {} to terminate", trigger.job_flow_id());
    let event = match timeout {
        Some(timeout) => runner.run_with_timeout(trigger, timeout).await,
        None => runner.run(trigger).await,
    };
    Ok(event.map(|event| (method_name, event)))
}

fn register_signal(canceller: TokioTriggerCanceller) -> std::io::Result<()> {
    let mut stream = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        if stream.recv().await.is_some() {
            debug!("Received interrupt signal, cancelling trigger");
            if let Err(e) = canceller.cancel().await {
                debug!("Failed to send cancel signal: {e}");
            }
        }
    });
    Ok(())
}

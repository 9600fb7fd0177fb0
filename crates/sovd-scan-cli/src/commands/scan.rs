//! Scan command - run the enumerator against a transport

use std::time::Duration;

use anyhow::{bail, Context, Result};
use sovd_scan::config::SocketCanConfig;
use sovd_scan::{
    create_transport, EcuState, Enumerator, EnumeratorReport, ExecuteOptions, ExecutionOutcome,
    PositiveLabel, ScanError, ScanRange, ServiceEnumerator, StateGenerator, TransportConfig,
    UdsCatalog, UdsStateModel,
};

use crate::config::{load_mock, Config};
use crate::output::{print_report, OutputContext};
use crate::ScanArgs;

/// Enumerate the default session until it completes or a transition is found
pub async fn scan(args: &ScanArgs, config: &Config, ctx: &OutputContext) -> Result<()> {
    let options = build_options(args, config)?;
    let transport_config = resolve_transport(args, config)?;
    let transport = create_transport(&transport_config)
        .await
        .context("Failed to create transport")?;

    let catalog: UdsCatalog = args.catalog.into();
    let mut enumerator = ServiceEnumerator::new(catalog, UdsStateModel);
    let state = EcuState::default();
    let mut edge = None;

    for pass in 1..=args.passes.max(1) {
        let outcome = match enumerator.execute(transport.as_ref(), &state, &options).await {
            Ok(outcome) => outcome,
            Err(ScanError::Transport(e)) if e.is_transient() => {
                ctx.warn(&format!("Pass {}: {} (request will be retried)", pass, e));
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("Pass {} failed", pass)),
        };
        ctx.info(&format!(
            "Pass {}: {} ({} results)",
            pass,
            outcome,
            enumerator.results().len()
        ));

        if let Some(found) = enumerator.discover_edge() {
            edge = Some(found);
            break;
        }
        match outcome {
            ExecutionOutcome::Completed
            | ExecutionOutcome::TransportClosed
            | ExecutionOutcome::Terminated => break,
            ExecutionOutcome::Stopped | ExecutionOutcome::BudgetExhausted => {
                if enumerator.completed() {
                    break;
                }
            }
        }
    }

    if let Some(path) = &args.save {
        enumerator
            .snapshot()
            .save(path)
            .with_context(|| format!("Failed to save snapshot to {}", path.display()))?;
        ctx.success(&format!("Snapshot saved to {}", path.display()));
    }

    let report = EnumeratorReport::build(&mut enumerator, !args.all, &PositiveLabel::default());
    print_report(ctx, &report);

    if let Some(edge) = edge {
        let transition = enumerator.get_transition(&edge)?;
        ctx.success(&format!(
            "Discovered transition {} via {}",
            edge, transition.description
        ));
    }

    Ok(())
}

/// Config file options with command-line flags applied on top
fn build_options(args: &ScanArgs, config: &Config) -> Result<ExecuteOptions> {
    let mut options = config.options.clone().unwrap_or_default();

    if let Some(timeout) = args.timeout {
        options.timeout =
            Duration::try_from_secs_f64(timeout).context("Invalid --timeout value")?;
    }
    if let Some(execution_time) = args.execution_time {
        options.execution_time = Duration::try_from_secs_f64(execution_time)
            .context("Invalid --execution-time value")?;
    }
    if let Some(range) = &args.range {
        options.request.scan_range = Some(ScanRange::parse(range)?);
    }
    options.exit_if_no_answer_received |= args.exit_if_no_answer;
    options.exit_if_service_not_supported |= args.exit_if_not_supported;
    options.exit_scan_on_first_negative_response |= args.exit_on_negative;
    if args.no_busy_retry {
        options.retry_if_busy_returncode = false;
    }

    options.validate()?;
    Ok(options)
}

/// Transport from the command line, falling back to the config file
fn resolve_transport(args: &ScanArgs, config: &Config) -> Result<TransportConfig> {
    if let Some(path) = &args.mock {
        return Ok(TransportConfig::Mock(load_mock(path)?));
    }
    if let Some(interface) = &args.interface {
        let (Some(tx_id), Some(rx_id)) = (&args.tx_id, &args.rx_id) else {
            bail!("--interface requires --tx-id and --rx-id");
        };
        return Ok(TransportConfig::SocketCan(SocketCanConfig {
            interface: interface.clone(),
            tx_id: tx_id.clone(),
            rx_id: rx_id.clone(),
        }));
    }
    match &config.transport {
        Some(transport) => Ok(transport.clone()),
        None => bail!("No transport configured: use --mock or --interface, or add [transport] to the config file"),
    }
}

//! Report command - print the report of a saved snapshot

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use sovd_scan::{
    EcuState, EnumeratorReport, EnumeratorSnapshot, PositiveLabel, ServiceCatalog,
    ServiceEnumerator, UdsCatalog, UdsStateModel,
};

use crate::output::{print_report, OutputContext};
use crate::CatalogArg;

/// Load a snapshot and print its report
pub fn report(
    file: &Path,
    catalog: Option<CatalogArg>,
    all: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let snapshot = EnumeratorSnapshot::<EcuState>::load(file)
        .with_context(|| format!("Failed to load snapshot {}", file.display()))?;

    let catalog: UdsCatalog = match catalog {
        Some(arg) => arg.into(),
        None => detect_catalog(&snapshot.name).with_context(|| {
            format!(
                "Unknown enumerator '{}', pass --catalog explicitly",
                snapshot.name
            )
        })?,
    };
    if catalog.name() != snapshot.name {
        ctx.warn(&format!(
            "Snapshot was taken by '{}', reporting as '{}'",
            snapshot.name,
            catalog.name()
        ));
    }

    ctx.info(&format!(
        "Snapshot of {} taken {}",
        snapshot.name,
        snapshot.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    let mut enumerator = ServiceEnumerator::restore(catalog, UdsStateModel, snapshot);
    let report = EnumeratorReport::build(&mut enumerator, !all, &PositiveLabel::default());
    print_report(ctx, &report);
    Ok(())
}

/// Catalog whose name matches the snapshot's enumerator name
fn detect_catalog(name: &str) -> Option<UdsCatalog> {
    CatalogArg::value_variants()
        .iter()
        .map(|arg| UdsCatalog::from(*arg))
        .find(|catalog| catalog.name() == name)
}

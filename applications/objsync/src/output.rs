//! Human-readable rendering of run and usage reports.

use objsync_core::Tenant;
use objsync_engine::{SyncReport, TenantSummary, UsageReport};
use std::fmt::Write;

fn summary_line(label: &str, summary: &TenantSummary) -> String {
    format!(
        "{label}: created={} updated={} deleted={} skipped={} failed={}",
        summary.created, summary.updated, summary.deleted, summary.skipped, summary.failed
    )
}

/// One line per tenant, one per failure, then the run totals.
pub fn render_report(report: &SyncReport) -> String {
    let mut out = String::new();

    for (id, summary) in &report.tenants {
        let label = if summary.name == *id {
            id.clone()
        } else {
            format!("{id} ({})", summary.name)
        };
        let _ = writeln!(out, "{}", summary_line(&label, summary));
    }

    for failure in &report.failures {
        let _ = writeln!(
            out,
            "FAILED {} {} [{:?}]: {}",
            failure.tenant, failure.item, failure.kind, failure.reason
        );
    }

    let _ = write!(
        out,
        "{} in {:.1}s",
        summary_line("total", &report.totals()),
        report.duration().num_milliseconds() as f64 / 1000.0
    );
    out
}

pub fn render_usage(report: &UsageReport) -> String {
    let mut out = format!(
        "{}: tenants={} containers={} objects={} bytes={}",
        report.side, report.tenants, report.containers, report.objects, report.bytes
    );
    if report.failed_tenants > 0 {
        let _ = write!(out, " unreadable_tenants={}", report.failed_tenants);
    }
    out
}

pub fn render_tenants(tenants: &[Tenant]) -> String {
    tenants
        .iter()
        .map(|t| format!("{}\t{}", t.id, t.name))
        .collect::<Vec<_>>()
        .join("\n")
}

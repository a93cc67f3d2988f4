/// Rendering clusters and VMs for the terminal
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use std::io::Write;
use std::str::FromStr;

use crate::nodegroup::Tag;
use crate::vendor::models::{Cluster, Vm};

/// Output format selected with `--output`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Wide,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(OutputFormat::Table),
            "wide" => Ok(OutputFormat::Wide),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("unsupported output format: {}", other),
        }
    }
}

/// Credits are billed in 1/100000 of a dollar
pub fn credits_to_dollars(credits: i64) -> String {
    format!("${:.2}", credits as f64 / 100_000.0)
}

fn timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        // the API reports unset times as year 1
        Some(t) if t.year() > 1 => t.format("%Y-%m-%d %H:%M %Z").to_string(),
        _ => "-".to_string(),
    }
}

fn tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| format!("{}={}", t.key, t.value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print a single cluster
pub fn cluster<W: Write>(format: OutputFormat, w: &mut W, cluster: &Cluster) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, cluster).context("Failed to encode cluster")?;
            writeln!(w)?;
        }
        OutputFormat::Table => {
            writeln!(
                w,
                "{:<10} {:<28} {:<12} {:<10} {:<14} {:<22} {:<22}",
                "ID", "NAME", "DISTRIBUTION", "VERSION", "STATUS", "CREATED", "EXPIRES"
            )?;
            writeln!(
                w,
                "{:<10} {:<28} {:<12} {:<10} {:<14} {:<22} {:<22}",
                cluster.id,
                cluster.name,
                cluster.distribution,
                cluster.version,
                cluster.status.to_string(),
                timestamp(cluster.created_at),
                timestamp(cluster.expires_at)
            )?;
        }
        OutputFormat::Wide => {
            let total_nodes: i64 = cluster.node_groups.iter().map(|ng| ng.node_count).sum();
            writeln!(
                w,
                "{:<10} {:<28} {:<12} {:<10} {:<14} {:<22} {:<22} {:<11} {:<11} {:<10} TAGS",
                "ID",
                "NAME",
                "DISTRIBUTION",
                "VERSION",
                "STATUS",
                "CREATED",
                "EXPIRES",
                "COST",
                "TOTAL NODES",
                "NODEGROUPS"
            )?;
            writeln!(
                w,
                "{:<10} {:<28} {:<12} {:<10} {:<14} {:<22} {:<22} {:<11} {:<11} {:<10} {}",
                cluster.id,
                cluster.name,
                cluster.distribution,
                cluster.version,
                cluster.status.to_string(),
                timestamp(cluster.created_at),
                timestamp(cluster.expires_at),
                credits_to_dollars(cluster.estimated_cost),
                total_nodes,
                cluster.node_groups.len(),
                tags(&cluster.tags)
            )?;
        }
    }
    Ok(())
}

/// Print a single VM
pub fn vm<W: Write>(format: OutputFormat, w: &mut W, vm: &Vm) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, vm).context("Failed to encode vm")?;
            writeln!(w)?;
        }
        OutputFormat::Table | OutputFormat::Wide => {
            writeln!(
                w,
                "{:<10} {:<28} {:<12} {:<10} {:<14} {:<22} {:<22} TAGS",
                "ID", "NAME", "DISTRIBUTION", "VERSION", "STATUS", "CREATED", "EXPIRES"
            )?;
            writeln!(
                w,
                "{:<10} {:<28} {:<12} {:<10} {:<14} {:<22} {:<22} {}",
                vm.id,
                vm.name,
                vm.distribution,
                vm.version,
                vm.status.to_string(),
                timestamp(vm.created_at),
                timestamp(vm.expires_at),
                tags(&vm.tags)
            )?;
        }
    }
    Ok(())
}

/// Print the result of a dry run
pub fn dry_run<W: Write>(w: &mut W, total_cost: i64, ttl: &str) -> Result<()> {
    writeln!(
        w,
        "Estimated cost: {} (if run to TTL of {})",
        credits_to_dollars(total_cost),
        ttl
    )?;
    writeln!(w, "Dry run succeeded.")?;
    Ok(())
}

//! Host snapshot: operating system, CPU, memory, disks, network and processes.

use std::cmp::Ordering;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Value, json};
use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, Networks, System};
use tracing::{error, info};

use crate::call::Arguments;
use crate::contract::Tool;
use crate::error::{ToolError, ToolResult, ValidationError};
use crate::schema::{ParameterSchema, ParameterType, ToolSchema};

const DEFAULT_TOP_PROCESSES: i64 = 5;
const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Reports a point-in-time snapshot of the host.
///
/// CPU usage needs two samples, so every run blocks a worker of the blocking
/// pool for [`MINIMUM_CPU_UPDATE_INTERVAL`].
#[derive(Debug, Clone)]
pub struct SystemInfoTool {
    schema: ToolSchema,
}

impl SystemInfoTool {
    /// Creates the `system_info` tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSchema`] if the static schema is rejected.
    pub fn new() -> ToolResult<Self> {
        let schema = ToolSchema::new(
            "system_info",
            "Get comprehensive system information including CPU, memory, disk, and network statistics",
        )?
        .with_parameter(
            ParameterSchema::optional("include_processes", ParameterType::Boolean)
                .with_description("Include top processes by CPU and memory usage")
                .with_default(false),
        )?
        .with_parameter(
            ParameterSchema::optional("top_processes", ParameterType::Integer)
                .with_description("Number of top processes to include")
                .with_default(DEFAULT_TOP_PROCESSES),
        )?
        .with_parameter(
            ParameterSchema::optional("include_network", ParameterType::Boolean)
                .with_description("Include network interface statistics")
                .with_default(true),
        )?;
        Ok(Self { schema })
    }
}

#[derive(Debug, Clone, Copy)]
struct Request {
    processes: Option<usize>,
    network: bool,
}

#[async_trait]
impl Tool for SystemInfoTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    fn validate_parameters(&self, arguments: &Arguments) -> Result<(), ValidationError> {
        self.schema.validate(arguments)?;
        match arguments.get("top_processes").and_then(Value::as_i64) {
            Some(top) if top < 1 => Err(ValidationError::constraint(
                "top_processes",
                "must be at least 1",
            )),
            _ => Ok(()),
        }
    }

    async fn run(&self, arguments: Arguments) -> ToolResult<Value> {
        let include_processes = arguments
            .get("include_processes")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let top = arguments
            .get("top_processes")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TOP_PROCESSES.unsigned_abs());
        let request = Request {
            processes: include_processes.then(|| usize::try_from(top).unwrap_or(usize::MAX)),
            network: arguments
                .get("include_network")
                .and_then(Value::as_bool)
                .unwrap_or(true),
        };

        let started = Instant::now();
        let mut snapshot = tokio::task::spawn_blocking(move || collect(request))
            .await
            .map_err(|err| {
                error!(error = %err, "system sampling task failed");
                ToolError::execution(format!("Failed to gather system information: {err}"))
            })?;

        let elapsed = started.elapsed().as_secs_f64();
        snapshot["processing_time_seconds"] = json!(round_to(elapsed, 4));
        info!(elapsed, processes = include_processes, "system information gathered");
        Ok(snapshot)
    }
}

fn collect(request: Request) -> Value {
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_cpu();
    if request.processes.is_some() {
        system.refresh_processes();
    }
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_cpu();
    if request.processes.is_some() {
        system.refresh_processes();
    }

    let mut snapshot = json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "system": host_section(),
        "cpu": cpu_section(&system),
        "memory": memory_section(&system),
        "disks": disk_section(),
    });
    if request.network {
        snapshot["network"] = network_section();
    }
    if let Some(top) = request.processes {
        snapshot["processes"] = process_section(&system, top);
    }
    snapshot
}

fn host_section() -> Value {
    json!({
        "system": System::name(),
        "node_name": System::host_name(),
        "release": System::kernel_version(),
        "version": System::os_version(),
        "machine": std::env::consts::ARCH,
        "uptime": format_uptime(System::uptime()),
    })
}

fn cpu_section(system: &System) -> Value {
    let cpus = system.cpus();
    let per_core: Vec<f64> = cpus
        .iter()
        .map(|cpu| round_to(f64::from(cpu.cpu_usage()), 1))
        .collect();
    json!({
        "total_cores": cpus.len(),
        "brand": cpus.first().map(|cpu| cpu.brand().trim().to_owned()),
        "cpu_frequency_mhz": cpus.first().map(sysinfo::Cpu::frequency),
        "cpu_usage_percent": round_to(f64::from(system.global_cpu_info().cpu_usage()), 1),
        "cpu_usage_per_core": per_core,
    })
}

fn memory_section(system: &System) -> Value {
    let total = system.total_memory();
    let available = system.available_memory();
    let swap_total = system.total_swap();
    let swap_used = system.used_swap();
    json!({
        "total": human_size(total),
        "available": human_size(available),
        "used": human_size(system.used_memory()),
        "percentage": percent(total.saturating_sub(available), total),
        "swap_total": human_size(swap_total),
        "swap_used": human_size(swap_used),
        "swap_free": human_size(system.free_swap()),
        "swap_percentage": percent(swap_used, swap_total),
    })
}

fn disk_section() -> Value {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .map(|disk| {
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            json!({
                "device": disk.name().to_string_lossy(),
                "mountpoint": disk.mount_point().display().to_string(),
                "file_system": disk.file_system().to_string_lossy(),
                "total": human_size(total),
                "used": human_size(used),
                "free": human_size(free),
                "percentage": percent(used, total),
            })
        })
        .collect()
}

fn network_section() -> Value {
    let networks = Networks::new_with_refreshed_list();
    let mut totals = [0_u64; 6];
    for data in networks.list().values() {
        totals[0] += data.total_transmitted();
        totals[1] += data.total_received();
        totals[2] += data.total_packets_transmitted();
        totals[3] += data.total_packets_received();
        totals[4] += data.total_errors_on_received();
        totals[5] += data.total_errors_on_transmitted();
    }
    json!({
        "interfaces": networks.list().len(),
        "bytes_sent": human_size(totals[0]),
        "bytes_received": human_size(totals[1]),
        "packets_sent": totals[2],
        "packets_received": totals[3],
        "errors_in": totals[4],
        "errors_out": totals[5],
    })
}

fn process_section(system: &System, top: usize) -> Value {
    let total_memory = system.total_memory();
    let mut processes: Vec<_> = system.processes().values().collect();
    let describe = |process: &&sysinfo::Process| {
        json!({
            "pid": process.pid().as_u32(),
            "name": process.name(),
            "cpu_percent": round_to(f64::from(process.cpu_usage()), 1),
            "memory_percent": percent(process.memory(), total_memory),
        })
    };

    processes.sort_by(|a, b| {
        b.cpu_usage()
            .partial_cmp(&a.cpu_usage())
            .unwrap_or(Ordering::Equal)
    });
    let top_cpu: Vec<Value> = processes.iter().take(top).map(describe).collect();
    processes.sort_by_key(|process| std::cmp::Reverse(process.memory()));
    let top_memory: Vec<Value> = processes.iter().take(top).map(describe).collect();

    json!({
        "top_cpu": top_cpu,
        "top_memory": top_memory,
        "total_processes": processes.len(),
    })
}

/// Formats a byte count with binary prefixes, e.g. `1536` as `"1.50 KB"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in &SIZE_UNITS[..SIZE_UNITS.len() - 1] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} {}", SIZE_UNITS[SIZE_UNITS.len() - 1])
}

fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let clock = format!(
        "{}:{:02}:{:02}",
        seconds % 86_400 / 3_600,
        seconds % 3_600 / 60,
        seconds % 60
    );
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        _ => format!("{days} days, {clock}"),
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 1)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn schema_declares_optional_switches() {
        let tool = SystemInfoTool::new().unwrap();
        assert_eq!(tool.name(), "system_info");
        assert!(tool.description().contains("CPU, memory, disk, and network"));

        let rendered = tool.schema().to_json_schema();
        assert_eq!(rendered["properties"]["include_processes"]["type"], "boolean");
        assert_eq!(rendered["properties"]["top_processes"]["type"], "integer");
        assert_eq!(rendered["properties"]["top_processes"]["default"], 5);
        assert_eq!(rendered["properties"]["include_network"]["default"], true);
        assert_eq!(rendered["required"], json!([]));
    }

    #[test]
    fn validates_parameters() {
        let tool = SystemInfoTool::new().unwrap();
        assert!(tool.validate_parameters(&Arguments::new()).is_ok());
        assert!(
            tool.validate_parameters(&args(json!({ "include_processes": true, "top_processes": 3 })))
                .is_ok()
        );
        assert!(tool.validate_parameters(&args(json!({ "include_processes": "yes" }))).is_err());
        assert!(tool.validate_parameters(&args(json!({ "include_network": 1 }))).is_err());
        assert!(tool.validate_parameters(&args(json!({ "top_processes": 2.5 }))).is_err());
        assert_eq!(
            tool.validate_parameters(&args(json!({ "top_processes": 0 }))),
            Err(ValidationError::constraint("top_processes", "must be at least 1"))
        );
        assert!(tool.validate_parameters(&args(json!({ "top_processes": -1 }))).is_err());
    }

    #[test]
    fn human_sizes_use_binary_prefixes() {
        assert_eq!(human_size(0), "0.00 B");
        assert_eq!(human_size(1023), "1023.00 B");
        assert_eq!(human_size(1024), "1.00 KB");
        assert_eq!(human_size(1536), "1.50 KB");
        assert_eq!(human_size(1024 * 1024), "1.00 MB");
        assert_eq!(human_size(5 * 1024 * 1024 * 1024), "5.00 GB");
        assert_eq!(human_size(u64::MAX), "16384.00 PB");
    }

    #[test]
    fn uptime_reads_like_a_clock() {
        assert_eq!(format_uptime(59), "0:00:59");
        assert_eq!(format_uptime(3_725), "1:02:05");
        assert_eq!(format_uptime(86_400 + 7_384), "1 day, 2:03:04");
        assert_eq!(format_uptime(3 * 86_400), "3 days, 0:00:00");
    }

    #[test]
    fn percentages_guard_empty_totals() {
        assert!(percent(1, 0).abs() < f64::EPSILON);
        assert!((percent(1, 3) - 33.3).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn snapshot_contains_requested_sections() {
        let tool = SystemInfoTool::new().unwrap();

        let outcome = tool
            .execute(args(json!({ "include_processes": true, "top_processes": 2 })))
            .await;
        assert!(outcome.is_success(), "{:?}", outcome.error());
        let report = outcome.result().unwrap();
        for section in ["timestamp", "system", "cpu", "memory", "disks", "network", "processes"] {
            assert!(report.get(section).is_some(), "missing {section}");
        }
        assert!(report["processes"]["top_cpu"].as_array().unwrap().len() <= 2);
        assert!(report["processes"]["top_memory"].as_array().unwrap().len() <= 2);
        assert!(report["processing_time_seconds"].as_f64().unwrap() >= 0.0);

        let outcome = tool
            .execute(args(json!({ "include_network": false })))
            .await;
        let report = outcome.result().unwrap();
        assert!(report.get("network").is_none());
        assert!(report.get("processes").is_none());
    }
}

//! InfluxDB v2 sink
//!
//! Each sample is written as three requests (`cpu`, `memory`, `disk`) to
//! `{url}/api/v2/write` using line protocol with nanosecond timestamps:
//!
//! ```text
//! cpu,host=web-1 usage_percent=42.5,cpu_count=4,core_0=40,core_1=45 1700000000000000000
//! memory,host=web-1 total_gb=16,used_gb=8,free_gb=8,percent=50 1700000000000000000
//! disk,host=web-1,path=/,device=/dev/sda1 total_gb=100,used_gb=91,free_gb=9,percent=91 1700000000000000000
//! ```

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use super::{MetricSink, Sample, SinkError, SinkResult};
use crate::config::InfluxConfig;
use crate::util::HTTP_TIMEOUT;

pub struct InfluxSink {
    client: Client,
    config: InfluxConfig,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.config.url.trim_end_matches('/'))
    }

    async fn write_group(&self, group: &str, body: String) -> SinkResult<()> {
        let response = self
            .client
            .post(self.write_url())
            .timeout(HTTP_TIMEOUT)
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", format!("Token {}", self.config.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        SinkError::check(response).await?;
        debug!("wrote {group} points");
        Ok(())
    }
}

#[async_trait]
impl MetricSink for InfluxSink {
    fn name(&self) -> &str {
        "influxdb"
    }

    /// Every group is attempted; the first failure is returned.
    #[instrument(skip_all, fields(host = %sample.hostname))]
    async fn write(&self, sample: &Sample) -> SinkResult<()> {
        let mut first_error = None;

        for (group, body) in line_protocol(sample)? {
            if let Err(e) = self.write_group(group, body).await {
                warn!(group, "time-series write failed: {e}");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

/// Encode a sample as one line-protocol body per metric group.
///
/// Groups without points (no readable filesystem, or no finite value) are omitted.
pub fn line_protocol(sample: &Sample) -> SinkResult<Vec<(&'static str, String)>> {
    let timestamp = sample
        .timestamp
        .timestamp_nanos_opt()
        .ok_or_else(|| SinkError::Encoding("timestamp out of range".into()))?;
    // `host` is always tagged; an empty tag value is invalid line protocol
    let hostname = match sample.hostname.as_str() {
        "" => UNKNOWN_HOST,
        hostname => hostname,
    };
    let host = [("host", hostname)];

    let cpu = &sample.metrics.cpu;
    let mut cpu_fields = vec![
        ("usage_percent".to_string(), cpu.cpu_usage),
        ("cpu_count".to_string(), cpu.cpu_count as f64),
    ];
    if let Some(frequency) = &cpu.frequency {
        cpu_fields.push(("frequency_mhz".to_string(), frequency.current));
    }
    cpu_fields.extend(
        cpu.per_core_usage
            .iter()
            .enumerate()
            .map(|(i, usage)| (format!("core_{i}"), *usage)),
    );

    let memory = &sample.metrics.memory;
    let memory_fields = vec![
        ("total_gb".to_string(), memory.total_gb),
        ("used_gb".to_string(), memory.used_gb),
        ("free_gb".to_string(), memory.free_gb),
        ("percent".to_string(), memory.percent),
    ];

    let mut groups: Vec<(&'static str, String)> = [
        ("cpu", line("cpu", &host, &cpu_fields, timestamp)),
        ("memory", line("memory", &host, &memory_fields, timestamp)),
    ]
    .into_iter()
    .filter_map(|(group, line)| Some((group, line?)))
    .collect();

    let disk_lines: Vec<String> = sample
        .metrics
        .disk
        .iter()
        .filter_map(|(mount_point, disk)| {
            let mut tags = vec![("host", hostname), ("path", mount_point.as_str())];
            if !disk.device.is_empty() {
                tags.push(("device", disk.device.as_str()));
            }
            let fields = [
                ("total_gb".to_string(), disk.total_gb),
                ("used_gb".to_string(), disk.used_gb),
                ("free_gb".to_string(), disk.free_gb),
                ("percent".to_string(), disk.percent),
            ];
            line("disk", &tags, &fields, timestamp)
        })
        .collect();

    if !disk_lines.is_empty() {
        groups.push(("disk", disk_lines.join("\n")));
    }

    Ok(groups)
}

/// One point, or `None` when no field has a finite value.
fn line(measurement: &str, tags: &[(&str, &str)], fields: &[(String, f64)], timestamp: i64) -> Option<String> {
    // line protocol has no representation for NaN or infinity
    let fields: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.is_finite())
        .map(|(key, value)| format!("{}={}", escape(key, TAG_SPECIALS), value))
        .collect();
    if fields.is_empty() {
        return None;
    }

    let mut out = escape(measurement, &[',', ' ']);

    for (key, value) in tags {
        if value.is_empty() {
            continue;
        }
        out.push(',');
        out.push_str(&escape(key, TAG_SPECIALS));
        out.push('=');
        out.push_str(&escape(value, TAG_SPECIALS));
    }

    out.push(' ');
    out.push_str(&fields.join(","));
    out.push(' ');
    out.push_str(&timestamp.to_string());
    Some(out)
}

const UNKNOWN_HOST: &str = "unknown";

const TAG_SPECIALS: &[char] = &[',', '=', ' '];

fn escape(value: &str, specials: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

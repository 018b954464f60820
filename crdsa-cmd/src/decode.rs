use std::{
    io::{stdout, Write},
    path::Path,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use crdsa::config::{DecoderConfig, LinkResultsConfig};
use crdsa::decoder::{DecodePolicy, DecodedFrame, FrameSummary};
use crdsa::frame::{DecodeMethod, ReplicaStatus, SlotId};
use crdsa::link::linear_to_db;
use crdsa::telemetry::{Event, MemorySink, TelemetrySink, TelemetrySummary, TracingSink};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::scenario::Scenario;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Policy {
    Sic,
    Marsala,
}

impl clap::ValueEnum for Policy {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Sic, Self::Marsala]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Sic => Some(clap::builder::PossibleValue::new("sic")),
            Self::Marsala => Some(clap::builder::PossibleValue::new("marsala")),
        }
    }
}

impl From<&Policy> for DecodePolicy {
    fn from(value: &Policy) -> Self {
        match value {
            Policy::Sic => DecodePolicy::Sic,
            Policy::Marsala => DecodePolicy::Marsala,
        }
    }
}

/// Threshold used when no decoder config is given.
pub const DEFAULT_THRESHOLD_DB: f64 = 3.0;

#[derive(Debug, Clone, Serialize)]
struct DecodedPacket {
    packet: String,
    slot: SlotId,
    method: &'static str,
    sinr_db: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
struct FrameReport {
    frame: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<FrameSummary>,
    decoded: Vec<DecodedPacket>,
}

impl FrameReport {
    fn failed(frame: usize, err: &crdsa::Error) -> Self {
        Self {
            frame,
            error: Some(err.to_string()),
            summary: None,
            decoded: Vec::default(),
        }
    }

    fn decoded(frame: usize, zult: &DecodedFrame) -> Self {
        let decoded = zult
            .decoded
            .iter()
            .map(|record| DecodedPacket {
                packet: record.key.to_string(),
                slot: record.slot,
                method: match record.status {
                    ReplicaStatus::Decoded(DecodeMethod::Correlation) => "correlation",
                    _ => "sic",
                },
                sinr_db: record.composite_sinr.map(linear_to_db),
            })
            .collect();
        Self {
            frame,
            error: None,
            summary: Some(zult.summary.clone()),
            decoded,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Report {
    scenario: String,
    policy: DecodePolicy,
    frames: Vec<FrameReport>,
    failed_frames: usize,
    packets: usize,
    decoded: usize,
    telemetry: TelemetrySummary,
}

/// Keeps events for the report and logs them at trace level.
#[derive(Debug, Default)]
struct ReportSink {
    memory: MemorySink,
    tracing: TracingSink,
}

impl TelemetrySink for ReportSink {
    fn record(&self, event: Event) {
        self.tracing.record(event.clone());
        self.memory.record(event);
    }
}

fn default_config() -> DecoderConfig {
    DecoderConfig {
        policy: DecodePolicy::default(),
        link_results: LinkResultsConfig::Threshold {
            threshold_db: DEFAULT_THRESHOLD_DB,
            waveforms: Vec::default(),
        },
    }
}

fn run(name: &str, scenario: &Scenario, config: &DecoderConfig) -> Result<Report> {
    let sink = Arc::new(ReportSink::default());
    let decoder = config.decoder(sink.clone()).context("creating decoder")?;

    let mut frames = Vec::default();
    let mut indexes = Vec::default();
    let mut reports = Vec::default();
    for (idx, frame) in scenario.frames().into_iter().enumerate() {
        match frame {
            Ok(frame) => {
                indexes.push(idx);
                frames.push(frame);
            }
            Err(err) => {
                error!(frame = idx, "skipping frame: {err}");
                reports.push(FrameReport::failed(idx, &err));
            }
        }
    }

    debug!("decoding {} frames", frames.len());
    for (idx, zult) in indexes.into_iter().zip(decoder.decode_all(frames)) {
        match zult {
            Ok(decoded) => reports.push(FrameReport::decoded(idx, &decoded)),
            Err(err) if err.is_integrity() => {
                error!(frame = idx, "replica integrity violation: {err}");
                reports.push(FrameReport::failed(idx, &err));
            }
            Err(err) => bail!("decoding frame {idx}: {err}"),
        }
    }
    reports.sort_by_key(|r| r.frame);

    let telemetry: TelemetrySummary = sink.memory.take().iter().collect();
    let summaries = reports.iter().filter_map(|r| r.summary.as_ref());
    let (packets, decoded) = summaries.fold((0, 0), |(packets, decoded), s| {
        (
            packets + s.packets,
            decoded + s.decoded_sic + s.decoded_correlation,
        )
    });

    Ok(Report {
        scenario: name.to_string(),
        policy: config.policy,
        failed_frames: reports.iter().filter(|r| r.error.is_some()).count(),
        frames: reports,
        packets,
        decoded,
        telemetry,
    })
}

pub fn decode(
    input: &Path,
    config: Option<&Path>,
    policy: Option<&Policy>,
    format: &Format,
) -> Result<()> {
    let scenario = Scenario::load(input)?;
    let mut config = match config {
        Some(path) => DecoderConfig::from_file(path)
            .with_context(|| format!("loading decoder config {path:?}"))?,
        None => default_config(),
    };
    if let Some(policy) = policy {
        config.policy = policy.into();
    }
    info!(
        "decoding {} frames from {input:?} with {:?}",
        scenario.frames.len(),
        config.policy
    );

    let report = run(&input.to_string_lossy(), &scenario, &config)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &report).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&report).context("serializing report")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(report: &Report) -> Result<String> {
    let mut hb = handlebars::Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_template_string("decode", TEXT_TEMPLATE)
        .context("compiling template")?;

    hb.render("decode", report).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ scenario }}
===============================================================================================
Policy:      {{ policy }}
Packets:     {{ packets }}
Decoded:     {{ decoded }}
Failed:      {{ failed_frames }}
SINR evals:  {{ telemetry.sinr_evaluations }}
Mean SINR:   {{ telemetry.mean_sinr_db }}
Correlation: {{ telemetry.correlation_successes }}/{{ telemetry.correlation_attempts }}
{{ #each frames }}
Frame {{ frame }}
-----------------------------------------------------------------------------------------------
{{ #if error }}
Error:       {{ error }}
{{ else }}
Replicas:    {{ summary.replicas }}
Packets:     {{ summary.packets }}
SIC:         {{ summary.decoded_sic }} in {{ summary.sic_passes }} passes
Correlation: {{ summary.decoded_correlation }} in {{ summary.correlation_passes }} passes
Unresolved:  {{ summary.unresolved }}
{{ #each decoded }}
  {{ packet }} slot={{ slot }} method={{ method }} sinr_db={{ sinr_db }}
{{ /each }}
{{ /if }}
{{ /each }}
";

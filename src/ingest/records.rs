//! Record parser for the power-telemetry channel.
//!
//! Classifies comma-delimited text lines into waveform samples (3 fields)
//! or power-log entries (6 fields) under the direction of marker lines.
//! The field count alone would disambiguate the two shapes, but the parser
//! also uses "is a waveform run currently pending" as the discriminator so
//! that a corrupt line can never silently jump between record kinds.
//!
//! A pending run's tail is flushed exactly once, when the next `WAVEFORM_OP`
//! or `WAVEFORM_END` marker arrives; it is never merged into the following
//! run.

use crate::model::{Operation, PowerLogRecord, WaveformRun, WaveformSample};
use tracing::{debug, warn};

/// Outcome of feeding one text line to the parser.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordEvent {
    /// `WAVEFORM_START` reset the run accumulator.
    WaveformStarted,
    /// A `WAVEFORM_OP` marker opened a new pending run (flushing the
    /// previous tail if it held samples).
    RunOpened { operation: Operation, id: u32 },
    /// A sample line was appended to the pending run.
    SampleAppended,
    /// `WAVEFORM_END` closed the capture; the ordered run list is emitted.
    RunsCompleted(Vec<WaveformRun>),
    /// `POWER_LOGS_START` reset the power-log accumulator.
    PowerLogsStarted,
    /// A power-log line was parsed; the snapshot is carried for per-record
    /// UI notification.
    PowerLogAppended(PowerLogRecord),
    /// `POWER_LOGS_END` emitted the collected records.
    PowerLogsCompleted(Vec<PowerLogRecord>),
    /// Free-form text with no recognized shape; surfaced verbatim.
    Info(String),
    /// A marker or data line that could not be parsed; dropped, state
    /// unchanged.
    Malformed(String),
}

/// Per-channel telemetry line parser.
#[derive(Default)]
pub struct RecordParser {
    /// The run currently accumulating samples, if any.
    pending: Option<WaveformRun>,
    /// Runs completed since the last `WAVEFORM_START`, in arrival order.
    runs: Vec<WaveformRun>,
    /// Records collected since the last `POWER_LOGS_START`.
    power_logs: Vec<PowerLogRecord>,
}

impl RecordParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a waveform run is accumulating samples.
    pub fn in_run(&self) -> bool {
        self.pending.is_some()
    }

    /// Feed one text line.
    pub fn on_text(&mut self, line: &str) -> RecordEvent {
        match line {
            "WAVEFORM_START" => {
                self.runs.clear();
                self.pending = None;
                RecordEvent::WaveformStarted
            }
            "WAVEFORM_END" => {
                self.flush_pending();
                let runs = std::mem::take(&mut self.runs);
                self.pending = None;
                debug!(runs = runs.len(), "waveform capture complete");
                RecordEvent::RunsCompleted(runs)
            }
            "POWER_LOGS_START" => {
                self.power_logs.clear();
                RecordEvent::PowerLogsStarted
            }
            "POWER_LOGS_END" => {
                let records = std::mem::take(&mut self.power_logs);
                debug!(records = records.len(), "power log dump complete");
                RecordEvent::PowerLogsCompleted(records)
            }
            _ => {
                if let Some(rest) = line.strip_prefix("WAVEFORM_OP:") {
                    return self.open_run(line, rest);
                }
                if line.contains(',') {
                    return self.on_comma_line(line);
                }
                RecordEvent::Info(line.to_string())
            }
        }
    }

    fn open_run(&mut self, line: &str, rest: &str) -> RecordEvent {
        let mut fields = rest.split(':');
        let (Some(op), Some(id), Some(_ignored), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            warn!(line, "malformed WAVEFORM_OP marker");
            return RecordEvent::Malformed(format!("malformed WAVEFORM_OP marker '{line}'"));
        };
        let Ok(id) = id.parse::<u32>() else {
            warn!(line, "non-integer operation id in WAVEFORM_OP marker");
            return RecordEvent::Malformed(format!("non-integer operation id in '{line}'"));
        };
        self.flush_pending();
        let operation = Operation::parse(op);
        self.pending = Some(WaveformRun {
            operation: operation.clone(),
            operation_id: id,
            samples: Vec::new(),
        });
        RecordEvent::RunOpened { operation, id }
    }

    /// Move the pending run into the completed list if it holds samples.
    /// An opened run that never received a sample is dropped silently, as
    /// the firmware emits empty `WAVEFORM_OP` markers for skipped steps.
    fn flush_pending(&mut self) {
        if let Some(run) = self.pending.take() {
            if !run.samples.is_empty() {
                self.runs.push(run);
            }
        }
    }

    fn on_comma_line(&mut self, line: &str) -> RecordEvent {
        if let Some(run) = self.pending.as_mut() {
            match parse_sample(line) {
                Ok(sample) => {
                    run.samples.push(sample);
                    RecordEvent::SampleAppended
                }
                Err(reason) => {
                    warn!(line, %reason, "invalid waveform data");
                    RecordEvent::Malformed(reason)
                }
            }
        } else {
            match parse_power_log(line) {
                Ok(record) => {
                    self.power_logs.push(record.clone());
                    RecordEvent::PowerLogAppended(record)
                }
                Err(reason) => {
                    warn!(line, %reason, "invalid power log");
                    RecordEvent::Malformed(reason)
                }
            }
        }
    }
}

/// Parse a `timestamp_ms,voltage_mV,current_mA` sample line.
fn parse_sample(line: &str) -> Result<WaveformSample, String> {
    let mut fields = line.split(',');
    let (Some(ts), Some(volt), Some(curr), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(format!("expected 3 fields in waveform line '{line}'"));
    };
    let parse = |field: &str, name: &str| {
        field
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("non-numeric {name} '{field}' in '{line}'"))
    };
    Ok(WaveformSample {
        timestamp_ms: parse(ts, "timestamp")?,
        voltage_mv: parse(volt, "voltage")?,
        current_ma: parse(curr, "current")?,
    })
}

/// Parse an `id,operation,voltage_mV,current_mA,energy_mWh,duration_ms`
/// power-log line.
fn parse_power_log(line: &str) -> Result<PowerLogRecord, String> {
    let fields: Vec<&str> = line.split(',').collect();
    let [id, op, volt, curr, energy, duration] = fields.as_slice() else {
        return Err(format!(
            "expected 6 fields in power log line, got {} in '{line}'",
            fields.len()
        ));
    };
    let float = |field: &str, name: &str| {
        field
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("non-numeric {name} '{field}' in '{line}'"))
    };
    Ok(PowerLogRecord {
        id: id
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("non-integer id '{id}' in '{line}'"))?,
        operation: Operation::parse(op.trim()),
        voltage_mv: float(volt, "voltage")?,
        current_ma: float(curr, "current")?,
        energy_mwh: float(energy, "energy")?,
        duration_ms: duration
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("non-integer duration '{duration}' in '{line}'"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut RecordParser, lines: &[&str]) -> Vec<RecordEvent> {
        lines.iter().map(|l| parser.on_text(l)).collect()
    }

    #[test]
    fn splits_waveform_capture_into_ordered_runs() {
        let mut parser = RecordParser::new();
        let events = feed(
            &mut parser,
            &[
                "WAVEFORM_START",
                "WAVEFORM_OP:Compression:3:x",
                "10.0,3300,120",
                "20.0,3300,125",
                "WAVEFORM_OP:Transmission:3:x",
                "5.0,3300,50",
                "WAVEFORM_END",
            ],
        );
        let RecordEvent::RunsCompleted(runs) = events.last().unwrap() else {
            panic!("expected RunsCompleted, got {:?}", events.last());
        };
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].operation, Operation::Compression);
        assert_eq!(runs[0].operation_id, 3);
        assert_eq!(runs[0].samples.len(), 2);
        assert_eq!(runs[0].samples[0].timestamp_ms, 10.0);
        assert_eq!(runs[1].operation, Operation::Transmission);
        assert_eq!(runs[1].samples.len(), 1);
        assert_eq!(runs[1].samples[0].current_ma, 50.0);
    }

    #[test]
    fn pending_tail_is_flushed_once() {
        let mut parser = RecordParser::new();
        feed(
            &mut parser,
            &["WAVEFORM_START", "WAVEFORM_OP:Compression:1:x", "1.0,2,3"],
        );
        let RecordEvent::RunsCompleted(first) = parser.on_text("WAVEFORM_END") else {
            panic!("expected RunsCompleted");
        };
        assert_eq!(first.len(), 1);
        // A second END must not re-emit the flushed tail.
        let RecordEvent::RunsCompleted(second) = parser.on_text("WAVEFORM_END") else {
            panic!("expected RunsCompleted");
        };
        assert!(second.is_empty());
    }

    #[test]
    fn empty_run_is_dropped() {
        let mut parser = RecordParser::new();
        let events = feed(
            &mut parser,
            &[
                "WAVEFORM_START",
                "WAVEFORM_OP:Compression:1:x",
                "WAVEFORM_OP:Transmission:1:x",
                "9.0,3300,40",
                "WAVEFORM_END",
            ],
        );
        let RecordEvent::RunsCompleted(runs) = events.last().unwrap() else {
            panic!("expected RunsCompleted");
        };
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].operation, Operation::Transmission);
    }

    #[test]
    fn invalid_sample_is_dropped_and_run_continues() {
        let mut parser = RecordParser::new();
        feed(
            &mut parser,
            &["WAVEFORM_START", "WAVEFORM_OP:Compression:1:x"],
        );
        assert!(matches!(
            parser.on_text("10.0,oops,120"),
            RecordEvent::Malformed(_)
        ));
        assert_eq!(parser.on_text("11.0,3300,121"), RecordEvent::SampleAppended);
        let RecordEvent::RunsCompleted(runs) = parser.on_text("WAVEFORM_END") else {
            panic!("expected RunsCompleted");
        };
        assert_eq!(runs[0].samples.len(), 1);
    }

    #[test]
    fn collects_power_logs_between_markers() {
        let mut parser = RecordParser::new();
        parser.on_text("POWER_LOGS_START");
        let event = parser.on_text("1,Compression,3300,120,0.05,200");
        let RecordEvent::PowerLogAppended(record) = event else {
            panic!("expected PowerLogAppended, got {event:?}");
        };
        assert_eq!(record.operation, Operation::Compression);
        assert_eq!(record.energy_mwh, 0.05);
        parser.on_text("1,Transmission,3300,50,0.01,100");
        let RecordEvent::PowerLogsCompleted(records) = parser.on_text("POWER_LOGS_END") else {
            panic!("expected PowerLogsCompleted");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].duration_ms, 100);
    }

    #[test]
    fn short_power_log_line_is_dropped() {
        let mut parser = RecordParser::new();
        parser.on_text("POWER_LOGS_START");
        assert!(matches!(
            parser.on_text("1,Compression,3300,120,0.05"),
            RecordEvent::Malformed(_)
        ));
        parser.on_text("2,Compression,3300,120,0.04,180");
        let RecordEvent::PowerLogsCompleted(records) = parser.on_text("POWER_LOGS_END") else {
            panic!("expected PowerLogsCompleted");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 2);
    }

    #[test]
    fn six_field_line_inside_run_is_not_a_power_log() {
        let mut parser = RecordParser::new();
        feed(
            &mut parser,
            &["WAVEFORM_START", "WAVEFORM_OP:Compression:1:x"],
        );
        // While a run is pending, comma lines are samples; six fields cannot
        // parse as one and must not leak into the power-log accumulator.
        assert!(matches!(
            parser.on_text("1,Compression,3300,120,0.05,200"),
            RecordEvent::Malformed(_)
        ));
        parser.on_text("WAVEFORM_END");
        let RecordEvent::PowerLogsCompleted(records) = parser.on_text("POWER_LOGS_END") else {
            panic!("expected PowerLogsCompleted");
        };
        assert!(records.is_empty());
    }

    #[test]
    fn unknown_text_is_informational() {
        let mut parser = RecordParser::new();
        assert_eq!(
            parser.on_text("INA228 ready"),
            RecordEvent::Info("INA228 ready".into())
        );
    }

    #[test]
    fn malformed_waveform_op_marker_keeps_state() {
        let mut parser = RecordParser::new();
        parser.on_text("WAVEFORM_START");
        assert!(matches!(
            parser.on_text("WAVEFORM_OP:Compression:nan:x"),
            RecordEvent::Malformed(_)
        ));
        assert!(!parser.in_run());
    }
}

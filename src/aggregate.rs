//! Per-session energy statistics.
//!
//! A pure function over the session's power-log records. Formatting and
//! display belong to the attached frontend; this module only does the
//! arithmetic.

use crate::model::{CompressionAverages, Operation, PowerLogRecord, RunMode, RunSummary};

/// Compute the energy summary for one session.
///
/// Total energy sums every record; compression energy sums records tagged
/// `Compression`; everything else counts toward transmission energy,
/// matching the firmware's two-bucket accounting. Compression averages are
/// reported only for repeat-mode sessions with at least one
/// compression-tagged record.
pub fn summarize(records: &[PowerLogRecord], mode: RunMode) -> RunSummary {
    let mut total = 0.0;
    let mut compression = 0.0;
    let mut transmission = 0.0;
    let mut comp_records: Vec<&PowerLogRecord> = Vec::new();

    for record in records {
        total += record.energy_mwh;
        if record.operation == Operation::Compression {
            compression += record.energy_mwh;
            comp_records.push(record);
        } else {
            transmission += record.energy_mwh;
        }
    }

    let compression_averages = if mode.is_repeat() && !comp_records.is_empty() {
        let n = comp_records.len() as f64;
        Some(CompressionAverages {
            energy_mwh: comp_records.iter().map(|r| r.energy_mwh).sum::<f64>() / n,
            voltage_mv: comp_records.iter().map(|r| r.voltage_mv).sum::<f64>() / n,
            current_ma: comp_records.iter().map(|r| r.current_ma).sum::<f64>() / n,
            duration_ms: comp_records.iter().map(|r| r.duration_ms as f64).sum::<f64>() / n,
        })
    } else {
        None
    };

    RunSummary {
        total_energy_mwh: total,
        compression_energy_mwh: compression,
        transmission_energy_mwh: transmission,
        compression_averages,
    }
}

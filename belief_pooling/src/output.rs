//! CSV export of completed trials.

use std::path::Path;

use crate::trial::TrialOutcome;

/// Write one row per completed trial: id, verification error, then the
/// pooled aggregate for each outcome.
pub fn write_trials_csv<P: AsRef<Path>>(
    path: P,
    outcomes: &[TrialOutcome],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;

    let num_goods = outcomes
        .iter()
        .filter_map(TrialOutcome::completed)
        .map(|t| t.aggregates.len())
        .next()
        .unwrap_or(0);

    let mut header = vec!["trial_id".to_string(), "max_rel_error".to_string()];
    for j in 0..num_goods {
        header.push(format!("aggregate_{j}"));
    }
    wtr.write_record(&header)?;

    for trial in outcomes.iter().filter_map(TrialOutcome::completed) {
        let mut record = vec![trial.trial_id.to_string(), trial.max_rel_error.to_string()];
        for p in &trial.aggregates {
            record.push(p.to_string());
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

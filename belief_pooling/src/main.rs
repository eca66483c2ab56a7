use belief_pooling::output::write_trials_csv;
use belief_pooling::{run_batch_parallel, BatchSummary, PoolingConfig, TrialOutcome};
use fisher::UtilityFamily;

const NUM_BIDDERS: usize = 2;
const NUM_GOODS: usize = 2;
const NUM_TRIALS: usize = 20;

fn main() {
    env_logger::init();

    println!("Belief Pooling via Fisher Market Equilibria");
    println!("===========================================");
    println!("Configuration:");
    println!("  Forecasters: {}", NUM_BIDDERS);
    println!("  Outcomes: {}", NUM_GOODS);
    println!("  Trials: {}", NUM_TRIALS);
    println!("  Utility family: cobb-douglas");
    println!();

    let config = PoolingConfig {
        num_bidders: NUM_BIDDERS,
        num_goods: NUM_GOODS,
        family: UtilityFamily::CobbDouglas,
        tolerance: 1e-5,
        seed: 42,
    };

    let outcomes = match run_batch_parallel(&config, NUM_TRIALS) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            eprintln!("experiment aborted: {e}");
            std::process::exit(1);
        }
    };

    for outcome in &outcomes {
        match outcome {
            TrialOutcome::Completed(trial) => {
                println!("Trial {:2}", trial.trial_id);
                println!("  weights:    {:?}", trial.weights);
                for (i, row) in trial.beliefs.iter().enumerate() {
                    println!("  beliefs[{i}]: {row:?}");
                }
                println!("  aggregates: {:?}", trial.aggregates);
                println!("  max rel error: {:.3e}", trial.max_rel_error);
            }
            TrialOutcome::Skipped { trial_id, reason } => {
                println!("Trial {trial_id:2} skipped ({reason})");
            }
        }
    }

    let summary = BatchSummary::from_outcomes(&outcomes);
    summary.print_summary();

    if let Some(path) = std::env::args().nth(1) {
        match write_trials_csv(&path, &outcomes) {
            Ok(()) => println!("\nWrote aggregates to {path}"),
            Err(e) => eprintln!("\nFailed to write {path}: {e}"),
        }
    }
}

//! Scripted benchmark session.
//!
//! Runs every (task, trial) pair as a short airline-support conversation
//! through a [`TrialRecorder`], at most `max_concurrency` at a time. Useful
//! for exercising the viewer without a model behind it.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use trialog_core::TrialRecorder;
use trialog_proto::{KeySchema, Store, ToolCall, Turn};

/// What to run.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub task_ids: Vec<u64>,
    pub num_trials: u32,
    pub max_concurrency: usize,
    /// Pause between steps of one trial.
    pub step_delay: Duration,
}

/// Totals over all trials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReport {
    pub completed: usize,
    pub total_reward: f64,
    pub dropped_writes: u32,
}

/// Runs the plan to completion.
pub async fn run_simulation(
    store: Arc<dyn Store>,
    keys: KeySchema,
    plan: &SimulationPlan,
) -> SimulationReport {
    let permits = Arc::new(Semaphore::new(plan.max_concurrency.max(1)));
    let mut trials = JoinSet::new();

    for trial in 0..plan.num_trials {
        for &task in &plan.task_ids {
            let store = Arc::clone(&store);
            let keys = keys.clone();
            let permits = Arc::clone(&permits);
            let delay = plan.step_delay;
            trials.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                let recorder = TrialRecorder::start(store, keys, task);
                debug!(conversation = %recorder.conversation(), trial, "Trial started");

                for (i, step) in script(task, trial).iter().enumerate() {
                    let outcome = recorder.record_turns(step).await;
                    if outcome.is_degraded() {
                        debug!(conversation = %recorder.conversation(), step = i, %outcome, "Step not recorded");
                    }
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                let reward = reward(task, trial);
                let outcome = recorder.finish(reward).await;
                if outcome.is_degraded() {
                    debug!(conversation = %recorder.conversation(), %outcome, "Reward not recorded");
                }
                Some((reward, recorder.writes_dropped()))
            });
        }
    }

    let mut report = SimulationReport::default();
    while let Some(joined) = trials.join_next().await {
        match joined {
            Ok(Some((reward, dropped))) => {
                report.completed += 1;
                report.total_reward += reward;
                report.dropped_writes += dropped;
            }
            Ok(None) => warn!("Trial skipped: concurrency limiter closed"),
            Err(e) => warn!(error = %e, "Trial task failed"),
        }
    }

    info!(
        completed = report.completed,
        total_reward = report.total_reward,
        dropped_writes = report.dropped_writes,
        "Simulation finished"
    );
    report
}

fn reward(task: u64, trial: u32) -> f64 {
    if (task + u64::from(trial)) % 3 == 0 { 0.0 } else { 1.0 }
}

/// Steps of one scripted conversation; each step is written as one batch.
fn script(task: u64, trial: u32) -> Vec<Vec<Turn>> {
    let user_id = format!("user_{task:03}");
    let reservation = format!("R{task:03}{trial:02}");

    vec![
        vec![Turn::user(format!(
            "Hi, I'd like to change the flight on reservation {reservation}."
        ))],
        vec![Turn::assistant_calls(vec![
            ToolCall::new("get_user_details", json!({ "user_id": user_id })),
            ToolCall::new(
                "get_reservation_details",
                json!({ "reservation_id": reservation }),
            ),
        ])],
        vec![
            Turn::tool_result(
                "get_user_details",
                json!({ "user_id": user_id, "membership": "gold" }),
            ),
            Turn::tool_result(
                "get_reservation_details",
                json!({ "reservation_id": reservation, "origin": "SFO", "destination": "JFK" }),
            ),
        ],
        vec![Turn::assistant(
            "I found your reservation from SFO to JFK. Which date works for you?",
        )],
        vec![Turn::user("The next morning flight, please.")],
        vec![
            Turn::assistant("Updating the reservation now.")
                .with_tool_calls(vec![ToolCall::new(
                    "update_reservation_flights",
                    json!({ "reservation_id": reservation, "cabin": "economy" }),
                )])
                .with_tool_results(json!([{ "status": "confirmed" }])),
        ],
        vec![Turn::assistant("Your flight has been changed. Anything else?")],
    ]
}

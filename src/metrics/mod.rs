//! Flow metrics for the end-of-session evaluation.
//!
//! All figures are derived from a ticket list and the number of rounds it
//! covers, so they work equally on the live board and on an archived
//! session.
//!
//! ## Figures
//!
//! - **Throughput**: tickets finished by the end of each round (cumulative)
//! - **Lead time**: `completed_round - created_round` for done tickets
//! - **Predictability**: sample standard deviation of lead times
//! - **Cumulative flow**: per round, tickets that have entered work and
//!   tickets that have finished

use serde::{Deserialize, Serialize};

use crate::core::{GameState, Ticket, TicketStatus};

/// Cumulative finished count at the end of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundThroughput {
    pub round: u32,
    pub finished: usize,
}

/// One point of the cumulative flow diagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPoint {
    pub round: u32,
    /// Tickets that entered `phase1`/`check`/`phase2` by this round.
    pub in_progress: usize,
    pub done: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetrics {
    pub throughput: Vec<RoundThroughput>,
    /// 0 when nothing is done.
    pub average_lead_time: f64,
    /// 0 with fewer than two finished tickets.
    pub predictability: f64,
    pub cumulative_flow: Vec<FlowPoint>,
}

impl FlowMetrics {
    /// Compute every figure for `tickets` over rounds `1..=rounds`.
    pub fn compute<'a>(tickets: impl IntoIterator<Item = &'a Ticket>, rounds: u32) -> Self {
        let tickets: Vec<&Ticket> = tickets.into_iter().collect();
        let finished: Vec<&Ticket> = tickets
            .iter()
            .copied()
            .filter(|t| t.status == TicketStatus::Done)
            .collect();

        let throughput = (1..=rounds)
            .map(|round| RoundThroughput {
                round,
                finished: finished
                    .iter()
                    .filter(|t| t.completed_round.is_some_and(|c| c <= round))
                    .count(),
            })
            .collect();

        let lead_times: Vec<f64> = finished
            .iter()
            .filter_map(|t| t.lead_time())
            .map(f64::from)
            .collect();
        let average_lead_time = mean(&lead_times);
        let predictability = sample_std_dev(&lead_times, average_lead_time);

        let cumulative_flow = (1..=rounds)
            .map(|round| FlowPoint {
                round,
                in_progress: tickets
                    .iter()
                    .filter(|t| t.in_progress_entered_round.is_some_and(|r| r <= round))
                    .count(),
                done: tickets
                    .iter()
                    .filter(|t| t.completed_round.is_some_and(|r| r <= round))
                    .count(),
            })
            .collect();

        Self {
            throughput,
            average_lead_time,
            predictability,
            cumulative_flow,
        }
    }

    /// Metrics for the live board up to the current round.
    #[must_use]
    pub fn for_board(state: &GameState) -> Self {
        Self::compute(state.tickets.iter(), state.round)
    }

    /// Finished tickets at the last computed round.
    #[must_use]
    pub fn total_finished(&self) -> usize {
        self.throughput.last().map_or(0, |r| r.finished)
    }
}

/// Side-by-side metrics of both archived sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionComparison {
    pub session1: FlowMetrics,
    pub session2: FlowMetrics,
}

impl SessionComparison {
    /// `None` until both sessions have been archived.
    #[must_use]
    pub fn from_state(state: &GameState, rounds: u32) -> Option<Self> {
        let first = state.session1_tickets.as_ref()?;
        let second = state.session2_tickets.as_ref()?;
        Some(Self {
            session1: FlowMetrics::compute(first.iter(), rounds),
            session2: FlowMetrics::compute(second.iter(), rounds),
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

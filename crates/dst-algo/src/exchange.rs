//! Broadcast/gather message types of the coordinator protocol.
//!
//! One iteration is a single round trip: the coordinator broadcasts a
//! per-entity signal, every entity solves its local subproblem, and the
//! coordinator gathers the resulting trajectories plus their elementwise
//! aggregate. The algorithms differ only in how they produce the broadcast
//! and consume the gather.

use dst_core::{Commitment, LocalSolveOptions, PowerSignal, Trajectory};

/// Per-entity signals and solve options for one iteration, indexed in entity
/// order (operator first, then buildings).
#[derive(Debug, Clone)]
pub struct SignalBroadcast {
    pub signals: Vec<PowerSignal>,
    pub options: Vec<LocalSolveOptions>,
}

impl SignalBroadcast {
    /// A uniform broadcast sending the same signal shape to every entity
    /// with default solve options.
    pub fn uniform(signals: Vec<PowerSignal>) -> Self {
        let options = vec![LocalSolveOptions::default(); signals.len()];
        SignalBroadcast { signals, options }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// One entity's contribution to a gather.
#[derive(Debug, Clone)]
pub struct LocalUpdate {
    /// Index of the entity in tree order.
    pub entity: usize,
    /// Locally optimal exchanged trajectory.
    pub power: Trajectory,
    /// Local objective at `power`, excluding the penalty term.
    pub objective: f64,
    /// Discrete decision taken this iteration, if the entity has one.
    pub commitment: Option<Commitment>,
}

/// A complete gather: every entity's update plus the precomputed aggregate.
#[derive(Debug, Clone)]
pub struct GatherResult {
    /// Updates in entity order; complete by construction.
    pub updates: Vec<LocalUpdate>,
    /// Elementwise sum of all exchanged trajectories. Under the signed
    /// exchange convention this is the district power imbalance.
    pub aggregate: Trajectory,
}

impl GatherResult {
    /// The gathered trajectories in entity order.
    pub fn powers(&self) -> Vec<&Trajectory> {
        self.updates.iter().map(|u| &u.power).collect()
    }

    /// Sum of all local objective values (penalty-free).
    pub fn total_objective(&self) -> f64 {
        self.updates.iter().map(|u| u.objective).sum()
    }
}

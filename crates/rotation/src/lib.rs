//! Champion rotation: performance simulation, noisy champion evaluation,
//! the champion waiting line and worst-performer replacement.

pub mod engine;
pub mod evaluator;
pub mod queue;
pub mod random;
pub mod service;
pub mod simulator;

pub use engine::{RotationEngine, RotationOutcome};
pub use evaluator::{CandidateDecision, ChampionEvaluator, EvaluationOutcome};
pub use queue::ChampionQueue;
pub use random::{RandomSource, SeededRandom, SequenceRandom, ThreadRandom};
pub use service::{QueueStatus, RotationService, ServiceResult};
pub use simulator::{PerformanceSimulator, SimulationTarget};

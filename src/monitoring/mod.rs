/*!
 * Monitoring Module
 * Request sampling and tracing setup
 */

mod sampler;
mod tracer;

pub use sampler::{SampleDecision, SamplingGate};
pub use tracer::init_tracing;

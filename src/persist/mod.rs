/*!
 * Persistence Module
 *
 * How dumped bytes and failure markers leave the pipeline:
 * - `WriteStrategy`: file, trace, both or nothing, chosen once
 * - `ErrorReporter`: fire-and-forget `<label>.<tag>` markers
 * - Reference sinks for directories and in-memory recording
 */

pub mod reporter;
pub mod sinks;
pub mod traits;
pub mod writer;

pub use reporter::ErrorReporter;
pub use sinks::{DirectorySink, MemorySink, SinkChannel, SinkRecord};
pub use traits::PersistenceSink;
pub use writer::{WriteMode, WriteStrategy};

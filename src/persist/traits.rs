/*!
 * Persistence Traits
 */

use std::io;

/// Raw persistence targets for dumped bytes
pub trait PersistenceSink: Send + Sync {
    /// Persist `data` as a file called `name`
    fn write_file(&self, name: &str, data: &[u8]) -> io::Result<()>;

    /// Persist `data` to the trace channel under `name`
    fn write_trace(&self, name: &str, data: &[u8]) -> io::Result<()>;
}

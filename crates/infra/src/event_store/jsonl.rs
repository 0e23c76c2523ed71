//! Line-delimited JSON export/import of the global log.
//!
//! One committed envelope per line, in global order. Importing replays the
//! lines through `InMemoryEventStore::restore`, which re-checks contiguity.

use std::io::{BufRead, Write};

use super::in_memory::InMemoryEventStore;
use super::r#trait::{EventStore, EventStoreError, StoredEvent};

/// Write the whole log to `writer`. Returns the number of events written.
pub fn export<S, W>(store: &S, mut writer: W) -> Result<usize, EventStoreError>
where
    S: EventStore + ?Sized,
    W: Write,
{
    let log = store.load_all()?;
    for event in &log {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    tracing::debug!(count = log.len(), "exported event log");
    Ok(log.len())
}

/// Load an exported log into `store`. Blank lines are skipped.
///
/// Stops at the first line that does not parse or does not continue the log;
/// events before it stay restored.
pub fn import<R>(reader: R, store: &InMemoryEventStore) -> Result<usize, EventStoreError>
where
    R: BufRead,
{
    let mut count = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: StoredEvent = serde_json::from_str(&line)?;
        store.restore(event)?;
        count += 1;
    }
    tracing::debug!(count, "imported event log");
    Ok(count)
}

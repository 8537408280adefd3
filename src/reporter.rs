//! Periodic position reporter

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::sourcetable::StreamDescriptor;

/// Formats the host's current position fix as an NMEA sentence. External
/// collaborator — the core doesn't own GNSS fix logic.
pub trait FixFormatter {
    /// `None` if there is no fix to report yet.
    fn format_fix(&self) -> Option<String>;
}

/// Process-wide cadence counter: a single caster-wide counter needs no
/// synchronization in this single-threaded-cooperative core; a future
/// multi-caster runtime should promote this to a per-connection field
/// instead — see DESIGN.md.
static REPORT_TICK: AtomicU64 = AtomicU64::new(0);

/// Resets the shared tick counter. Exists for tests; production code
/// never needs to call this.
#[cfg(test)]
fn reset_tick_for_test() {
    REPORT_TICK.store(0, Ordering::SeqCst);
}

/// Sends a position report to the caster when all of:
/// - the selected stream's `nmea` flag is non-zero,
/// - `fix_count > 10`,
/// - the shared tick counter is a multiple of 5,
/// - the socket is open.
///
/// Returns whether a line was written. A partial write is logged but
/// does not change any state.
pub async fn report_position(
    stream: &StreamDescriptor,
    fix_count: u64,
    socket: Option<&mut (impl AsyncWrite + Unpin)>,
    formatter: &dyn FixFormatter,
) -> bool {
    let n = REPORT_TICK.fetch_add(1, Ordering::SeqCst) + 1;

    if stream.nmea == 0 || fix_count <= 10 || n % 5 != 0 {
        return false;
    }

    let Some(socket) = socket else {
        return false;
    };

    let Some(line) = formatter.format_fix() else {
        return false;
    };

    match socket.write_all(line.as_bytes()).await {
        Ok(()) => {
            tracing::trace!("=> dgps {line}");
            true
        },
        Err(e) => {
            tracing::debug!("ntrip report write failed: {e}");
            false
        },
    }
}

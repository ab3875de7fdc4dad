use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Shown when a sync submission is interrupted.
pub(crate) const SYNC_INTERRUPTED: &str =
    "\nInterrupted while waiting for the backend. The sync may still complete on the server.\nCheck `fleetctl get sync-history` before submitting it again.";

/// Shown when the destructive-action confirmation is declined.
pub(crate) const SYNC_DECLINED: &str = "Sync cancelled, nothing was sent.";

/// Shown after a partial or failed sync.
pub(crate) const SYNC_HISTORY_HINT: &str =
    "Run `fleetctl get sync-history --detailed` for per-service results.";

/// Ask for confirmation on the terminal, unless `assume_yes` is set.
pub(crate) async fn confirm(title: &str, message: &str, assume_yes: bool) -> anyhow::Result<bool> {
    console_logger::warn(title, message);
    if assume_yes {
        return Ok(true);
    }
    print!("Proceed? [y/N]: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

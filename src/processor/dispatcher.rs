use tokio::sync::mpsc;

use crate::{context::RunContext, job::Job};

/// Feeds `jobs` in order onto the intake channel.
///
/// Stops at the first sign of cancellation. The sender is dropped on return,
/// which closes the intake for every worker.
pub(super) async fn dispatch(ctx: RunContext, jobs: Vec<Job>, intake: mpsc::Sender<Job>) {
    let total = jobs.len();
    let mut sent = 0usize;
    for job in jobs {
        match ctx.run_until_done(intake.send(job)).await {
            Ok(Ok(())) => sent += 1,
            Ok(Err(_)) => {
                log::warn!("intake closed with no workers left, {sent}/{total} jobs dispatched");
                return;
            }
            Err(cause) => {
                log::info!("dispatch stopped ({cause}), {sent}/{total} jobs dispatched");
                return;
            }
        }
    }
    log::debug!("dispatched all {total} jobs");
}

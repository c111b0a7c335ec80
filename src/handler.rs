use tracing::{error, info};

use crate::Error;
use crate::continuation::Handoff;
use crate::migration::{MigrationRequest, MigrationResponse, Migrator, TimeBudget};
use crate::store::TableStore;

/// Run one invocation and hand off its continuation
///
/// Migration failures are reported inside the response. Only a failed
/// hand-off is returned as an error, since the continuation would otherwise be
/// lost. When the hand-off takes the continuation over, the response carries
/// `handed_off` and clears `should_continue` so only one run per table pair is
/// ever in flight.
pub async fn handle_invocation<S, B, H>(
    migrator: &Migrator<'_, S>,
    request: MigrationRequest,
    budget: &B,
    handoff: &H,
) -> Result<MigrationResponse, Error>
where
    S: TableStore,
    B: TimeBudget + ?Sized,
    H: Handoff,
{
    let outcome = migrator.run(request, budget).await;

    let handed_off = if outcome.should_continue() {
        match handoff.hand_off(outcome.request()).await {
            Ok(taken) => taken,
            Err(e) => {
                error!(error = %e, "continuation hand-off failed");
                return Err(e);
            }
        }
    } else {
        false
    };

    let mut response = outcome.into_response();
    if handed_off {
        response.should_continue = false;
        response.handed_off = true;
    }
    info!(
        source_table = %response.request.source_table,
        items_copied = response.request.progress.items_copied,
        should_continue = response.should_continue,
        handed_off = response.handed_off,
        failed = response.error.is_some(),
        "invocation finished"
    );

    Ok(response)
}

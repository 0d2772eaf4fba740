use tracing::{debug, warn};

use crate::cortices::mongo::ops::op_kill_cursors::OpKillCursors;
use crate::cursors::CursorContext;
use crate::declarations::errors::MongoShimResult;
use crate::shim_core::MongoShimCore;

/// Remove and close every listed cursor. Unknown ids are ignored. Every id is
/// attempted even if closing one of them fails; the first failure is returned.
pub fn execute_kill_cursors(
    op_kill_cursors: &OpKillCursors,
    core: &MongoShimCore,
    ctx: &CursorContext,
) -> MongoShimResult<()> {
    let mut killed = 0;
    let mut first_error = None;
    for &cursor_id in &op_kill_cursors.cursor_ids {
        match core.cursors.kill(cursor_id, ctx) {
            Ok(true) => killed += 1,
            Ok(false) => {}
            Err(error) => {
                warn!(cursor_id, %error, "failed to close killed cursor");
                killed += 1;
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }
    debug!(
        requested = op_kill_cursors.cursor_ids.len(),
        killed, "killCursors"
    );
    match first_error {
        None => Ok(()),
        Some(error) => Err(error.into()),
    }
}

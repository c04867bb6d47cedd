/*!
 * Transaction helpers
 *
 * Callers open a transaction with `begin()`, run their unit of work against
 * it, and hand the outcome to [`finish`], which commits on `Ok` and rolls
 * back on `Err`. The original error is always returned to the caller.
 */

use sea_orm::{DatabaseTransaction, DbErr};
use std::fmt::Display;
use tracing::{debug, warn};

/// Commits `txn` when `result` is `Ok`, rolls it back otherwise.
///
/// A failed commit surfaces as the caller's error type. A failed rollback is
/// only logged: the unit of work already failed and its error wins. The
/// server also discards the transaction once the connection drops it.
pub async fn finish<T, E>(txn: DatabaseTransaction, result: Result<T, E>) -> Result<T, E>
where
    E: From<DbErr> + Display,
{
    match result {
        Ok(value) => {
            txn.commit().await?;
            debug!("transaction committed");
            Ok(value)
        }
        Err(err) => {
            debug!(error = %err, "rolling back transaction");
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}

use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_reset(ctx: &Context, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ResetNotConfirmed);
    }

    let pending = ctx.ledger.pending(&ctx.user_id).await?.len();
    ctx.ledger.reset(&ctx.user_id).await?;
    if pending > 0 {
        println!("Cleared local ledger for {} ({pending} unsynced changes discarded)", ctx.user_id);
    } else {
        println!("Cleared local ledger for {}", ctx.user_id);
    }
    Ok(())
}

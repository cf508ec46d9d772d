use crate::commands::common::{resolve_transaction, Context};
use crate::error::CliError;

pub async fn run_delete(ctx: &Context, id: &str) -> Result<(), CliError> {
    let record = resolve_transaction(ctx, id).await?;

    let outcome = ctx.ledger.delete(&ctx.user_id, &record.id).await?;
    if outcome.is_queued() {
        eprintln!("Deleted offline; run `tally sync` to upload");
    }
    println!("{}", record.id);
    Ok(())
}

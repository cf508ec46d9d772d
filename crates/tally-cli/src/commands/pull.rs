use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_pull(ctx: &Context) -> Result<(), CliError> {
    if !ctx.ledger.is_online() {
        println!("Offline; local ledger left unchanged.");
        return Ok(());
    }

    let records = ctx.ledger.refresh(&ctx.user_id).await?;
    println!("Ledger holds {} transactions", records.len());
    Ok(())
}

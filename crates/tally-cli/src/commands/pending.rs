use crate::commands::common::{
    format_pending_lines, outbox_item_to_pending_item, Context, PendingItem,
};
use crate::error::CliError;

pub async fn run_pending(ctx: &Context, as_json: bool) -> Result<(), CliError> {
    let items = ctx.ledger.pending(&ctx.user_id).await?;

    if as_json {
        let json_items = items
            .iter()
            .map(outbox_item_to_pending_item)
            .collect::<Vec<PendingItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Nothing pending.");
        return Ok(());
    }

    for line in format_pending_lines(&items) {
        println!("{line}");
    }
    Ok(())
}

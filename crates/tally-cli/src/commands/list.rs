use crate::commands::common::{
    format_transaction_lines, transaction_to_list_item, Context, TransactionListItem,
};
use crate::error::CliError;

pub async fn run_list(ctx: &Context, limit: usize, as_json: bool) -> Result<(), CliError> {
    let mut records = ctx.ledger.transactions(&ctx.user_id).await?;
    records.truncate(limit);

    if as_json {
        let json_items = records
            .iter()
            .map(transaction_to_list_item)
            .collect::<Vec<TransactionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("No transactions yet.");
    } else {
        for line in format_transaction_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}

use tally_core::NewTransaction;

use crate::commands::common::{
    normalize_description, parse_amount, parse_date, resolve_description, today, Context,
};
use crate::error::CliError;

pub async fn run_add(
    ctx: &Context,
    amount: &str,
    description_parts: &[String],
    date: Option<&str>,
    category: Option<&str>,
) -> Result<(), CliError> {
    let input = NewTransaction {
        date: date.map_or_else(|| Ok(today()), parse_date)?,
        description: resolve_description(description_parts)?,
        amount: parse_amount(amount)?,
        category: category.and_then(normalize_description),
    };

    let (record, outcome) = ctx.ledger.create(&ctx.user_id, input).await?;
    if outcome.is_queued() {
        eprintln!("Saved offline; run `tally sync` to upload");
    }
    println!("{}", record.id);
    Ok(())
}

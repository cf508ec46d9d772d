use crate::commands::common::{
    normalize_description, parse_amount, parse_date, resolve_transaction, Context,
};
use crate::error::CliError;

/// Field changes requested on the command line
#[derive(Debug, Default)]
pub struct EditFields {
    pub date: Option<String>,
    pub description: Option<String>,
    pub amount: Option<String>,
    pub category: Option<String>,
}

impl EditFields {
    const fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.category.is_none()
    }
}

pub async fn run_edit(ctx: &Context, id: &str, fields: EditFields) -> Result<(), CliError> {
    if fields.is_empty() {
        return Err(CliError::NothingToEdit);
    }

    let mut record = resolve_transaction(ctx, id).await?;
    if let Some(date) = fields.date.as_deref() {
        record.date = parse_date(date)?;
    }
    if let Some(description) = fields.description.as_deref() {
        record.description = normalize_description(description).ok_or(CliError::EmptyDescription)?;
    }
    if let Some(amount) = fields.amount.as_deref() {
        record.amount = parse_amount(amount)?;
    }
    if let Some(category) = fields.category.as_deref() {
        record.category = normalize_description(category);
    }

    let (updated, outcome) = ctx.ledger.update(&ctx.user_id, record).await?;
    if outcome.is_queued() {
        eprintln!("Saved offline; run `tally sync` to upload");
    }
    println!("{}", updated.id);
    Ok(())
}

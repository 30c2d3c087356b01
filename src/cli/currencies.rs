use super::ui;
use crate::converter::CurrencyConverter;
use crate::core::currency::{RateProvider, RateTable};
use anyhow::Result;
use comfy_table::Cell;

impl RateTable {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);

        for (code, rate) in self.rates() {
            table.add_row(vec![Cell::new(code), ui::amount_cell(*rate, 4)]);
        }

        let mut output = format!(
            "Rates for 1 {} ({})\n\n",
            ui::style_text(self.base().as_str(), ui::StyleType::Title),
            ui::style_text(
                &self.fetched_at().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                ui::StyleType::Subtle
            )
        );
        output.push_str(&table.to_string());
        output
    }
}

pub async fn run<P: RateProvider>(converter: &CurrencyConverter<P>, base: &str) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let result = converter.get_exchange_rates(base).await;
    pb.finish_and_clear();

    println!("{}", result?.display_as_table());
    Ok(())
}

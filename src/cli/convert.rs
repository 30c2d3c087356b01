use super::ui;
use crate::converter::CurrencyConverter;
use crate::core::currency::RateProvider;
use anyhow::Result;
use comfy_table::Cell;

/// Conversions shown when the binary runs without a subcommand.
pub const EXAMPLE_CONVERSIONS: &[(f64, &str, &str)] =
    &[(100.0, "USD", "EUR"), (50.0, "GBP", "JPY"), (1000.0, "EUR", "USD")];

/// Number of currency codes listed after the examples.
const PREVIEW_LEN: usize = 10;

pub struct ConversionRow {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub result: Result<f64, String>,
}

pub fn display_conversions(rows: &[ConversionRow]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Amount"),
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Result"),
    ]);

    for row in rows {
        let result = match &row.result {
            Ok(value) => ui::result_cell(*value),
            Err(e) => ui::error_cell(&format!("Error converting {} to {}: {e}", row.from, row.to)),
        };
        table.add_row(vec![
            ui::amount_cell(row.amount, 2),
            Cell::new(&row.from),
            Cell::new(&row.to),
            result,
        ]);
    }

    table.to_string()
}

/// First few codes followed by an ellipsis, or a note when there are none.
pub fn currency_preview(codes: &[String]) -> String {
    if codes.is_empty() {
        return ui::style_text("No currencies available", ui::StyleType::Subtle);
    }
    let shown: Vec<&str> = codes.iter().take(PREVIEW_LEN).map(String::as_str).collect();
    if codes.len() > PREVIEW_LEN {
        format!("{}...", shown.join(", "))
    } else {
        shown.join(", ")
    }
}

/// Code as shown to the user, normalized the way the converter reads it.
fn display_code(code: &str) -> String {
    code.trim().to_uppercase()
}

async fn convert_row<P: RateProvider>(
    converter: &CurrencyConverter<P>,
    amount: f64,
    from: &str,
    to: &str,
) -> ConversionRow {
    ConversionRow {
        amount,
        from: display_code(from),
        to: display_code(to),
        result: converter
            .convert(amount, from, to)
            .await
            .map_err(|e| e.to_string()),
    }
}

pub async fn run<P: RateProvider>(
    converter: &CurrencyConverter<P>,
    amount: f64,
    from: &str,
    to: &str,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let result = converter.convert(amount, from, to).await;
    pb.finish_and_clear();

    let converted = result?;
    println!(
        "{amount} {} = {} {}",
        display_code(from),
        ui::style_text(&format!("{converted:.2}"), ui::StyleType::Value),
        display_code(to)
    );
    Ok(())
}

/// Runs the example conversions and lists some supported currencies.
/// A failed example is reported in its row and does not stop the run.
pub async fn run_demo<P: RateProvider>(converter: &CurrencyConverter<P>) -> Result<()> {
    println!(
        "{}\n",
        ui::style_text("Currency Converter", ui::StyleType::Title)
    );

    let pb = ui::new_spinner("Fetching exchange rates...");
    let mut rows = Vec::with_capacity(EXAMPLE_CONVERSIONS.len());
    for (amount, from, to) in EXAMPLE_CONVERSIONS {
        rows.push(convert_row(converter, *amount, from, to).await);
    }
    let currencies = converter.supported_currencies("USD").await;
    pb.finish_and_clear();

    println!("{}", display_conversions(&rows));

    println!("\nSupported currencies:");
    match currencies {
        Ok(codes) => println!("{}", currency_preview(&codes)),
        Err(e) => println!(
            "{}",
            ui::style_text(
                &format!("Error fetching supported currencies: {e}"),
                ui::StyleType::Error
            )
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::currency::CurrencyCode;
    use crate::core::error::FetchError;
    use crate::providers::util::RetryPolicy;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct FixedRates;

    #[async_trait]
    impl RateProvider for FixedRates {
        async fn fetch_rates(
            &self,
            _base: &CurrencyCode,
        ) -> std::result::Result<BTreeMap<String, f64>, FetchError> {
            Ok(BTreeMap::from([("EUR".to_string(), 0.85)]))
        }
    }

    #[tokio::test]
    async fn test_convert_row_normalizes_codes() {
        let converter = CurrencyConverter::with_clock(
            FixedRates,
            chrono::Duration::seconds(60),
            RetryPolicy::fixed(0, std::time::Duration::ZERO),
            Arc::new(ManualClock::default()),
        );

        let row = convert_row(&converter, 100.0, " usd ", "eur ").await;
        assert_eq!(row.from, "USD");
        assert_eq!(row.to, "EUR");
        assert_eq!(row.result, Ok(85.0));

        let rendered = display_conversions(&[row]);
        assert!(rendered.contains("USD"));
        assert!(!rendered.contains(" usd "));
    }

    #[test]
    fn test_display_conversions() {
        let rows = vec![
            ConversionRow {
                amount: 100.0,
                from: "USD".into(),
                to: "EUR".into(),
                result: Ok(85.0),
            },
            ConversionRow {
                amount: 50.0,
                from: "GBP".into(),
                to: "JPY".into(),
                result: Err("boom".into()),
            },
        ];

        let output = display_conversions(&rows);
        assert!(output.contains("100.00"));
        assert!(output.contains("85.00"));
        assert!(output.contains("Error converting GBP to JPY: boom"));
    }

    #[test]
    fn test_currency_preview() {
        let codes: Vec<String> = ["AUD", "CAD", "EUR"].iter().map(|c| c.to_string()).collect();
        assert_eq!(currency_preview(&codes), "AUD, CAD, EUR");

        let many: Vec<String> = (0..12).map(|i| format!("C{i:02}")).collect();
        assert_eq!(
            currency_preview(&many),
            "C00, C01, C02, C03, C04, C05, C06, C07, C08, C09..."
        );
    }
}

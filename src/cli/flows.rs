use super::ui;
use crate::core::config::FundUniverse;
use crate::core::{FlowLedger, FlowRecord};
use chrono::NaiveDate;
use comfy_table::Cell;

/// Prints the stored ledger, optionally restricted to one quarter.
pub fn show(ledger: &FlowLedger, universe: &FundUniverse, quarter_end: Option<NaiveDate>) {
    let records: Vec<&FlowRecord> = ledger
        .iter()
        .filter(|r| quarter_end.is_none_or(|q| r.quarter_end == q))
        .collect();

    if records.is_empty() {
        match quarter_end {
            Some(q) => println!("No flows recorded for quarter ending {q}."),
            None => println!("No flows recorded yet."),
        }
        return;
    }

    print_table(records, universe);
}

pub fn print_table<'a>(records: impl IntoIterator<Item = &'a FlowRecord>, universe: &FundUniverse) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Quarter end"),
        ui::header_cell("Code"),
        ui::header_cell("Fund"),
        ui::header_cell("Flow (£m)"),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(record.quarter_end),
            Cell::new(&record.fund_id),
            Cell::new(universe.display_name(&record.fund_id).unwrap_or("-")),
            ui::flow_cell(record.flow),
        ]);
    }

    println!("{table}");
}

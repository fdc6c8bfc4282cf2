//! Run summary tables

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{CleanedDataset, PriorityList};

/// Stage counts for one pipeline run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub loaded: usize,
    pub duplicates_removed: usize,
    pub canonical: usize,
    pub gender_rewritten: usize,
    pub age_bracket_rewritten: usize,
    pub region_filled: usize,
    pub excluded_stale: usize,
    pub excluded_residual: usize,
    pub selected: usize,
    pub scored: usize,
    pub flagged: usize,
    /// Whether the exclusion counts describe the run's output
    pub selection_applied: bool,
}

impl RunSummary {
    /// Counts from the cleaning stages only
    pub fn from_cleaned(cleaned: &CleanedDataset) -> Self {
        Self {
            loaded: cleaned.reconcile.input_records,
            duplicates_removed: cleaned.reconcile.duplicates_removed,
            canonical: cleaned.reconcile.canonical_records,
            gender_rewritten: cleaned.normalize.gender_rewritten,
            age_bracket_rewritten: cleaned.normalize.age_bracket_rewritten,
            region_filled: cleaned.normalize.region_filled,
            excluded_stale: cleaned.excluded_stale,
            excluded_residual: cleaned.excluded_residual,
            selected: cleaned.selected.len(),
            selection_applied: true,
            ..Default::default()
        }
    }

    /// Counts up to normalization, for outputs written before the exclusions
    pub fn without_selection(cleaned: &CleanedDataset) -> Self {
        Self {
            loaded: cleaned.reconcile.input_records,
            duplicates_removed: cleaned.reconcile.duplicates_removed,
            canonical: cleaned.reconcile.canonical_records,
            gender_rewritten: cleaned.normalize.gender_rewritten,
            age_bracket_rewritten: cleaned.normalize.age_bracket_rewritten,
            region_filled: cleaned.normalize.region_filled,
            ..Default::default()
        }
    }

    pub fn with_scores(mut self, ranked: &PriorityList) -> Self {
        self.scored = ranked.len();
        self.flagged = ranked.flagged().count();
        self
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        for line in self.table().to_string().lines() {
            println!("    {}", line);
        }
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Stage").add_attribute(Attribute::Bold),
            Cell::new("Records").add_attribute(Attribute::Bold),
        ]);

        let highlight = |n: usize, color: Color| {
            Cell::new(n)
                .fg(if n == 0 { Color::White } else { color })
                .set_alignment(CellAlignment::Right)
        };

        table.add_row(vec![
            Cell::new("📁 Loaded"),
            Cell::new(self.loaded).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new("🔁 Duplicates removed"),
            highlight(self.duplicates_removed, Color::Yellow),
        ]);
        table.add_row(vec![
            Cell::new("🧾 Canonical"),
            Cell::new(self.canonical).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new("🏷️  Labels normalized"),
            highlight(
                self.gender_rewritten + self.age_bracket_rewritten + self.region_filled,
                Color::Cyan,
            ),
        ]);

        if self.selection_applied {
            table.add_row(vec![
                Cell::new("⏳ Excluded (stale)"),
                highlight(self.excluded_stale, Color::Red),
            ]);
            table.add_row(vec![
                Cell::new("🪙 Excluded (residual)"),
                highlight(self.excluded_residual, Color::Red),
            ]);
            table.add_row(vec![
                Cell::new("✅ Selected"),
                Cell::new(self.selected)
                    .fg(Color::Green)
                    .add_attribute(Attribute::Bold)
                    .set_alignment(CellAlignment::Right),
            ]);
        }

        if self.scored > 0 {
            table.add_row(vec![
                Cell::new("🎯 Scored"),
                Cell::new(self.scored).set_alignment(CellAlignment::Right),
            ]);
            table.add_row(vec![
                Cell::new("🚩 Flagged for review"),
                highlight(self.flagged, Color::Magenta).add_attribute(Attribute::Bold),
            ]);
        }

        table
    }
}

/// Print the highest-ranked debtors
pub fn display_call_list(ranked: &PriorityList, top: usize) {
    if ranked.is_empty() || top == 0 {
        return;
    }

    println!();
    println!(
        "    {} {}",
        style("📞").cyan(),
        style(format!("TOP {} CALL LIST", top.min(ranked.len()))).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Client").add_attribute(Attribute::Bold),
        Cell::new("Balance").add_attribute(Attribute::Bold),
        Cell::new("Days past due").add_attribute(Attribute::Bold),
        Cell::new("P(pay)").add_attribute(Attribute::Bold),
        Cell::new("Anomaly").add_attribute(Attribute::Bold),
    ]);

    for (rank, record) in ranked.top(top).iter().enumerate() {
        let anomaly = Cell::new(format!("{:.4}", record.anomaly_score));
        let anomaly = if record.anomaly_flag {
            anomaly.fg(Color::Red).add_attribute(Attribute::Bold)
        } else {
            anomaly
        };

        table.add_row(vec![
            Cell::new(rank + 1).set_alignment(CellAlignment::Right),
            Cell::new(record.client_id()),
            Cell::new(format!("{:.2}", record.principal_balance()))
                .set_alignment(CellAlignment::Right),
            Cell::new(record.days_past_due()).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", record.payment_probability))
                .fg(Color::Green)
                .set_alignment(CellAlignment::Right),
            anomaly,
        ]);
    }

    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use survey_harmonize::HarmonizationReport;
use survey_indicators::Catalogue;
use survey_model::{CanonicalField, ResultRow, ResultTable, Unit, WideTable};
use survey_standards::{FieldDescription, WaveRegistry};

pub fn print_waves(registry: &WaveRegistry) {
    if let Some(pins) = registry.pins() {
        println!(
            "Standards {} (catalogue {})",
            pins.standards, pins.catalogue
        );
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Wave"),
        header_cell("Survey"),
        header_cell("Label"),
        header_cell("Design"),
        header_cell("Poverty lines"),
        header_cell("Not collected"),
    ]);
    apply_table_style(&mut table);
    for mapping in registry.waves() {
        let design = match (
            mapping.is_mapped(CanonicalField::Strata),
            mapping.is_mapped(CanonicalField::Psu),
        ) {
            (true, true) => Cell::new("strata + PSU"),
            (false, true) => Cell::new("PSU"),
            (true, false) => Cell::new("strata").fg(Color::Yellow),
            (false, false) => Cell::new("weights only").fg(Color::Yellow),
        };
        let lines = mapping
            .poverty_lines()
            .map_or_else(|| dim_cell("-"), |lines| Cell::new(&lines.name));
        let not_collected: Vec<&str> = mapping
            .not_available_fields()
            .map(|field| field.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(mapping.wave.as_str())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&mapping.survey),
            Cell::new(&mapping.label),
            design,
            lines,
            dim_cell(not_collected.join(", ")),
        ]);
    }
    println!("{table}");
}

pub fn print_wave_fields(wave: &str, fields: &[FieldDescription]) {
    println!("Wave: {wave}");
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Label"),
        header_cell("Source"),
        header_cell("Missing codes"),
        header_cell("Recodes"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 4, CellAlignment::Right);
    for field in fields {
        let name = Cell::new(field.field.as_str());
        if !field.available {
            table.add_row(vec![
                name.fg(Color::DarkGrey),
                dim_cell(&field.label),
                dim_cell("not collected"),
                dim_cell("-"),
                dim_cell("-"),
            ]);
            continue;
        }
        table.add_row(vec![
            name,
            Cell::new(&field.label),
            Cell::new(field.source.as_deref().unwrap_or("-")),
            if field.missing_codes.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(field.missing_codes.join(", "))
            },
            count_cell(field.recode_count),
        ]);
    }
    println!("{table}");
}

pub fn print_catalogue(catalogue: &Catalogue) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Indicator"),
        header_cell("Label"),
        header_cell("Unit"),
        header_cell("Population"),
    ]);
    apply_table_style(&mut table);
    for spec in catalogue.iter() {
        table.add_row(vec![
            Cell::new(spec.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(spec.label),
            unit_cell(spec.unit),
            Cell::new(spec.eligible.to_string()),
        ]);
    }
    println!("{table}");
}

pub fn print_results(table: &ResultTable) {
    let mut out = Table::new();
    out.set_header(vec![
        header_cell("Indicator"),
        header_cell("Wave"),
        header_cell("Estimate"),
        header_cell("95% CI"),
        header_cell("Unit"),
        header_cell("n"),
        header_cell("Excluded"),
    ]);
    apply_table_style(&mut out);
    align_column(&mut out, 2, CellAlignment::Right);
    align_column(&mut out, 3, CellAlignment::Right);
    align_column(&mut out, 5, CellAlignment::Right);
    align_column(&mut out, 6, CellAlignment::Right);
    for row in &table.rows {
        out.add_row(vec![
            Cell::new(&row.indicator)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(row.wave.as_str()),
            estimate_cell(row),
            interval_cell(row),
            unit_cell(row.unit),
            count_cell(row.sample_size),
            count_cell(row.excluded_missing + row.excluded_unrecognized),
        ]);
    }
    println!("{out}");
    if table.rows.iter().any(|row| row.ci_approximate) {
        println!("* interval treats each record as its own cluster (no PSU in this wave)");
    }
}

pub fn print_wide(table: &WideTable) {
    let mut out = Table::new();
    let mut header = vec![header_cell("Indicator"), header_cell("Unit")];
    header.extend(table.waves.iter().map(|wave| header_cell(wave.as_str())));
    header.push(header_cell("Change"));
    out.set_header(header);
    apply_table_style(&mut out);
    for index in 2..table.waves.len() + 3 {
        align_column(&mut out, index, CellAlignment::Right);
    }
    for row in &table.rows {
        let mut cells = vec![
            Cell::new(&row.indicator)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            unit_cell(row.unit),
        ];
        for wave in &table.waves {
            cells.push(match row.cell(wave) {
                Some(cell) => match (cell.estimate, cell.undefined_reason) {
                    (Some(value), _) => Cell::new(format_value(value)),
                    (None, Some(reason)) => dim_cell(reason.as_str()),
                    (None, None) => dim_cell("-"),
                },
                None => dim_cell("-"),
            });
        }
        cells.push(match row.change() {
            Some(change) if change > 0.0 => {
                Cell::new(format!("+{}", format_value(change))).fg(Color::Green)
            }
            Some(change) if change < 0.0 => Cell::new(format_value(change)).fg(Color::Red),
            Some(change) => Cell::new(format_value(change)),
            None => dim_cell("-"),
        });
        out.add_row(cells);
    }
    println!("{out}");
}

/// Harmonization findings worth a user's attention; silent when clean.
pub fn print_findings(report: &HarmonizationReport) {
    if !report.has_findings() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Wave"),
        header_cell("Field"),
        header_cell("Finding"),
        header_cell("Records"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for missing in &report.missing_sources {
        table.add_row(vec![
            Cell::new(report.wave.as_str()),
            Cell::new(missing.field.as_str()),
            Cell::new(format!("source column {} absent", missing.source)).fg(Color::Red),
            count_cell(report.records),
        ]);
    }
    for (field, values) in &report.unrecognized {
        let mut values: Vec<(&String, &usize)> = values.iter().collect();
        values.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let shown: Vec<String> = values
            .iter()
            .take(5)
            .map(|(value, count)| format!("'{value}' x{count}"))
            .collect();
        table.add_row(vec![
            Cell::new(report.wave.as_str()),
            Cell::new(field.as_str()),
            Cell::new(format!("unrecognized: {}", shown.join(", "))).fg(Color::Yellow),
            count_cell(report.unrecognized_count(*field)),
        ]);
    }
    eprintln!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn format_value(value: f64) -> String {
    if value.abs() < 1.0 {
        format!("{value:.4}")
    } else {
        format!("{value:.2}")
    }
}

fn estimate_cell(row: &ResultRow) -> Cell {
    match (row.estimate, row.undefined_reason) {
        (Some(value), _) => Cell::new(format_value(value)),
        (None, Some(reason)) => dim_cell(reason.as_str()),
        (None, None) => dim_cell("-"),
    }
}

fn interval_cell(row: &ResultRow) -> Cell {
    match (row.lower_ci, row.upper_ci) {
        (Some(lower), Some(upper)) => {
            let marker = if row.ci_approximate { "*" } else { "" };
            Cell::new(format!(
                "[{}, {}]{marker}",
                format_value(lower),
                format_value(upper)
            ))
        }
        _ => dim_cell("-"),
    }
}

fn unit_cell(unit: Unit) -> Cell {
    match unit.as_str() {
        "" => dim_cell("-"),
        unit => Cell::new(unit),
    }
}

fn count_cell(count: usize) -> Cell {
    if count == 0 {
        dim_cell(0)
    } else {
        Cell::new(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

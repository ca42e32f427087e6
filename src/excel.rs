//! Spreadsheet output.
//!
//! The full run is accumulated in memory and written in one pass when the
//! scrape completes: an "Organizations" sheet with every record plus a
//! "Potential" sheet with the subset passing the lead filters. An existing
//! file at the output path is overwritten without warning.

use anyhow::{Context, Result};
use csv::Writer;
use rust_xlsxwriter::{Format, Workbook};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::config::FiltersConfig;
use crate::filters::passes_potential_filters;
use crate::organization::Organization;

/// Write the results in the configured format. `format` has been validated
/// as "xlsx" or "csv" by the config layer.
pub fn write_results(
    organizations: &[Organization],
    output_path: &str,
    format: &str,
    sheet_name: &str,
    filters: &FiltersConfig,
) -> Result<()> {
    let potential: Vec<&Organization> = organizations
        .iter()
        .filter(|org| passes_potential_filters(org, filters))
        .collect();

    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
    }

    match format {
        "csv" => export_csv(organizations, &potential, output_path)?,
        _ => export_xlsx(organizations, &potential, output_path, sheet_name)?,
    }

    info!(
        "Exported {} organizations ({} potential) to {}",
        organizations.len(),
        potential.len(),
        output_path
    );
    Ok(())
}

fn export_xlsx(
    organizations: &[Organization],
    potential: &[&Organization],
    output_path: &str,
    sheet_name: &str,
) -> Result<()> {
    debug!("Exporting {} organizations to XLSX: {}", organizations.len(), output_path);

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(sheet_name)
            .with_context(|| format!("Invalid sheet name: {}", sheet_name))?;
        write_sheet_rows(sheet, organizations.iter(), &header_format)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Potential").context("Invalid sheet name: Potential")?;
        write_sheet_rows(sheet, potential.iter().copied(), &header_format)?;
    }

    workbook
        .save(output_path)
        .with_context(|| format!("Failed to write workbook: {}", output_path))?;
    Ok(())
}

fn write_sheet_rows<'a>(
    sheet: &mut rust_xlsxwriter::Worksheet,
    organizations: impl Iterator<Item = &'a Organization>,
    header_format: &Format,
) -> Result<()> {
    for (col, header) in Organization::HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, header_format)?;
    }
    for (row, org) in organizations.enumerate() {
        for (col, value) in org.row().iter().enumerate() {
            sheet.write_string((row + 1) as u32, col as u16, *value)?;
        }
    }
    Ok(())
}

/// CSV export: the full list goes to the output path, the potential subset
/// to a sibling `<stem>_potential.csv` file (CSV has no second sheet).
fn export_csv(
    organizations: &[Organization],
    potential: &[&Organization],
    output_path: &str,
) -> Result<()> {
    debug!("Exporting {} organizations to CSV: {}", organizations.len(), output_path);

    write_csv_file(output_path, organizations.iter())?;
    let potential_path = potential_csv_path(output_path);
    write_csv_file(&potential_path, potential.iter().copied())?;
    Ok(())
}

fn write_csv_file<'a>(
    path: &str,
    organizations: impl Iterator<Item = &'a Organization>,
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create file: {}", path))?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(Organization::HEADERS)?;
    for org in organizations {
        wtr.write_record(org.row())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn potential_csv_path(output_path: &str) -> String {
    let path = Path::new(output_path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "result".to_string());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    parent
        .join(format!("{}_potential.csv", stem))
        .to_string_lossy()
        .to_string()
}

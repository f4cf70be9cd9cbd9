//! Column profiler: numeric statistics per column below the header row

use crate::config::ExtractorConfig;
use crate::core::numeric::parse_numeric;
use crate::types::{Cell, ColumnProfile, Worksheet};
use tracing::debug;

/// Number of columns to profile: the header row's width, or the sheet's when the header row is blank
pub fn header_width(sheet: &Worksheet, header_row: usize) -> usize {
    let width = sheet.row(header_row).len();
    if width > 0 {
        width
    } else {
        sheet.width()
    }
}

/// Profile every column of the header row over the sampling window
pub fn profile_columns(
    sheet: &Worksheet,
    header_row: usize,
    config: &ExtractorConfig,
) -> Vec<ColumnProfile> {
    let width = header_width(sheet, header_row);
    let start = header_row + 1;
    let end = sheet
        .row_count()
        .min(start.saturating_add(config.profile_sample_rows));
    let sampled_rows = end.saturating_sub(start);

    (0..width)
        .map(|col| {
            let header = sheet.cell(header_row, col).text().to_lowercase();
            let profile = profile_column(sheet, col, header, start..end, sampled_rows, config);
            debug!(
                col,
                header = %profile.header,
                data_points = profile.numeric_count,
                density = profile.density,
                "profiled column"
            );
            profile
        })
        .collect()
}

fn profile_column(
    sheet: &Worksheet,
    col: usize,
    header: String,
    rows: std::ops::Range<usize>,
    sampled_rows: usize,
    config: &ExtractorConfig,
) -> ColumnProfile {
    let mut profile = ColumnProfile::empty(col, header);
    profile.sampled_rows = sampled_rows;

    let mut magnitude_sum = 0.0;
    for row in rows {
        let cell: &Cell = sheet.cell(row, col);
        let Some(value) = parse_numeric(cell) else {
            continue;
        };
        if value == 0.0 {
            profile.zero_count += 1;
            continue;
        }
        profile.numeric_count += 1;
        magnitude_sum += value.abs();
        profile.max_magnitude = profile.max_magnitude.max(value.abs());
        if profile.samples.len() < config.profile_sample_values {
            profile.samples.push(value);
        }
    }

    if profile.numeric_count > 0 {
        profile.average_magnitude = magnitude_sum / profile.numeric_count as f64;
    }
    if sampled_rows > 0 {
        profile.density = profile.numeric_count as f64 / sampled_rows as f64;
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Worksheet {
        Worksheet::new(
            "S",
            vec![
                vec![Cell::from("Concepto"), Cell::from("Actual"), Cell::from("Notas")],
                vec![Cell::from("Ventas"), Cell::Number(1000.0), Cell::from("ok")],
                vec![Cell::from("Costos"), Cell::from("(250)"), Cell::Empty],
                vec![Cell::from("Otros"), Cell::Number(0.0)],
                vec![Cell::from("Rentas"), Cell::from("-")],
            ],
        )
    }

    #[test]
    fn test_profile_counts_and_magnitudes() {
        let profiles = profile_columns(&sheet(), 0, &ExtractorConfig::default());
        assert_eq!(profiles.len(), 3);

        let actual = &profiles[1];
        assert_eq!(actual.header, "actual");
        assert_eq!(actual.numeric_count, 2);
        assert_eq!(actual.zero_count, 1);
        assert_eq!(actual.sampled_rows, 4);
        assert_eq!(actual.density, 0.5);
        assert_eq!(actual.max_magnitude, 1000.0);
        assert_eq!(actual.average_magnitude, 625.0);
        assert_eq!(actual.samples, vec![1000.0, -250.0]);
    }

    #[test]
    fn test_text_column_has_no_numeric_data() {
        let profiles = profile_columns(&sheet(), 0, &ExtractorConfig::default());
        assert_eq!(profiles[0].numeric_count, 0);
        assert_eq!(profiles[2].numeric_count, 0);
        assert_eq!(profiles[2].density, 0.0);
    }

    #[test]
    fn test_sample_window_is_bounded() {
        let mut rows = vec![vec![Cell::from("Concepto"), Cell::from("Actual")]];
        for i in 0..80 {
            rows.push(vec![Cell::from("x"), Cell::Number(i as f64 + 1.0)]);
        }
        let config = ExtractorConfig::default();
        let profiles = profile_columns(&Worksheet::new("S", rows), 0, &config);
        assert_eq!(profiles[1].sampled_rows, 50);
        assert_eq!(profiles[1].numeric_count, 50);
        assert_eq!(profiles[1].density, 1.0);
        assert_eq!(profiles[1].samples.len(), 10);
    }

    #[test]
    fn test_header_beyond_sheet_yields_zero_profiles() {
        let sheet = Worksheet::new("S", vec![vec![Cell::from("a"), Cell::Number(1.0)]]);
        let profiles = profile_columns(&sheet, 4, &ExtractorConfig::default());
        assert_eq!(profiles.len(), 2);
        assert!(profiles.iter().all(|p| p.numeric_count == 0 && p.sampled_rows == 0));
    }
}

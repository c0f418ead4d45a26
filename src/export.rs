use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::synthetic::SyntheticPopulation;

pub struct ExportReport {
    pub rows: usize,
}

/// Writes a generated population as a two-sheet workbook: one row per
/// synthetic match, plus the summary block the dashboard collaborator
/// shows as KPIs.
pub fn export_population(path: &Path, population: &SyntheticPopulation) -> Result<ExportReport> {
    let mut match_rows = vec![
        vec![
            "Team Color".to_string(),
            "Game Mode".to_string(),
            "Goal Diff".to_string(),
            "Duration (s)".to_string(),
            "Overtime".to_string(),
            "Intensity".to_string(),
            "Predicted Winner".to_string(),
            "Confidence".to_string(),
        ],
    ];
    for row in &population.rows {
        match_rows.push(vec![
            row.team_color.clone(),
            row.game_mode.clone(),
            row.goal_difference.to_string(),
            row.match_duration.to_string(),
            if row.overtime { "yes" } else { "no" }.to_string(),
            row.is_competitive.to_string(),
            row.predicted_winner.clone(),
            format!("{:.4}", row.prediction_confidence),
        ]);
    }

    let summary = &population.summary;
    let mut summary_rows = vec![vec!["Metric".to_string(), "Value".to_string()]];
    summary_rows.push(vec![
        "Total matches".to_string(),
        summary.total_matches.to_string(),
    ]);
    for (winner, count) in &summary.predictions {
        summary_rows.push(vec![format!("Predicted {winner}"), count.to_string()]);
    }
    summary_rows.push(vec![
        "Average confidence".to_string(),
        format!("{:.4}", summary.avg_confidence),
    ]);
    summary_rows.push(vec![
        "Mode filter".to_string(),
        summary
            .game_mode_filter
            .clone()
            .unwrap_or_else(|| "(none)".to_string()),
    ]);
    summary_rows.push(vec!["Generated at".to_string(), Utc::now().to_rfc3339()]);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Matches")?;
        write_rows(sheet, &match_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        rows: population.rows.len(),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

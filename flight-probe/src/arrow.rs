use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use arrow_array::{Array, RecordBatch};
use arrow_cast::display::array_value_to_string;
use arrow_csv::WriterBuilder;
use arrow_schema::ArrowError;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, CellAlignment, Color,
    ContentArrangement, Table,
};
use tracing::info;

use crate::client::ResultSet;
use crate::error::{ProbeError, Result};

/// Convert an Arrow value to a printable string.
pub fn cell_to_string(column: &dyn Array, row_idx: usize) -> Result<String, ArrowError> {
    if column.is_null(row_idx) {
        return Ok("NULL".to_string());
    }
    array_value_to_string(column, row_idx)
}

/// Render the first `limit` rows as a table.
pub fn render_preview(result: &ResultSet, limit: usize) -> Result<String, ArrowError> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header: Vec<Cell> = result
        .schema
        .fields()
        .iter()
        .map(|field| {
            Cell::new(field.name())
                .fg(Color::Cyan)
                .set_alignment(CellAlignment::Center)
        })
        .collect();
    table.set_header(header);

    let mut remaining = limit;
    for batch in &result.batches {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.num_rows());
        for row_idx in 0..take {
            let mut cells = Vec::with_capacity(batch.num_columns());
            for column in batch.columns() {
                cells.push(Cell::new(cell_to_string(column.as_ref(), row_idx)?));
            }
            table.add_row(cells);
        }
        remaining -= take;
    }

    let shown = limit.min(result.total_rows);
    Ok(format!(
        "{table}\nShowing {shown} of {} row{}",
        result.total_rows,
        if result.total_rows == 1 { "" } else { "s" }
    ))
}

/// Write the result set to `path` as CSV with a header row.
pub fn export_csv(result: &ResultSet, path: &Path) -> Result<()> {
    let export_err = |reason: String| ProbeError::Export {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::create(path).map_err(|e| export_err(e.to_string()))?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .build(BufWriter::new(file));

    if result.batches.is_empty() {
        let empty = RecordBatch::new_empty(result.schema.clone());
        writer.write(&empty).map_err(|e| export_err(e.to_string()))?;
    }
    for batch in &result.batches {
        writer.write(batch).map_err(|e| export_err(e.to_string()))?;
    }
    writer
        .into_inner()
        .flush()
        .map_err(|e| export_err(e.to_string()))?;

    info!(path = %path.display(), rows = result.total_rows, "exported result");
    Ok(())
}

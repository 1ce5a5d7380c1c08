use arrow_schema::Field;

use crate::client::ResultSet;

const RULE: &str = "------------------------------------------------";
const BANNER: &str = "SUCCESS! Received data via Flight client";

/// Render the summary block printed after a successful fetch.
///
/// Columns are listed in the order the server declared them.
pub fn render_report(result: &ResultSet) -> String {
    let mut lines = vec![
        RULE.to_string(),
        BANNER.to_string(),
        format!("Total Rows: {}", result.num_rows()),
        format!("Total Columns: {}", result.num_columns()),
        RULE.to_string(),
        "Schema:".to_string(),
    ];
    lines.extend(result.schema.fields().iter().map(|f| describe_field(f)));
    lines.join("\n")
}

/// Print [`render_report`] to standard output.
pub fn report(result: &ResultSet) {
    println!("{}", render_report(result));
}

fn describe_field(field: &Field) -> String {
    let nullability = if field.is_nullable() { "" } else { " not null" };
    format!("{}: {}{}", field.name(), field.data_type(), nullability)
}

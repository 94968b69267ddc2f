use pilot_config::Limits;
use pilot_drivers::Page;
use serde_json::{json, Value};

/// One table: rows of cell texts, padded to the widest row.
pub type Table = Vec<Vec<String>>;

const EXTRACT_SCRIPT: &str = r#"
const [maxTables, maxRows, maxCells] = [arguments[0], arguments[1], arguments[2]];
return Array.from(document.querySelectorAll('table')).slice(0, maxTables).map(t =>
  Array.from(t.querySelectorAll('tr')).slice(0, maxRows).map(r =>
    Array.from(r.querySelectorAll('th,td')).slice(0, maxCells).map(c => (c.innerText || '').trim())));
"#;

/// Cell text of the first `max_tables` tables on the page.
pub async fn extract_tables(page: &dyn Page, limits: &Limits) -> anyhow::Result<Vec<Table>> {
    let raw = page
        .evaluate(
            EXTRACT_SCRIPT,
            vec![
                json!(limits.max_tables),
                json!(limits.max_rows),
                json!(limits.max_cells),
            ],
        )
        .await?;
    Ok(normalize(&raw, limits))
}

/// Apply the caps and make every table rectangular. Anything that is not an
/// array of arrays of strings is skipped or coerced to text.
fn normalize(raw: &Value, limits: &Limits) -> Vec<Table> {
    let Some(tables) = raw.as_array() else {
        return Vec::new();
    };
    tables
        .iter()
        .take(limits.max_tables)
        .map(|table| {
            let mut rows: Table = table
                .as_array()
                .map(|rows| {
                    rows.iter()
                        .take(limits.max_rows)
                        .map(|row| {
                            row.as_array()
                                .map(|cells| {
                                    cells.iter().take(limits.max_cells).map(cell_text).collect()
                                })
                                .unwrap_or_default()
                        })
                        .filter(|row: &Vec<String>| !row.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            for row in &mut rows {
                row.resize(width, String::new());
            }
            rows
        })
        .collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

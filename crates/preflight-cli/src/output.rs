use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Aligned table, indented for nesting under a class heading.
pub fn print_table(headers: &[&str], rows: &[Vec<String>], indent: usize) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.len());
            }
        }
    }

    let pad = " ".repeat(indent);
    let render = |cells: &[String]| -> String {
        let aligned: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                format!("{cell:<width$}", width = widths.get(i).copied().unwrap_or(0))
            })
            .collect();
        format!("{pad}{}", aligned.join("  ").trim_end())
    };

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    println!("{}", render(&header));
    for row in rows {
        println!("{}", render(row));
    }
}

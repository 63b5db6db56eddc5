//! Cell addressing helpers shared by the reader and the writer

/// Convert a 0-based column index to its letter code (0 -> A, 25 -> Z, 26 -> AA)
pub fn column_code(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

/// Format a 0-based (row, col) pair as an A1-style reference
pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", column_code(col), u64::from(row) + 1)
}

/// Parse an A1-style reference (`$` markers allowed) into 0-based (row, col)
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let s = cell_ref.trim_start_matches('$');
    let split = s.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, digits) = s.split_at(split);
    let digits = digits.strip_prefix('$').unwrap_or(digits);

    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let col = letters.bytes().try_fold(0u32, |acc, b| {
        acc.checked_mul(26)?
            .checked_add(u32::from(b.to_ascii_uppercase() - b'A') + 1)
    })?;
    let row = digits.parse::<u32>().ok()?.checked_sub(1)?;

    Some((row, col - 1))
}

/// Parse a range like `A1:C3` into its top-left and bottom-right corners.
/// A single reference is a one-cell range.
pub fn parse_range_ref(range: &str) -> Option<((u32, u32), (u32, u32))> {
    match range.split_once(':') {
        Some((start, end)) => {
            let (r1, c1) = parse_cell_ref(start)?;
            let (r2, c2) = parse_cell_ref(end)?;
            Some(((r1.min(r2), c1.min(c2)), (r1.max(r2), c1.max(c2))))
        }
        None => parse_cell_ref(range).map(|cell| (cell, cell)),
    }
}

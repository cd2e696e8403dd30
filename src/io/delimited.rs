//! Delimited-text field handling shared by the catalog and the sample table.
//!
//! Fields containing the delimiter, a double quote or a line break are
//! wrapped in double quotes on write, with embedded quotes doubled.

use crate::types::{WofsError, WofsResult};
use std::borrow::Cow;

/// Quote `field` if it would otherwise break the row
pub fn quote_field(field: &str, delimiter: char) -> Cow<'_, str> {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r') {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Split one row into trimmed fields, honouring double-quoted fields
pub fn split_fields(line: &str, delimiter: char) -> WofsResult<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => quoted = false,
                _ => current.push(c),
            }
        } else if c == '"' && current.trim().is_empty() {
            current.clear();
            quoted = true;
        } else if c == delimiter {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }

    if quoted {
        return Err(WofsError::InvalidFormat(format!("unterminated quoted field in '{}'", line)));
    }
    fields.push(current.trim().to_string());
    Ok(fields)
}

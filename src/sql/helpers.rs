//! Shared helpers for rendering SQL fragments.

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Literals
// =============================================================================

/// Quote string with single quotes, doubling embedded quotes.
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Format boolean as an upper-case SQL keyword.
pub fn format_bool_keyword(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Format a real number, keeping a decimal point on whole values.
///
/// Returns `None` for NaN and infinities, which have no SQL literal form.
pub fn format_real(f: f64) -> Option<String> {
    if !f.is_finite() {
        return None;
    }
    let mut buffer = ryu::Buffer::new();
    Some(buffer.format_finite(f).to_string())
}

// =============================================================================
// Column References
// =============================================================================

static BARE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Quote identifier with backticks.
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// `${TABLE}.column` with `TABLE` replaced by `placeholder`.
///
/// Columns that are not bare identifiers (`2023_sales`, `café`) are
/// backtick-quoted.
pub fn table_column(placeholder: &str, column: &str) -> String {
    if BARE_IDENTIFIER.is_match(column) {
        format!("${{{}}}.{}", placeholder, column)
    } else {
        format!("${{{}}}.{}", placeholder, quote_backtick(column))
    }
}

// =============================================================================
// Templates
// =============================================================================

static TEMPLATE_SLOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\d+)\}").unwrap());

/// Fill `{0}`, `{1}`, ... slots in `template` from `args`.
///
/// On failure returns the first slot index with no matching argument.
pub fn fill_template(template: &str, args: &[String]) -> Result<String, usize> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in TEMPLATE_SLOT.captures_iter(template) {
        let (Some(whole), Some(index)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let index: usize = index.as_str().parse().unwrap_or(usize::MAX);
        let arg = args.get(index).ok_or(index)?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(arg);
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Highest slot index referenced by a template, if any.
pub fn template_max_slot(template: &str) -> Option<usize> {
    TEMPLATE_SLOT
        .captures_iter(template)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .max()
}

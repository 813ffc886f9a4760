use chrono::NaiveDateTime;

/// Locale-dependent formatting, supplied by the host application. Returned
/// strings are embedded in the report verbatim.
pub trait Formatter {
    fn format_date_time(&self, at: &NaiveDateTime) -> String;
    fn format_number(&self, value: f64) -> String;
}

pub struct DefaultFormatter {
    pub date_pattern: String,
    pub decimal_separator: char,
}

impl Default for DefaultFormatter {
    fn default() -> Self {
        Self {
            date_pattern: "%d %b %Y %H:%M".to_string(),
            decimal_separator: '.',
        }
    }
}

impl Formatter for DefaultFormatter {
    fn format_date_time(&self, at: &NaiveDateTime) -> String {
        at.format(&self.date_pattern).to_string()
    }

    fn format_number(&self, value: f64) -> String {
        // Shortest round-trip form: 11.0 -> "11", 4.50 -> "4.5"
        let s = format!("{value}");
        if self.decimal_separator == '.' {
            s
        } else {
            s.replace('.', &self.decimal_separator.to_string())
        }
    }
}

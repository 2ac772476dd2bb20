//! Utility functions and helpers for dbutils
//!
//! - Parsing of command-line value syntaxes
//! - Duration formatting for summaries

/// Command-line value parsers
pub mod parse {
    /// Parse a loose boolean.
    ///
    /// Accepts yes/no, true/false, t/f, y/n, on/off and 1/0 in any case.
    pub fn parse_bool(value: &str) -> Result<bool, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "t" | "on" | "1" => Ok(true),
            "no" | "n" | "false" | "f" | "off" | "0" => Ok(false),
            other => Err(format!("'{other}' is not a boolean value")),
        }
    }

    /// Split a comma-separated list, trimming entries and dropping empty ones
    pub fn split_fields(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Split a `field=pattern` filter argument at the first `=`.
    ///
    /// The pattern may itself contain `=`; the field may not be empty.
    pub fn parse_query_pair(value: &str) -> Result<(String, String), String> {
        match value.split_once('=') {
            Some((field, pattern)) if !field.trim().is_empty() => {
                Ok((field.trim().to_string(), pattern.to_string()))
            }
            Some(_) => Err(format!("'{value}' has an empty field name")),
            None => Err(format!("'{value}' is not in KEY=REGEX form")),
        }
    }
}

/// Time and duration utilities
pub mod time {
    use std::time::Duration;

    /// Format a duration for humans (`850ms`, `12.40s`, `3m 05s`)
    pub fn format_duration(duration: Duration) -> String {
        let millis = duration.as_millis();
        if millis < 1000 {
            format!("{millis}ms")
        } else if millis < 60_000 {
            format!("{:.2}s", duration.as_secs_f64())
        } else {
            let secs = duration.as_secs();
            format!("{}m {:02}s", secs / 60, secs % 60)
        }
    }
}

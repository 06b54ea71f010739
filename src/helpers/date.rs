//! Date helper functions

use chrono::{DateTime, Locale, TimeZone, Utc};
use chrono_tz::Tz;

/// Formats publication dates for display
///
/// Timestamps are stored in UTC and only turned into text here, at render
/// time, with the site's locale and timezone.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    format: String,
    locale: Locale,
    timezone: Option<Tz>,
}

impl DateFormatter {
    /// `format` is Moment.js-style (`DD MMM YYYY`), `language` a tag such as
    /// `pt-BR`, `timezone` an IANA name or empty for UTC
    pub fn new(format: &str, language: &str, timezone: &str) -> Self {
        let timezone = if timezone.is_empty() {
            None
        } else {
            match timezone.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    tracing::warn!("Unknown timezone {}, using UTC", timezone);
                    None
                }
            }
        };

        Self {
            format: moment_to_chrono_format(format),
            locale: locale_for(language),
            timezone,
        }
    }

    pub fn format(&self, date: &DateTime<Utc>) -> String {
        match self.timezone {
            Some(tz) => format_in(&date.with_timezone(&tz), &self.format, self.locale),
            None => format_in(date, &self.format, self.locale),
        }
    }
}

fn format_in<Tz2: TimeZone>(date: &DateTime<Tz2>, format: &str, locale: Locale) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format_localized(format, locale).to_string()
}

/// Map a language tag to a chrono locale
///
/// `pt-BR` and `pt_BR` map directly; a bare language tries `xx_XX`, and
/// `en` maps to `en_US`. Anything unknown falls back to `en_US`.
pub fn locale_for(language: &str) -> Locale {
    let tag = language.trim().replace('-', "_");
    if let Ok(locale) = Locale::try_from(tag.as_str()) {
        return locale;
    }

    if !tag.contains('_') && !tag.is_empty() {
        let candidate = match tag.as_str() {
            "en" => "en_US".to_string(),
            lang => format!("{}_{}", lang, lang.to_uppercase()),
        };
        if let Ok(locale) = Locale::try_from(candidate.as_str()) {
            return locale;
        }
    }

    Locale::en_US
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    let replacements = [
        // Year (process first as they're uppercase)
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month (uppercase M)
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month (uppercase D) - process before lowercase
        ("DDDD", "%j"),
        ("DD", "%d"),
        // Hour 24h (uppercase H)
        ("HH", "%H"),
        // Hour 12h (lowercase h)
        ("hh", "%I"),
        // Minute (lowercase m after we've processed MM)
        ("mm", "%M"),
        // Second (lowercase s)
        ("ss", "%S"),
        // Day of week (lowercase d) - process last to avoid conflicts
        ("dddd", "%A"),
        ("ddd", "%a"),
        // Timezone
        ("ZZ", "%z"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}

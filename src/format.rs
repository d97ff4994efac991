//! Formatting and validation helpers for report forms and file lists.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime};
use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Widest image kept before upload; wider images are scaled down.
pub const MAX_IMAGE_WIDTH: u32 = 1920;

/// Formats a byte count for display ("0 Bytes", "1.5 KB", "2 MB").
///
/// Values are rounded to two decimals with trailing zeros dropped.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < UNITS.len() && bytes / divisor >= 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let value = format!("{:.2}", bytes as f64 / divisor as f64);
    let value = value.trim_end_matches('0').trim_end_matches('.');
    format!("{value} {}", UNITS[unit])
}

/// Returns the lowercased extension after the last dot, or an empty string
/// when there is none. Leading-dot names such as `.env` have no extension.
#[must_use]
pub fn file_extension(filename: &str) -> String {
    match filename.rfind('.') {
        Some(i) if i > 0 => filename[i + 1..].to_lowercase(),
        _ => String::new(),
    }
}

/// Returns true for common web image extensions.
#[must_use]
pub fn is_image_file(filename: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&file_extension(filename).as_str())
}

/// Returns true for `.pdf` files.
#[must_use]
pub fn is_pdf_file(filename: &str) -> bool {
    file_extension(filename) == "pdf"
}

/// Loose email shape check: something, `@`, something, `.`, something.
#[must_use]
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Returns true if the value has any non-whitespace content.
#[must_use]
pub fn validate_required(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Formats a number with a fixed number of decimals.
#[must_use]
pub fn format_number(num: f64, decimals: usize) -> String {
    format!("{num:.decimals$}")
}

/// Formats an ISO-8601 timestamp as `dd.mm.yyyy, HH:MM`.
///
/// Timestamps with an offset are shown in that offset; naive timestamps are
/// shown as written. Returns `None` for empty or unparseable input.
#[must_use]
pub fn format_date(iso: &str) -> Option<String> {
    const DISPLAY: &str = "%d.%m.%Y, %H:%M";

    let iso = iso.trim();
    if iso.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return Some(dt.format(DISPLAY).to_string());
    }
    NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(iso, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|dt| dt.format(DISPLAY).to_string())
}

/// Escapes text for safe insertion into HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Scales image dimensions down to `max_width`, keeping the aspect ratio.
/// Images already narrow enough are unchanged.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub const fn fit_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (height as u64 * max_width as u64) / width as u64;
    (max_width, scaled as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_file_size_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_048_576), "1 MB");
        assert_eq!(format_file_size(5 * 1_048_576 + 262_144), "5.25 MB");
        assert_eq!(format_file_size(1_073_741_824), "1 GB");
    }

    #[test]
    fn format_file_size_caps_at_gb() {
        assert_eq!(format_file_size(2 * 1024 * 1_073_741_824), "2048 GB");
    }

    #[test]
    fn extensions() {
        assert_eq!(file_extension("Photo.JPG"), "jpg");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(".env"), "");
        assert_eq!(file_extension("trailing."), "");
    }

    #[test]
    fn file_kinds() {
        assert!(is_image_file("site.webp"));
        assert!(is_image_file("IMG_0001.JPEG"));
        assert!(!is_image_file("report.pdf"));
        assert!(is_pdf_file("report.PDF"));
        assert!(!is_pdf_file("pdf"));
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("inspector@proshield.co.il"));
        assert!(!validate_email("no-at-sign.com"));
        assert!(!validate_email("a@b"));
        assert!(!validate_email("spa ce@x.com"));
    }

    #[test]
    fn required_validation() {
        assert!(validate_required(" x "));
        assert!(!validate_required(""));
        assert!(!validate_required(" \t\n"));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(12.3456, 2), "12.35");
        assert_eq!(format_number(2.0, 0), "2");
        assert_eq!(format_number(1.5, 3), "1.500");
    }

    #[test]
    fn date_formatting() {
        assert_eq!(
            format_date("2026-02-03T14:05:09+02:00").as_deref(),
            Some("03.02.2026, 14:05")
        );
        assert_eq!(
            format_date("2026-02-03T14:05:09.123456").as_deref(),
            Some("03.02.2026, 14:05")
        );
        assert_eq!(
            format_date("2026-12-31 23:59:00").as_deref(),
            Some("31.12.2026, 23:59")
        );
        assert_eq!(format_date(""), None);
        assert_eq!(format_date("yesterday"), None);
    }

    #[test]
    fn html_escaping() {
        assert_eq!(
            escape_html(r#"<b>"A&B"</b>'"#),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;&#39;"
        );
        assert_eq!(escape_html("שלום"), "שלום");
    }

    #[test]
    fn image_fitting() {
        assert_eq!(fit_width(3840, 2160, MAX_IMAGE_WIDTH), (1920, 1080));
        assert_eq!(fit_width(1000, 800, MAX_IMAGE_WIDTH), (1000, 800));
        assert_eq!(fit_width(4000, 3001, MAX_IMAGE_WIDTH), (1920, 1440));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn format_file_size_never_panics(bytes in 0u64..u64::MAX) {
                let _ = format_file_size(bytes);
            }

            #[test]
            fn format_file_size_has_no_trailing_zero_decimals(bytes in 1u64..1_000_000_000_000) {
                let formatted = format_file_size(bytes);
                let number = formatted.split(' ').next().unwrap();
                prop_assert!(!number.ends_with('.'));
                prop_assert!(!(number.contains('.') && number.ends_with('0')));
            }

            #[test]
            fn fit_width_respects_max(width in 1u32..20_000, height in 1u32..20_000) {
                let (w, h) = fit_width(width, height, MAX_IMAGE_WIDTH);
                prop_assert_eq!(w, width.min(MAX_IMAGE_WIDTH));
                prop_assert!(h <= height);
            }

            #[test]
            fn escape_html_leaves_no_markup(text in ".*") {
                let escaped = escape_html(&text);
                prop_assert!(!escaped.contains('<'));
                prop_assert!(!escaped.contains('>'));
            }
        }
    }
}

use regex::Regex;

use super::{ExtractionError, JobParser};
use crate::models::Record;

const ENTITIES: [(&str, &str); 6] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
];

/// Pulls fields out of a Greenhouse job board page (body HTML, as copied by
/// the browser extension, followed by an `mf-URL:` line).
pub struct GreenhouseParser {
    title: Regex,
    location: Regex,
    salary_dash: Regex,
    salary_to: Regex,
    source_url: Regex,
    logo_alt: Regex,
    tags: Regex,
}

impl GreenhouseParser {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            title: Regex::new(
                r#"(?s)<[a-zA-Z][a-zA-Z0-9]*[^>]*class="[^"]*job__title[^"]*"[^>]*>.*?<h1[^>]*>(.*?)</h1>"#,
            )?,
            location: Regex::new(
                r#"(?s)<[a-zA-Z][a-zA-Z0-9]*[^>]*class="[^"]*job__location[^"]*"[^>]*>.*?<div[^>]*>(.*?)</div>"#,
            )?,
            // ASCII digit and space classes only.
            salary_dash: Regex::new(
                r"\$([0-9]+(?:,[0-9]{3})*)[\t\n\f\r ]*-[\t\n\f\r ]*\$([0-9]+(?:,[0-9]{3})*)",
            )?,
            salary_to: Regex::new(
                r"\$([0-9]+(?:,[0-9]{3})*)[\t\n\f\r ]+to[\t\n\f\r ]+\$([0-9]+(?:,[0-9]{3})*)",
            )?,
            source_url: Regex::new(r"mf-URL:[\t\n\f\r ]*(.+)")?,
            logo_alt: Regex::new(r#"<img[^>]*alt="([^"]*Logo)""#)?,
            tags: Regex::new(r"<[^>]*>")?,
        })
    }

    fn first_capture(re: &Regex, html: &str) -> Option<String> {
        re.captures(html)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Dash-separated ranges first, then "to" ranges, each as "$X - $Y".
    fn salary_ranges(&self, html: &str) -> Vec<String> {
        [&self.salary_dash, &self.salary_to]
            .into_iter()
            .flat_map(|re| re.captures_iter(html))
            .map(|cap| format!("${} - ${}", &cap[1], &cap[2]))
            .collect()
    }

    /// Strips markup, decodes the handful of entities job boards emit, and
    /// trims. An unterminated `<` is kept as text.
    pub fn clean_html_tags(&self, html: &str) -> String {
        let mut cleaned = self.tags.replace_all(html, "").into_owned();
        for (entity, replacement) in ENTITIES {
            cleaned = cleaned.replace(entity, replacement);
        }
        cleaned.trim().to_string()
    }
}

impl JobParser for GreenhouseParser {
    fn parse(&self, lines: &[&str], record: &mut Record) -> Result<(), ExtractionError> {
        let html = lines.join("\n");

        if let Some(title) = Self::first_capture(&self.title, &html) {
            record.position = self.clean_html_tags(&title);
        }

        if let Some(location) = Self::first_capture(&self.location, &html) {
            record.location = self.clean_html_tags(&location);
        }

        let ranges = self.salary_ranges(&html);
        if !ranges.is_empty() {
            record.salary_range = ranges.join(", ");
        }

        if let Some(url) = Self::first_capture(&self.source_url, &html) {
            record.append_note(&format!("Source URL: {}", url.trim()));
        }

        if let Some(alt) = Self::first_capture(&self.logo_alt, &html) {
            record.company = alt.replacen(" Logo", "", 1).trim().to_string();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSTING: &str = r#"<html><body>
<div class="job__header">
  <div class="job__title">
    <h1>Senior Software Engineer</h1>
    <div class="job__location">
      <div>Remote</div>
    </div>
  </div>
</div>
<div class="logo"><img src="/logo.png" alt="TestCompany Logo"></div>
<p>The base salary range for this role is $120,000 - $180,000.</p>
<p>In New York the range is $150,000 to $200,000 per year.</p>
</body></html>
'mf-URL: https://example.com/job/123 "#;

    fn parse(html: &str) -> Record {
        let lines: Vec<&str> = html.lines().collect();
        let mut record = Record::default();
        GreenhouseParser::new()
            .unwrap()
            .parse(&lines, &mut record)
            .unwrap();
        record
    }

    #[test]
    fn test_parse_greenhouse_posting() {
        let record = parse(POSTING);
        assert_eq!(record.position, "Senior Software Engineer");
        assert_eq!(record.location, "Remote");
        assert_eq!(record.company, "TestCompany");
        assert_eq!(record.salary_range, "$120,000 - $180,000, $150,000 - $200,000");
        assert_eq!(record.notes, "Source URL: https://example.com/job/123");
    }

    #[test]
    fn test_parse_compact_dash_range() {
        let record = parse("Pay: $150,000-$200,000 or $90 - $120 hourly");
        assert_eq!(record.salary_range, "$150,000 - $200,000, $90 - $120");
    }

    #[test]
    fn test_parse_dash_ranges_listed_before_to_ranges() {
        let record = parse("$1 to $2 then $3 - $4");
        assert_eq!(record.salary_range, "$3 - $4, $1 - $2");
    }

    #[test]
    fn test_parse_nested_title_markup() {
        let record = parse(
            r#"<section class="page job__title wide"><span>x</span><h1 class="t">Staff <em>Data</em> Engineer &amp; Lead</h1></section>"#,
        );
        assert_eq!(record.position, "Staff Data Engineer & Lead");
    }

    #[test]
    fn test_parse_source_url_appends_to_existing_notes() {
        let lines = ["mf-URL:   https://boards.greenhouse.io/acme/jobs/1  "];
        let mut record = Record {
            notes: "Referred by Sam".to_string(),
            ..Default::default()
        };
        GreenhouseParser::new()
            .unwrap()
            .parse(&lines, &mut record)
            .unwrap();
        assert_eq!(
            record.notes,
            "Referred by Sam\nSource URL: https://boards.greenhouse.io/acme/jobs/1"
        );
    }

    #[test]
    fn test_parse_company_strips_logo_suffix_once() {
        let record = parse(r#"<img alt="Logo Works Logo" src="a.png">"#);
        assert_eq!(record.company, "Logo Works");

        let record = parse(r#"<img alt="Acme headshot"><img alt="Globex Logo">"#);
        assert_eq!(record.company, "Globex");
    }

    #[test]
    fn test_parse_missing_fields_stay_empty() {
        let record = parse("<p>Nothing useful here</p>");
        assert_eq!(record.position, "");
        assert_eq!(record.location, "");
        assert_eq!(record.company, "");
        assert_eq!(record.salary_range, "");
        assert_eq!(record.notes, "");
    }

    #[test]
    fn test_parse_salary_needs_ascii_digits_and_spaces() {
        let record = parse("Range: $\u{0661}\u{0662}\u{0660} - $\u{0663}\u{0660}\u{0660}");
        assert_eq!(record.salary_range, "");

        let record = parse("Range: $120,000\u{00a0}-\u{00a0}$180,000 or $1\u{00a0}to\u{00a0}$2");
        assert_eq!(record.salary_range, "");

        let record = parse("Range: $120,000\t-\n$180,000");
        assert_eq!(record.salary_range, "$120,000 - $180,000");
    }

    #[test]
    fn test_clean_html_tags() {
        let parser = GreenhouseParser::new().unwrap();
        assert_eq!(
            parser.clean_html_tags("<p>Multiple&nbsp;<strong>tags</strong>&nbsp;here</p>"),
            "Multiple tags here"
        );
        assert_eq!(parser.clean_html_tags("  Tom &amp; Jerry&#39;s  "), "Tom & Jerry's");
        assert_eq!(parser.clean_html_tags("&lt;b&gt; &quot;quoted&quot;"), "<b> \"quoted\"");
        assert_eq!(parser.clean_html_tags("plain text"), "plain text");
    }

    #[test]
    fn test_clean_html_tags_keeps_unterminated_tag() {
        let parser = GreenhouseParser::new().unwrap();
        assert_eq!(parser.clean_html_tags("a <b>bold</b> < 5"), "a bold < 5");
        assert_eq!(parser.clean_html_tags("<br/>x <"), "x <");
    }
}

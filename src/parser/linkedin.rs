use super::{ExtractionError, JobParser};
use crate::models::Record;

const WORKPLACE_MARKER: &str = "Matches your job preferences, workplace type is";
const BOILERPLATE: [&str; 2] = ["Share", "Show more options"];

/// Reads the text LinkedIn's job view produces when copied:
///
/// ```text
/// Company
/// Position
/// City, ST · Remote
/// ...
/// ```
///
/// Positions are counted after blank and boilerplate lines are dropped.
pub struct LinkedInParser;

impl JobParser for LinkedInParser {
    fn parse(&self, lines: &[&str], record: &mut Record) -> Result<(), ExtractionError> {
        let content: Vec<&str> = lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty() && !BOILERPLATE.contains(line))
            .collect();

        for (i, line) in content.iter().enumerate() {
            // Later matches overwrite earlier ones.
            if line.contains('$') {
                record.salary_range = line.to_string();
            }

            if let Some(idx) = line.find(WORKPLACE_MARKER) {
                record.workplace_type = line[idx + WORKPLACE_MARKER.len()..].trim().to_string();
            }

            match i {
                0 => record.company = line.to_string(),
                1 => record.position = line.to_string(),
                2 => record.location = location_before_middot(line),
                _ => {}
            }
        }

        Ok(())
    }
}

fn location_before_middot(line: &str) -> String {
    line.split('·').next().unwrap_or_default().trim().to_string()
}

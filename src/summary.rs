//! Keyword-based reformatting of the model's free-text vehicle description.
//!
//! Extraction is best-effort: the model is asked for a `Label: value` layout
//! but nothing guarantees it complies, so each field is simply the first line
//! mentioning its keyword.

/// Line used when no line of the response mentions a keyword.
pub const NOT_FOUND: &str = "- Info not found";

/// Section headers paired with the keywords extracted under them, in display order.
pub const SECTIONS: &[(&str, &[&str])] = &[
    ("Basic Information", &["Brand", "Model", "Launch Year"]),
    ("Key Features", &["Engine Capacity", "Type", "Top 3 Special Features"]),
    ("Mileage", &["Mileage"]),
    ("Average Price (INR)", &["Average Price"]),
    (
        "Other Details",
        &["Maintenance Costs", "Additional Benefits", "Unique Selling Points"],
    ),
    ("Approximate Resale Value", &["Resale"]),
];

pub const TITLE: &str = "Vehicle Overview";

/// Return the first line containing `keyword` (case-insensitive) as a bullet.
pub fn extract_line(text: &str, keyword: &str) -> String {
    let needle = keyword.to_lowercase();
    text.lines()
        .find(|line| line.to_lowercase().contains(&needle))
        .map(|line| format!("- {}", line.trim()))
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

/// Render the fixed summary template for a raw model response.
pub fn format_vehicle_summary(raw_text: &str) -> String {
    let mut out = format!("### **{}**\n", TITLE);

    for (header, keywords) in SECTIONS {
        out.push_str("\n---\n\n");
        out.push_str(&format!("#### **{}**\n", header));
        for keyword in keywords.iter() {
            out.push_str(&extract_line(raw_text, keyword));
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Brand: Toyota
Model: Corolla Altis
Launch Year: 2008
Key Features:
  Engine Capacity: 1798 cc
  Type: Sedan
  Top 3 Special Features: ABS, dual airbags, touchscreen
Mileage: 14 km/l
Average Price in INR: 16-20 lakh
Other Details: Maintenance Costs are low. Additional Benefits include wide service network.
Unique Selling Points: reliability
Approximate Resale Value: around 4 lakh after 10 years
";

    #[test]
    fn test_extract_line_finds_keyword() {
        assert_eq!(extract_line("Brand: Toyota", "Brand"), "- Brand: Toyota");
        assert_eq!(extract_line(SAMPLE, "Launch Year"), "- Launch Year: 2008");
    }

    #[test]
    fn test_extract_line_is_case_insensitive_and_trims() {
        let text = "intro\n   **BRAND**: Honda   \nbrand: ignored";
        assert_eq!(extract_line(text, "brand"), "- **BRAND**: Honda");
    }

    #[test]
    fn test_extract_line_takes_first_match() {
        let text = "Engine Capacity: 1.5L\nEngine Capacity: 2.0L";
        assert_eq!(extract_line(text, "Engine Capacity"), "- Engine Capacity: 1.5L");
    }

    #[test]
    fn test_extract_line_missing_keyword() {
        assert_eq!(extract_line("nothing relevant here", "Mileage"), NOT_FOUND);
        assert_eq!(extract_line("", "Brand"), NOT_FOUND);
    }

    #[test]
    fn test_summary_contains_all_headers_for_any_input() {
        for input in ["", "garbage\nmore garbage", SAMPLE] {
            let summary = format_vehicle_summary(input);
            assert!(summary.contains(TITLE));
            for (header, _) in SECTIONS {
                assert!(summary.contains(header), "missing {header} for {input:?}");
            }
        }
    }

    #[test]
    fn test_summary_is_deterministic() {
        assert_eq!(format_vehicle_summary(SAMPLE), format_vehicle_summary(SAMPLE));
    }

    #[test]
    fn test_summary_of_empty_response_is_all_placeholders() {
        let summary = format_vehicle_summary("");
        let bullets: Vec<&str> = summary.lines().filter(|l| l.starts_with("- ")).collect();
        assert_eq!(bullets.len(), 12);
        assert!(bullets.iter().all(|b| *b == NOT_FOUND));
    }

    #[test]
    fn test_summary_extracts_fields() {
        let summary = format_vehicle_summary(SAMPLE);
        assert!(summary.contains("- Brand: Toyota"));
        assert!(summary.contains("- Type: Sedan"));
        assert!(summary.contains("- Mileage: 14 km/l"));
        assert!(summary.contains("- Approximate Resale Value: around 4 lakh after 10 years"));
    }
}

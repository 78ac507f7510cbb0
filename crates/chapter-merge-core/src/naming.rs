//! Document naming policy.
//!
//! Decides which document a chapter lands in. With grouping enabled and a
//! parsed chapter number, every sub-chapter of the same integer chapter
//! shares one document named from the group template; otherwise the
//! document is named after the sanitized raw title.

use crate::title::ParsedTitle;

/// Characters replaced when a raw title becomes a file name.
const RESERVED_CHARS: &[char] = &[':', '*', '?', '"', '<', '>', '|', '/', '\\'];

/// Placeholder for the group key inside [`NamingPolicy::group_template`].
pub const GROUP_PLACEHOLDER: &str = "{n}";

/// Explicit naming configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    pub group_template: String,
    pub include_subtitle: bool,
    pub extension: String,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self {
            group_template: "Chapter {n}".to_string(),
            include_subtitle: false,
            extension: "docx".to_string(),
        }
    }
}

/// Where a chapter should be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetName {
    /// File name including extension; the document's identity within a collection.
    pub file_name: String,
    /// Heading rendered at the top of a newly created document.
    pub header: String,
}

impl NamingPolicy {
    /// Resolve the target document name for a chapter title.
    pub fn resolve(&self, raw_title: &str, parsed: &ParsedTitle, grouping: bool) -> TargetName {
        match (grouping, parsed.group_key()) {
            (true, Some(group_key)) => {
                let mut header = self
                    .group_template
                    .replace(GROUP_PLACEHOLDER, &group_key.to_string());
                if self.include_subtitle {
                    if let Some(subtitle) = parsed.subtitle() {
                        header = format!("{} - {}", header, subtitle);
                    }
                }
                TargetName {
                    file_name: format!("{}.{}", sanitize_file_stem(&header), self.extension),
                    header,
                }
            }
            _ => TargetName {
                file_name: format!("{}.{}", sanitize_file_stem(raw_title), self.extension),
                header: raw_title.trim().to_string(),
            },
        }
    }
}

/// Replace reserved filesystem characters with `" -"` and trim.
pub fn sanitize_file_stem(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if RESERVED_CHARS.contains(&c) || c.is_control() {
            out.push_str(" -");
        } else {
            out.push(c);
        }
    }
    let trimmed = out.trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::title::parse_title;

    #[test]
    fn test_grouped_name_uses_template() {
        let policy = NamingPolicy::default();
        let target = policy.resolve("Chapter 3.1", &parse_title("Chapter 3.1"), true);
        assert_eq!(target.file_name, "Chapter 3.docx");
        assert_eq!(target.header, "Chapter 3");
    }

    #[test]
    fn test_grouped_name_with_subtitle() {
        let policy = NamingPolicy {
            include_subtitle: true,
            ..NamingPolicy::default()
        };
        let title = "Chapter 3.1: Arrival";
        let target = policy.resolve(title, &parse_title(title), true);
        assert_eq!(target.header, "Chapter 3 - Arrival");
        assert_eq!(target.file_name, "Chapter 3 - Arrival.docx");
    }

    #[test]
    fn test_ungrouped_uses_sanitized_title() {
        let policy = NamingPolicy::default();
        let title = "Chapter 3: What?";
        let target = policy.resolve(title, &parse_title(title), false);
        assert_eq!(target.file_name, "Chapter 3 - What -.docx");
        assert_eq!(target.header, "Chapter 3: What?");
    }

    #[test]
    fn test_grouping_skipped_for_unparsed_titles() {
        let policy = NamingPolicy::default();
        let target = policy.resolve("Prologue", &parse_title("Prologue"), true);
        assert_eq!(target.file_name, "Prologue.docx");
        assert_eq!(target.header, "Prologue");
    }

    #[test]
    fn test_custom_template_and_extension() {
        let policy = NamingPolicy {
            group_template: "Chương {n}".to_string(),
            include_subtitle: false,
            extension: "doc".to_string(),
        };
        let target = policy.resolve("Chương 12.5", &parse_title("Chương 12.5"), true);
        assert_eq!(target.file_name, "Chương 12.doc");
    }

    #[test]
    fn test_sanitize_empty_title() {
        assert_eq!(sanitize_file_stem("   "), "untitled");
        assert_eq!(sanitize_file_stem("a/b"), "a -b");
    }
}

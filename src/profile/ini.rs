// Minimal INI reader for the AWS config and credentials files
use crate::error::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    properties: HashMap<String, String>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }
}

/// Parsed INI document. Sections keep file order; a repeated header merges
/// into the first occurrence with later keys winning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    sections: Vec<Section>,
}

impl IniFile {
    /// Read and parse `path`. A missing file is an empty document.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("{} does not exist, treating as empty", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        let mut current: Option<usize> = None;
        // Set after `key =` with an empty value; indented lines that follow are
        // nested settings (e.g. `s3 =`) which are not profile keys.
        let mut in_nested_block = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                let name = trimmed[1..trimmed.len() - 1].trim();
                let index = match sections.iter().position(|s| s.name == name) {
                    Some(index) => index,
                    None => {
                        sections.push(Section::new(name));
                        sections.len() - 1
                    }
                };
                current = Some(index);
                in_nested_block = false;
                continue;
            }

            let Some(index) = current else {
                continue;
            };

            let indented = line.starts_with(' ') || line.starts_with('\t');
            if in_nested_block && indented {
                continue;
            }

            if let Some(eq_pos) = trimmed.find('=') {
                let key = trimmed[..eq_pos].trim().to_string();
                let value = trimmed[eq_pos + 1..].trim().to_string();
                in_nested_block = value.is_empty();
                sections[index].properties.insert(key, value);
            }
        }

        Self { sections }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_and_keys() {
        let ini = IniFile::parse(
            "# leading comment\n\
             [default]\n\
             region = us-east-1\n\
             \n\
             [profile dev]\n\
             ; another comment\n\
             sso_start_url=https://example.awsapps.com/start\n\
             role_arn = arn:aws:iam::123456789012:role/Admin\n",
        );

        let names: Vec<_> = ini.sections().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["default", "profile dev"]);

        let dev = ini.section("profile dev").unwrap();
        assert_eq!(
            dev.get("sso_start_url"),
            Some("https://example.awsapps.com/start")
        );
        assert_eq!(
            dev.get("role_arn"),
            Some("arn:aws:iam::123456789012:role/Admin")
        );
        assert_eq!(ini.section("default").unwrap().get("region"), Some("us-east-1"));
    }

    #[test]
    fn test_nested_settings_are_skipped() {
        let ini = IniFile::parse(
            "[profile dev]\n\
             s3 =\n  max_concurrent_requests = 10\n\
             region = eu-west-1\n",
        );
        let dev = ini.section("profile dev").unwrap();
        assert!(dev.contains_key("s3"));
        assert_eq!(dev.get("s3"), None);
        assert!(!dev.contains_key("max_concurrent_requests"));
        assert_eq!(dev.get("region"), Some("eu-west-1"));
    }

    #[test]
    fn test_repeated_section_merges() {
        let ini = IniFile::parse("[a]\nx = 1\n[b]\n[a]\nx = 2\ny = 3\n");
        assert_eq!(ini.sections().count(), 2);
        let a = ini.section("a").unwrap();
        assert_eq!(a.get("x"), Some("2"));
        assert_eq!(a.get("y"), Some("3"));
    }

    #[test]
    fn test_keys_before_any_section_are_ignored() {
        let ini = IniFile::parse("orphan = 1\n[a]\nx = 1\n");
        assert_eq!(ini.sections().count(), 1);
        assert_eq!(ini.section("a").unwrap().get("orphan"), None);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ini = IniFile::load(&dir.path().join("nope")).unwrap();
        assert_eq!(ini.sections().count(), 0);
    }
}

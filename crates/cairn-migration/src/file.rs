//! Migration file format and parsing.
//!
//! A migration is a YAML document with up to four keyed sections:
//!
//! ```yaml
//! # add the shared bucket
//! #
//! # file: 010_add_the_shared_bucket.yaml
//!
//! if: PROJECT == 'prod'
//! do:
//! - gsutil mb gs://$PROJECT-shared
//! undo:
//! - gsutil rb gs://$PROJECT-shared
//! view:
//! - gsutil ls -L -b gs://$PROJECT-shared
//! ```
//!
//! The filename is the ordering key. It is never read from the document body.

use crate::{Error, Result};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// File extensions recognized as migrations.
pub const MIGRATION_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Extension used for newly created migrations.
pub const DEFAULT_EXTENSION: &str = "yaml";

/// Index given to the first migration of an empty directory.
const BASE_INDEX: &str = "010";

/// Gap between consecutive generated indices.
const INDEX_STEP: u64 = 5;

/// Index that follows a legacy timestamp-named migration.
///
/// Chosen so that it still sorts after every `YYYYMMDDtHHMMSS` key.
const LEGACY_SUCCESSOR_INDEX: &str = "300";

/// Command placed in each section of a freshly created migration.
const PLACEHOLDER_COMMAND: &str = "gcloud config list";

const LEGACY_TIMESTAMP_FORMAT: &str = "%Y%m%dt%H%M%S";

static INDEX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{3,})_").expect("valid index pattern"));

static TIMESTAMP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{8}t[0-9]{6}_").expect("valid timestamp pattern"));

/// A parsed migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Migration {
    /// Ordering key, e.g. `010_add_bucket.yaml`.
    pub filename: String,

    /// Free text taken from the header comment. Informational only.
    pub description: String,

    /// Optional `if` expression. Empty means always true.
    pub condition: String,

    /// Commands that apply the change.
    pub do_section: Vec<String>,

    /// Commands that revert the change.
    pub undo_section: Vec<String>,

    /// Read-only commands that describe the change.
    pub view_section: Vec<String>,
}

/// On-disk shape of a migration body.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    condition: Option<String>,

    #[serde(rename = "do", alias = "up", default)]
    do_section: Option<Vec<String>>,

    #[serde(rename = "undo", alias = "down", default)]
    undo_section: Option<Vec<String>>,

    #[serde(rename = "view", default)]
    view_section: Option<Vec<String>>,
}

impl Migration {
    /// Creates an unsaved migration with placeholder sections.
    pub fn draft(description: &str) -> Self {
        let placeholder = vec![PLACEHOLDER_COMMAND.to_string()];
        Self {
            filename: String::new(),
            description: description.to_string(),
            condition: String::new(),
            do_section: placeholder.clone(),
            undo_section: placeholder.clone(),
            view_section: placeholder,
        }
    }

    /// Reads and parses a migration from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::NotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parses migration content. The filename comes from `path`.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Parse {
                path: path.to_path_buf(),
                reason: "Invalid filename".to_string(),
            })?
            .to_string();

        let document: Document = if has_content(content) {
            serde_yaml::from_str(content).map_err(|e| Error::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            Document::default()
        };

        Ok(Self {
            filename,
            description: header_description(content).unwrap_or_default(),
            condition: document.condition.unwrap_or_default().trim().to_string(),
            do_section: document.do_section.unwrap_or_default(),
            undo_section: document.undo_section.unwrap_or_default(),
            view_section: document.view_section.unwrap_or_default(),
        })
    }

    /// Renders the migration as an editable YAML document.
    pub fn to_yaml(&self) -> Result<String> {
        let document = Document {
            condition: Some(self.condition.clone()).filter(|c| !c.is_empty()),
            do_section: Some(self.do_section.clone()),
            undo_section: Some(self.undo_section.clone()),
            view_section: Some(self.view_section.clone()),
        };

        let mut out = String::new();
        out.push_str(&format!("# {}\n#\n# file: {}\n\n", self.description, self.filename));
        out.push_str(&serde_yaml::to_string(&document)?);
        Ok(out)
    }

    /// Assigns the next filename in `migrations_dir` and writes the file.
    ///
    /// Never overwrites an existing file.
    pub fn create(mut self, migrations_dir: &Path) -> Result<(PathBuf, Self)> {
        fs::create_dir_all(migrations_dir)?;

        let existing = crate::loader::list_names(migrations_dir)?;
        self.filename = next_filename(&self.description, &existing)?;

        let path = migrations_dir.join(&self.filename);
        let content = self.to_yaml()?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(content.as_bytes())?;

        Ok((path, self))
    }
}

/// Generates the filename for a new migration.
///
/// - no existing files: `010_<desc>.yaml`
/// - latest key is an index: that index plus 5, keeping its zero padding
/// - latest key is a legacy timestamp: `300_<desc>.yaml`
/// - anything else: `010_<desc>.yaml`
///
/// Fails when the incremented index outgrows its padding, since `1000_` sorts
/// before `995_`.
pub fn next_filename(description: &str, existing: &[String]) -> Result<String> {
    let slug = description.trim().to_lowercase().replace(' ', "_");
    if slug.is_empty()
        || slug.starts_with('.')
        || slug.contains(['/', '\\'])
        || slug.contains(char::is_control)
    {
        return Err(Error::InvalidName(description.to_string()));
    }

    let index = match existing.iter().max() {
        None => BASE_INDEX.to_string(),
        Some(latest) => {
            if let Some(caps) = INDEX_PATTERN.captures(latest) {
                let digits = &caps[1];
                match digits.parse::<u64>() {
                    Ok(n) => {
                        let next = format!("{:0width$}", n + INDEX_STEP, width = digits.len());
                        if next.len() > digits.len() {
                            return Err(Error::IndexExhausted(latest.clone()));
                        }
                        next
                    }
                    Err(_) => BASE_INDEX.to_string(),
                }
            } else if TIMESTAMP_PATTERN.is_match(latest) {
                LEGACY_SUCCESSOR_INDEX.to_string()
            } else {
                BASE_INDEX.to_string()
            }
        }
    };

    Ok(format!("{index}_{slug}.{DEFAULT_EXTENSION}"))
}

/// Returns true if `name` carries a recognized migration extension.
pub fn is_migration_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MIGRATION_EXTENSIONS.contains(&e))
}

/// Human-readable form of a migration filename.
///
/// `20180227t140600_permit_deploy.yaml` becomes `2018-02-27 14:06:00 permit deploy`,
/// `010_add_bucket.yaml` becomes `010 add bucket`.
pub fn pretty(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let spaced = stem.replace('_', " ");

    if spaced.len() < 16 || !spaced.is_char_boundary(15) || !spaced.is_char_boundary(16) {
        return spaced;
    }

    match NaiveDateTime::parse_from_str(&stem[..15], LEGACY_TIMESTAMP_FORMAT) {
        Ok(at) => format!("{} {}", at.format("%Y-%m-%d %H:%M:%S"), &spaced[16..]),
        Err(_) => spaced,
    }
}

/// True when the document has anything besides blank lines and comments.
fn has_content(content: &str) -> bool {
    content.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#') && trimmed != "---"
    })
}

/// Extracts the description from the first header comment, if any.
fn header_description(content: &str) -> Option<String> {
    let first = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    let text = first.strip_prefix('#')?.trim();
    if text.is_empty() || text.starts_with("file:") {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;
    use test_case::test_case;

    fn parse_str(content: &str) -> Migration {
        Migration::parse(content, Path::new("/tmp/010_one.yaml")).unwrap()
    }

    #[test]
    fn test_parse_all_sections() {
        let m = parse_str(
            r#"# create the bucket
#
# file: 010_one.yaml

if: PROJECT == 'prod'
do:
- gsutil mb gs://$PROJECT-b
# comment for undo
undo:
- gsutil rb gs://$PROJECT-b
view:
- gsutil ls
"#,
        );

        assert_eq!(m.filename, "010_one.yaml");
        assert_eq!(m.description, "create the bucket");
        assert_eq!(m.condition, "PROJECT == 'prod'");
        assert_eq!(m.do_section, vec!["gsutil mb gs://$PROJECT-b"]);
        assert_eq!(m.undo_section, vec!["gsutil rb gs://$PROJECT-b"]);
        assert_eq!(m.view_section, vec!["gsutil ls"]);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let m = parse_str("do:\n- going up\n");

        assert_eq!(m.do_section, vec!["going up"]);
        assert!(m.undo_section.is_empty());
        assert!(m.view_section.is_empty());
        assert!(m.condition.is_empty());
    }

    #[test]
    fn test_null_section_is_empty() {
        let m = parse_str("do:\nundo:\n- going down\n");

        assert!(m.do_section.is_empty());
        assert_eq!(m.undo_section, vec!["going down"]);
    }

    #[test]
    fn test_comment_only_document_is_empty_migration() {
        let m = parse_str("# nothing here yet\n\n");

        assert_eq!(m.description, "nothing here yet");
        assert!(m.do_section.is_empty());
    }

    #[test]
    fn test_legacy_up_down_keys() {
        let m = parse_str("up:\n- going up\ndown:\n- going down\n");

        assert_eq!(m.do_section, vec!["going up"]);
        assert_eq!(m.undo_section, vec!["going down"]);
    }

    #[test]
    fn test_malformed_document_names_file() {
        let err = Migration::parse("do: [unclosed", Path::new("dir/020_bad.yaml")).unwrap_err();

        match err {
            Error::Parse { path, .. } => assert_eq!(path, PathBuf::from("dir/020_bad.yaml")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_sections() {
        let original = Migration {
            filename: "015_tricky.yaml".to_string(),
            description: "tricky quoting".to_string(),
            condition: "REGION in ['europe-west1', 'us-east1']".to_string(),
            do_section: vec![
                "export NAME=\"x: y\"".to_string(),
                "echo '#not a comment' && echo $NAME".to_string(),
            ],
            undo_section: vec!["- leading dash".to_string()],
            view_section: vec!["true".to_string(), "123".to_string()],
        };

        let yaml = original.to_yaml().unwrap();
        let parsed = Migration::parse(&yaml, Path::new("015_tricky.yaml")).unwrap();

        assert_eq!(parsed, original);
    }

    fn section() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec("[ -~]{0,40}", 1..5)
    }

    proptest! {
        #[test]
        fn prop_sections_survive_round_trip(
            do_section in section(),
            undo_section in section(),
            view_section in section(),
        ) {
            let original = Migration {
                filename: "020_generated.yaml".to_string(),
                description: "generated".to_string(),
                condition: String::new(),
                do_section,
                undo_section,
                view_section,
            };

            let yaml = original.to_yaml().unwrap();
            let parsed = Migration::parse(&yaml, Path::new("020_generated.yaml")).unwrap();

            prop_assert_eq!(parsed.do_section, original.do_section);
            prop_assert_eq!(parsed.undo_section, original.undo_section);
            prop_assert_eq!(parsed.view_section, original.view_section);
        }
    }

    #[test]
    fn test_condition_omitted_when_empty() {
        let yaml = Migration::draft("plain").to_yaml().unwrap();

        assert!(!yaml.contains("if:"));
        assert!(yaml.starts_with("# plain\n"));
        assert!(yaml.contains("do:\n- gcloud config list\n"));
    }

    #[test_case(&[], "010_first_migration.yaml" ; "empty directory")]
    #[test_case(&["300_x.yaml"], "305_first_migration.yaml" ; "index step")]
    #[test_case(&["005_x.yaml"], "010_first_migration.yaml" ; "zero padding kept")]
    #[test_case(&["0095_x.yaml"], "0100_first_migration.yaml" ; "wider padding kept")]
    #[test_case(&["20180227t140600_x.yaml"], "300_first_migration.yaml" ; "legacy timestamp")]
    #[test_case(&["010_a.yaml", "20180227t140600_x.yaml"], "300_first_migration.yaml" ; "latest wins")]
    #[test_case(&["readme.yaml"], "010_first_migration.yaml" ; "unrecognized key")]
    fn test_next_filename(existing: &[&str], expected: &str) {
        let existing: Vec<String> = existing.iter().map(ToString::to_string).collect();
        assert_eq!(next_filename("First Migration", &existing).unwrap(), expected);
    }

    #[test]
    fn test_next_filename_rejects_paths() {
        assert!(matches!(
            next_filename("../escape", &[]),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(next_filename("   ", &[]), Err(Error::InvalidName(_))));
    }

    #[test_case("two\nlines" ; "newline")]
    #[test_case("tab\there" ; "tab")]
    #[test_case("bell\u{7}" ; "bell")]
    fn test_next_filename_rejects_control_characters(title: &str) {
        assert!(matches!(
            next_filename(title, &[]),
            Err(Error::InvalidName(_))
        ));
    }

    #[test_case(&["995_last.yaml"] ; "three digits")]
    #[test_case(&["010_a.yaml", "9999_last.yaml"] ; "four digits")]
    fn test_next_filename_refuses_index_that_sorts_first(existing: &[&str]) {
        let existing: Vec<String> = existing.iter().map(ToString::to_string).collect();

        match next_filename("after", &existing) {
            Err(Error::IndexExhausted(latest)) => assert_eq!(Some(&latest), existing.iter().max()),
            other => panic!("expected exhausted index, got {other:?}"),
        }
    }

    #[test]
    fn test_next_filename_sorts_after_latest() {
        for latest in ["990_x.yaml", "0995_x.yaml", "005_x.yaml"] {
            let next = next_filename("after", &[latest.to_string()]).unwrap();
            assert!(next.as_str() > latest, "{next} sorts before {latest}");
        }
    }

    #[test]
    fn test_create_with_multiline_title_writes_nothing() {
        let temp = TempDir::new().unwrap();

        let result = Migration::draft("first\nsecond").create(temp.path());

        assert!(matches!(result, Err(Error::InvalidName(_))));
        assert!(crate::loader::list_names(temp.path()).unwrap().is_empty());
    }

    #[test_case("20180227t140600_permit_deploy.yaml", "2018-02-27 14:06:00 permit deploy")]
    #[test_case("010_add_bucket.yaml", "010 add bucket")]
    #[test_case("short.yaml", "short")]
    #[test_case("20189999t999999_not_a_date.yaml", "20189999t999999 not a date")]
    fn test_pretty(filename: &str, expected: &str) {
        assert_eq!(pretty(filename), expected);
    }

    #[test]
    fn test_is_migration_file() {
        assert!(is_migration_file("010_one.yaml"));
        assert!(is_migration_file("010_one.yml"));
        assert!(!is_migration_file("010_one.json"));
        assert!(!is_migration_file("README"));
    }

    #[test]
    fn test_create_writes_next_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("010_one.yaml"), "do: []\n").unwrap();

        let (path, created) = Migration::draft("Add Network").create(temp.path()).unwrap();

        assert_eq!(created.filename, "015_add_network.yaml");
        assert!(path.exists());

        let loaded = Migration::load(&path).unwrap();
        assert_eq!(loaded.description, "Add Network");
        assert_eq!(loaded.do_section, vec![PLACEHOLDER_COMMAND]);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Migration::load(temp.path().join("999_nope.yaml"));

        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}

//! Offline dataset tree builder
//!
//! Writes OpenStates-style YAML under `data/{state}/...` in a temp dir.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct DatasetBuilder {
    dir: TempDir,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Dataset root to hand to the offline adapter
    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    fn write(&self, state: &str, collection: &str, file: &str, yaml: &str) -> PathBuf {
        let dir = self.dir.path().join("data").join(state).join(collection);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        fs::write(&path, yaml).unwrap();
        path
    }

    /// Raw person file under `legislature/`
    pub fn person_yaml(&self, state: &str, file: &str, yaml: &str) -> PathBuf {
        self.write(state, "legislature", file, yaml)
    }

    /// Raw committee file under `committees/`
    pub fn committee_yaml(&self, state: &str, file: &str, yaml: &str) -> PathBuf {
        self.write(state, "committees", file, yaml)
    }

    /// Legislator with one role, a capitol office, and a twitter handle
    pub fn legislator(
        &self,
        state: &str,
        id: &str,
        name: &str,
        district: &str,
        start: &str,
        end: &str,
    ) -> PathBuf {
        let yaml = format!(
            r#"id: {id}
name: {name}
email: {slug}@senate.example.gov
image: https://example.gov/photos/{slug}.jpg
party:
  - name: Democratic
roles:
  - type: upper
    district: "{district}"
    start_date: {start}
    end_date: {end}
contact_details:
  - note: Capitol Office
    voice: 916-555-0100
    address: 1021 O Street, Sacramento, CA 95814
links:
  - url: https://example.gov/{slug}
ids:
  twitter: {slug}
"#,
            slug = name.to_lowercase().replace(' ', ""),
        );
        self.person_yaml(state, &format!("{}.yml", name.replace(' ', "-")), &yaml)
    }
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}


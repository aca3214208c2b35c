use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::KiraError;

const NAME_ATTRIBUTE: &str = "STANDARD_NAME";

/// Attributes of every `GENESET` element in an MSigDB XML catalog, keyed
/// by `STANDARD_NAME`.
#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl MetadataCatalog {
    pub fn from_path(path: &Path) -> Result<Self, KiraError> {
        let content = fs::read_to_string(path)
            .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
        Self::parse(&content).map_err(|message| KiraError::CatalogParse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let element_re = Regex::new(r"<GENESET\b((?:[^>\x22']|\x22[^\x22]*\x22|'[^']*')*?)/?>")
            .map_err(|err| err.to_string())?;
        let attr_re = Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .map_err(|err| err.to_string())?;

        let mut entries = BTreeMap::new();
        for (position, element) in element_re.captures_iter(content).enumerate() {
            let body = element.get(1).map(|m| m.as_str()).unwrap_or_default();
            let attributes = attr_re
                .captures_iter(body)
                .filter_map(|cap| {
                    let key = cap.get(1)?.as_str().to_string();
                    let value = cap.get(2).or_else(|| cap.get(3))?.as_str();
                    Some((key, unescape(value)))
                })
                .collect::<BTreeMap<_, _>>();
            let name = attributes
                .get(NAME_ATTRIBUTE)
                .cloned()
                .ok_or_else(|| {
                    format!("GENESET element #{} has no {NAME_ATTRIBUTE}", position + 1)
                })?;
            entries.insert(name, attributes);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `msigdb_v<version>.xml` in `root`, then in its parent.
pub fn find_catalog(root: &Path, version: &str) -> Option<PathBuf> {
    let file_name = format!("msigdb_v{version}.xml");
    [Some(root), root.parent()]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.exists())
}

fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => out.push(ch),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Unit,
    domain::{Echelon, Uic, UicError},
};

/// Returns the canonical path of a unit's file under the given root.
///
/// Units are stored flat, one markdown file per unit, named by UIC.
#[must_use]
pub fn unit_path(root: &Path, uic: &Uic) -> PathBuf {
    root.join(format!("{uic}.md"))
}

/// A unit serialized in markdown format with YAML frontmatter.
///
/// The frontmatter carries the structured fields (echelon, parent pointer,
/// creation time, `as_of` stamp); the heading carries the UIC and display
/// name; the body is free-form notes. The closure caches are never written to
/// disk, they are derived from the parent pointers on load.
#[derive(Debug, Clone)]
pub struct UnitFile {
    frontmatter: FrontMatter,
    uic: Uic,
    name: String,
    notes: String,
}

impl UnitFile {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let frontmatter = serde_yaml::to_string(&self.frontmatter)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let heading = format!("# {} {}", self.uic, self.name);

        let result = if self.notes.is_empty() {
            format!("---\n{frontmatter}---\n{heading}\n")
        } else {
            format!("---\n{frontmatter}---\n{heading}\n\n{}\n", self.notes)
        };

        writer.write_all(result.as_bytes())
    }

    pub(crate) fn read<R: BufRead>(reader: &mut R) -> Result<Self, LoadError> {
        let mut lines = reader.lines();

        let first_line = lines
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "Empty input"))?
            .map_err(LoadError::from)?;

        if first_line.trim() != "---" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Expected frontmatter starting with '---'",
            )
            .into());
        }

        // Collect lines until next '---'
        let frontmatter = lines
            .by_ref()
            .map_while(|line| match line {
                Ok(content) if content.trim() == "---" => None,
                Ok(content) => Some(Ok(content)),
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>, _>>()?
            .join("\n");

        // The rest of the lines are markdown content
        let content = lines.collect::<Result<Vec<_>, _>>()?.join("\n");

        let front: FrontMatter = serde_yaml::from_str(&frontmatter)?;

        let (uic, name, notes) = parse_content(&content)?;

        Ok(Self {
            frontmatter: front,
            uic,
            name,
            notes,
        })
    }

    /// Writes the unit to its canonical path under `root`.
    ///
    /// The write is atomic: content goes to a temporary file in the same
    /// directory which is then renamed over the target, so a crash mid-write
    /// never leaves a truncated unit file behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, written, or renamed.
    pub fn save(&self, root: &Path) -> io::Result<()> {
        std::fs::create_dir_all(root)?;

        let mut tmp = tempfile::NamedTempFile::new_in(root)?;
        self.write(&mut tmp)?;
        tmp.persist(unit_path(root, &self.uic))
            .map_err(|e| e.error)?;
        Ok(())
    }

    /// Reads a unit from its canonical path under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(root: &Path, uic: &Uic) -> Result<Self, LoadError> {
        Self::load_from_path(&unit_path(root, uic))
    }

    /// Reads a unit from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;

        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }

    /// The UIC encoded in the file's heading.
    #[must_use]
    pub const fn uic(&self) -> &Uic {
        &self.uic
    }
}

/// Parses markdown content into UIC, name, and notes.
///
/// The UIC must be the first token in the first heading (after the `#`
/// markers), followed by the unit's display name. The notes are everything
/// after the first heading.
fn parse_content(content: &str) -> Result<(Uic, String, String), LoadError> {
    let (heading_line_idx, line) = content
        .lines()
        .enumerate()
        .find(|(_, line)| line.trim().starts_with('#'))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "No heading found in content - UIC must be in the first heading",
            )
        })?;

    let trimmed = line.trim();
    let after_hashes = trimmed.trim_start_matches('#').trim();

    let first_token = after_hashes
        .split_whitespace()
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "No UIC found in heading"))?;

    let uic = first_token.parse::<Uic>().map_err(LoadError::from)?;

    let name = after_hashes
        .strip_prefix(first_token)
        .unwrap_or("")
        .trim()
        .to_string();

    let notes = content
        .lines()
        .skip(heading_line_idx + 1)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    Ok((uic, name, notes))
}

/// Errors that can occur when loading a unit from markdown.
#[derive(Debug, thiserror::Error)]
#[error("failed to read from markdown")]
pub enum LoadError {
    /// The unit file was not found.
    NotFound,
    /// An I/O error occurred.
    Io(#[from] io::Error),
    /// The YAML frontmatter could not be parsed.
    Yaml(#[from] serde_yaml::Error),
    /// The UIC could not be parsed.
    Uic(#[from] UicError),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "FrontMatterVersion")]
#[serde(into = "FrontMatterVersion")]
struct FrontMatter {
    echelon: Echelon,
    parent: Option<Uic>,
    created: DateTime<Utc>,
    as_of: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum FrontMatterVersion {
    #[serde(rename = "1")]
    V1 {
        echelon: Echelon,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<Uic>,
        created: DateTime<Utc>,
        #[serde(default)]
        as_of: u64,
    },
}

impl From<FrontMatterVersion> for FrontMatter {
    fn from(version: FrontMatterVersion) -> Self {
        match version {
            FrontMatterVersion::V1 {
                echelon,
                parent,
                created,
                as_of,
            } => Self {
                echelon,
                parent,
                created,
                as_of,
            },
        }
    }
}

impl From<FrontMatter> for FrontMatterVersion {
    fn from(front_matter: FrontMatter) -> Self {
        let FrontMatter {
            echelon,
            parent,
            created,
            as_of,
        } = front_matter;
        Self::V1 {
            echelon,
            parent,
            created,
            as_of,
        }
    }
}

impl From<Unit> for UnitFile {
    fn from(unit: Unit) -> Self {
        let frontmatter = FrontMatter {
            echelon: unit.echelon(),
            parent: unit.parent().cloned(),
            created: unit.created(),
            as_of: unit.as_of(),
        };

        Self {
            uic: unit.uic().clone(),
            name: unit.name().to_string(),
            notes: unit.notes().to_string(),
            frontmatter,
        }
    }
}

impl From<&Unit> for UnitFile {
    fn from(unit: &Unit) -> Self {
        unit.clone().into()
    }
}

impl From<UnitFile> for Unit {
    fn from(file: UnitFile) -> Self {
        let UnitFile {
            frontmatter:
                FrontMatter {
                    echelon,
                    parent,
                    created,
                    as_of,
                },
            uic,
            name,
            notes,
        } = file;

        Self::from_parts(uic, name, echelon, parent, notes, created, as_of)
    }
}

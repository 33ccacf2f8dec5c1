//! Input corpus: CSV records loaded once before any virtual user starts.

use rand::Rng;
use std::fs::File;
use std::path::Path;

use crate::error::DriverError;
use crate::selection::{pick_index, strip_non_ascii};

/// Immutable, non-empty collection of candidate payloads.
#[derive(Debug, Clone)]
pub struct Corpus {
    lines: Vec<String>,
}

impl Corpus {
    /// Parse `path` as comma-delimited CSV, treating the first record as a
    /// header when `skip_header` is set.
    ///
    /// Each record becomes one entry with its fields joined by `,`. Quoted
    /// fields lose their quotes and `""` escapes, and may span lines. Entries
    /// that are blank once non-ASCII characters are removed are dropped, so
    /// every entry yields a non-empty payload.
    pub fn load(path: impl AsRef<Path>, skip_header: bool) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|source| DriverError::Corpus {
            path: origin.clone(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(skip_header)
            .flexible(true)
            .from_reader(file);
        let records = reader
            .records()
            .map(|record| record.map(|fields| fields.iter().collect::<Vec<_>>().join(",")))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| DriverError::CorpusFormat {
                path: origin.clone(),
                source,
            })?;
        Self::collect(records, origin)
    }

    pub fn from_lines<I, S>(lines: I) -> Result<Self, DriverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::collect(lines, "<inline>".to_string())
    }

    fn collect<I, S>(lines: I, origin: String) -> Result<Self, DriverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<String> = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .filter(|line| !strip_non_ascii(line).trim().is_empty())
            .collect();
        if lines.is_empty() {
            return Err(DriverError::EmptyCorpus(origin));
        }
        Ok(Self { lines })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false: construction rejects empty corpora.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Uniformly random entry.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let idx = pick_index(self.lines.len(), rng).unwrap_or_default();
        &self.lines[idx]
    }
}

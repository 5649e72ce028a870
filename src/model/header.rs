use crate::error::ShapeError;
use crate::pipeline::PipelineConfig;
use serde::Serialize;
use std::collections::HashMap;

/// How the cells of a column are interpreted.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// The single column holding each row's date.
    Date,
    /// Annotations such as `Notes`, passed through unparsed.
    FreeText,
    /// Dollar formatted amounts.
    Currency,
}

serde_plain::derive_display_from_serialize!(ColumnKind);

/// The column names of the balance sheet, in sheet order, along with the kind of each column.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Header {
    names: Vec<String>,
    kinds: Vec<ColumnKind>,
    index: HashMap<String, usize>,
    date_index: usize,
    total_index: usize,
}

impl Header {
    /// Create a `Header` from the header row. Names are trimmed.
    ///
    /// # Errors
    /// `ShapeError::MalformedHeader` when a name is blank or duplicated, when the date or total
    /// column is missing, or when the total column is configured as free text.
    pub fn new<S, I>(names: I, config: &PipelineConfig) -> Result<Self, ShapeError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .collect();

        if names.is_empty() {
            return Err(ShapeError::MalformedHeader(String::from(
                "The header row has no columns",
            )));
        }

        let mut index = HashMap::with_capacity(names.len());
        for (ix, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(ShapeError::MalformedHeader(format!(
                    "Column {} has no name",
                    ix + 1
                )));
            }
            if index.insert(name.clone(), ix).is_some() {
                return Err(ShapeError::MalformedHeader(format!(
                    "Encountered a duplicate header '{name}'"
                )));
            }
        }

        let date_index = *index.get(config.date_column()).ok_or_else(|| {
            ShapeError::MalformedHeader(format!(
                "The date column '{}' is missing",
                config.date_column()
            ))
        })?;

        let total_index = *index.get(config.total_column()).ok_or_else(|| {
            ShapeError::MalformedHeader(format!(
                "The total column '{}' is missing",
                config.total_column()
            ))
        })?;

        if total_index == date_index || config.is_free_text(config.total_column()) {
            return Err(ShapeError::MalformedHeader(format!(
                "The total column '{}' must hold currency amounts",
                config.total_column()
            )));
        }

        let kinds = names
            .iter()
            .enumerate()
            .map(|(ix, name)| {
                if ix == date_index {
                    ColumnKind::Date
                } else if config.is_free_text(name) {
                    ColumnKind::FreeText
                } else {
                    ColumnKind::Currency
                }
            })
            .collect();

        Ok(Self {
            names,
            kinds,
            index,
            date_index,
            total_index,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn kind(&self, ix: usize) -> Option<ColumnKind> {
        self.kinds.get(ix).copied()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn date_index(&self) -> usize {
        self.date_index
    }

    pub fn date_column(&self) -> &str {
        &self.names[self.date_index]
    }

    pub fn total_column(&self) -> &str {
        &self.names[self.total_index]
    }

    /// Iterates `(index, name, kind)` in sheet order.
    pub fn columns(&self) -> impl Iterator<Item = (usize, &str, ColumnKind)> {
        self.names
            .iter()
            .zip(self.kinds.iter())
            .enumerate()
            .map(|(ix, (name, kind))| (ix, name.as_str(), *kind))
    }

    /// Currency column names in sheet order.
    pub fn currency_columns(&self) -> impl Iterator<Item = &str> {
        self.columns_of(ColumnKind::Currency)
    }

    /// Free-text column names in sheet order.
    pub fn free_text_columns(&self) -> impl Iterator<Item = &str> {
        self.columns_of(ColumnKind::FreeText)
    }

    fn columns_of(&self, kind: ColumnKind) -> impl Iterator<Item = &str> {
        self.columns()
            .filter(move |(_, _, k)| *k == kind)
            .map(|(_, name, _)| name)
    }
}

/// Splits the raw grid into its header and its candidate data rows.
///
/// Row 0 holds column group labels and is discarded. Row 1 is the header. At least one data row
/// must follow.
pub(crate) fn extract<'a, R, S>(
    grid: &'a [R],
    config: &PipelineConfig,
) -> Result<(Header, &'a [R]), ShapeError>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    if grid.len() < 3 {
        return Err(ShapeError::EmptyInput { rows: grid.len() });
    }
    let header = Header::new(grid[1].as_ref().iter(), config)?;
    Ok((header, &grid[2..]))
}

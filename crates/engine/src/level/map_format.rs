use std::fmt;
use std::io::{self, BufRead};

use thiserror::Error;

use super::{TileId, TileRegistry};

/// Upper bound on `num_cols * num_rows`.
pub const MAX_MAP_CELLS: usize = 1 << 24;
/// Upper bound on either dimension.
pub const MAX_MAP_DIMENSION: usize = 1 << 15;

#[derive(Debug, Error)]
pub enum MapFormatError {
    #[error("line {line} is missing ({what})")]
    MissingLine { line: usize, what: &'static str },
    #[error("line {line} must hold a non-negative integer, found '{text}'")]
    InvalidHeader { line: usize, text: String },
    #[error("token '{token}' at row {row}, col {col} is not a non-negative integer")]
    InvalidToken {
        row: usize,
        col: usize,
        token: String,
    },
    #[error("row {row} has {found} tokens, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("tile id {id} at row {row}, col {col} is not registered")]
    UnknownTile { row: usize, col: usize, id: u32 },
    #[error("map of {cols}x{rows} cells exceeds the supported size")]
    TooLarge { cols: usize, rows: usize },
    #[error("failed to read line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Decoded map: dimensions plus row-major ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapData {
    pub num_cols: usize,
    pub num_rows: usize,
    pub ids: Vec<TileId>,
}

/// The last token read successfully, with its row and column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastToken {
    pub token: Option<String>,
    pub row: usize,
    pub col: usize,
}

impl fmt::Display for LastToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = self.token.as_deref().unwrap_or("null");
        write!(f, "{token}-{}:{}", self.row, self.col)
    }
}

/// Strict reader for the line-based map format. Keeps track of the last
/// token it accepted so callers can point at where reading stopped.
pub struct MapParser<'r> {
    registry: &'r TileRegistry,
    last_token: LastToken,
}

impl<'r> MapParser<'r> {
    pub fn new(registry: &'r TileRegistry) -> Self {
        Self {
            registry,
            last_token: LastToken::default(),
        }
    }

    pub fn last_token(&self) -> &LastToken {
        &self.last_token
    }

    pub fn parse(&mut self, reader: impl BufRead) -> Result<MapData, MapFormatError> {
        let mut lines = reader.lines();
        let mut line_number = 0usize;
        let mut next_line = |what: &'static str| -> Result<String, MapFormatError> {
            line_number += 1;
            let line = line_number;
            match lines.next() {
                Some(Ok(text)) => Ok(strip_carriage_return(text)),
                Some(Err(source)) => Err(MapFormatError::Io { line, source }),
                None => Err(MapFormatError::MissingLine { line, what }),
            }
        };

        let num_cols = parse_header(&next_line("column count")?, 1)?;
        let num_rows = parse_header(&next_line("row count")?, 2)?;
        if num_cols > MAX_MAP_DIMENSION
            || num_rows > MAX_MAP_DIMENSION
            || num_cols.saturating_mul(num_rows) > MAX_MAP_CELLS
        {
            return Err(MapFormatError::TooLarge {
                cols: num_cols,
                rows: num_rows,
            });
        }

        let mut ids = Vec::with_capacity(num_cols * num_rows);
        for row in 0..num_rows {
            let line = next_line("tile row")?;
            let tokens = split_row(&line);
            if tokens.len() != num_cols {
                return Err(MapFormatError::RowLength {
                    row,
                    expected: num_cols,
                    found: tokens.len(),
                });
            }
            for (col, token) in tokens.into_iter().enumerate() {
                ids.push(self.read_id(token, row, col)?);
                self.last_token = LastToken {
                    token: Some(token.to_string()),
                    row,
                    col,
                };
            }
        }

        Ok(MapData {
            num_cols,
            num_rows,
            ids,
        })
    }

    fn read_id(&self, token: &str, row: usize, col: usize) -> Result<TileId, MapFormatError> {
        let raw = parse_decimal(token).ok_or_else(|| MapFormatError::InvalidToken {
            row,
            col,
            token: token.to_string(),
        })?;
        let id = u16::try_from(raw)
            .ok()
            .map(TileId)
            .filter(|id| self.registry.contains(*id))
            .ok_or(MapFormatError::UnknownTile { row, col, id: raw })?;
        Ok(id)
    }
}

/// Reads a whole map, see [`MapParser`].
pub fn parse_map(reader: impl BufRead, registry: &TileRegistry) -> Result<MapData, MapFormatError> {
    MapParser::new(registry).parse(reader)
}

fn strip_carriage_return(mut line: String) -> String {
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

fn parse_header(text: &str, line: usize) -> Result<usize, MapFormatError> {
    parse_decimal(text)
        .map(|value| value as usize)
        .ok_or_else(|| MapFormatError::InvalidHeader {
            line,
            text: text.to_string(),
        })
}

fn parse_decimal(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Splits on single spaces. Empty tokens from trailing spaces are dropped;
/// empty tokens anywhere else are kept so they fail as invalid.
fn split_row(line: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = line.split(' ').collect();
    while tokens.last().is_some_and(|token| token.is_empty()) {
        tokens.pop();
    }
    tokens
}

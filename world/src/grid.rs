//! Dense tile storage plus the text format used to load and save maps.

use std::fmt::{self, Write as _};

use bandits_core::{BattleConfig, CellCoord, Faction, Health, Tile, TileView};
use thiserror::Error;

/// Separator placed between a map row and its health annotations.
const ANNOTATION_GAP: &str = "   ";

/// Errors raised while turning map text into a [`TileGrid`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input contained no map rows.
    #[error("map input is empty")]
    EmptyMap,
    /// A character other than `#`, `.`, `E` or `G` appeared in a row.
    #[error("invalid tile character {glyph:?} at line {line}, column {column}")]
    InvalidTileChar {
        /// Offending character.
        glyph: char,
        /// One-based line number.
        line: usize,
        /// Zero-based column within the row.
        column: usize,
    },
    /// A row's width differs from the first row.
    #[error("line {line} has {found} tiles but the map is {expected} tiles wide")]
    RaggedRow {
        /// One-based line number.
        line: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A health annotation could not be read.
    #[error("unreadable health annotation {text:?} on line {line}")]
    InvalidAnnotation {
        /// One-based line number.
        line: usize,
        /// Offending annotation text.
        text: String,
    },
    /// The annotations do not describe the units present in the row.
    #[error("line {line} holds units {expected:?} but is annotated with {found:?}")]
    AnnotationMismatch {
        /// One-based line number.
        line: usize,
        /// Unit glyphs found in the row, in column order.
        expected: String,
        /// Unit glyphs named by the annotations, in order.
        found: String,
    },
}

/// Errors raised by direct grid access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The coordinate lies outside the map rectangle.
    #[error("cell ({}, {}) lies outside the {columns}x{rows} map", cell.column(), cell.row())]
    OutOfRange {
        /// Requested cell.
        cell: CellCoord,
        /// Map width.
        columns: u32,
        /// Map height.
        rows: u32,
    },
}

/// Rectangular map of tiles stored in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    columns: u32,
    rows: u32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Parses map text, spawning units according to `config`.
    ///
    /// Rows may carry trailing health annotations in the form produced by
    /// [`TileGrid::to_text`], e.g. `#.G.E#   G(200), E(131)`.
    pub fn parse(text: &str, config: &BattleConfig) -> Result<Self, ParseError> {
        let lines: Vec<&str> = text.lines().collect();
        let used = lines
            .iter()
            .rposition(|line| !line.trim().is_empty())
            .map_or(0, |last| last + 1);
        if used == 0 {
            return Err(ParseError::EmptyMap);
        }

        let mut width: Option<usize> = None;
        let mut tiles = Vec::new();

        for (index, raw) in lines[..used].iter().enumerate() {
            let line = index + 1;
            let (row_text, annotations) = split_annotations(raw);

            let mut row = Vec::with_capacity(row_text.len());
            for (column, glyph) in row_text.chars().enumerate() {
                let tile = match glyph {
                    '#' => Tile::Wall,
                    '.' => Tile::Open,
                    other => match Faction::from_glyph(other) {
                        Some(faction) => Tile::Unit(config.spawn(faction)),
                        None => {
                            return Err(ParseError::InvalidTileChar {
                                glyph: other,
                                line,
                                column,
                            })
                        }
                    },
                };
                row.push(tile);
            }

            match width {
                None => width = Some(row.len()),
                Some(expected) if expected != row.len() => {
                    return Err(ParseError::RaggedRow {
                        line,
                        expected,
                        found: row.len(),
                    });
                }
                Some(_) => {}
            }

            if let Some(annotations) = annotations {
                apply_annotations(&mut row, annotations, line)?;
            }

            tiles.extend(row);
        }

        let columns = width.unwrap_or(0);
        if columns == 0 {
            return Err(ParseError::EmptyMap);
        }

        Ok(Self {
            columns: dimension(columns),
            rows: dimension(used),
            tiles,
        })
    }

    /// Map dimensions as `(columns, rows)`.
    #[must_use]
    pub const fn bounds(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Returns the tile stored at `cell`.
    pub fn get(&self, cell: CellCoord) -> Result<Tile, WorldError> {
        self.view()
            .tile(cell)
            .ok_or_else(|| self.out_of_range(cell))
    }

    /// Replaces the tile stored at `cell`.
    pub fn set(&mut self, cell: CellCoord, tile: Tile) -> Result<(), WorldError> {
        let index = self
            .view()
            .index(cell)
            .ok_or_else(|| self.out_of_range(cell))?;
        self.tiles[index] = tile;
        Ok(())
    }

    /// Borrowed read-only view used by systems.
    #[must_use]
    pub fn view(&self) -> TileView<'_> {
        TileView::new(&self.tiles, self.columns, self.rows)
    }

    /// Serialises the map, optionally followed by per-row health annotations.
    ///
    /// Parsing annotated output with the same configuration reproduces the
    /// grid exactly.
    #[must_use]
    pub fn to_text(&self, annotate: bool) -> String {
        let mut text = String::with_capacity(self.tiles.len() * 2);
        let width = usize::try_from(self.columns).unwrap_or(0).max(1);

        for row in self.tiles.chunks(width) {
            text.extend(row.iter().map(Tile::glyph));

            if annotate {
                text.push_str(&row_annotation(row));
            }

            text.push('\n');
        }

        text
    }

    fn out_of_range(&self, cell: CellCoord) -> WorldError {
        WorldError::OutOfRange {
            cell,
            columns: self.columns,
            rows: self.rows,
        }
    }
}

impl fmt::Display for TileGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text(false))
    }
}

/// Health annotation for one map row, e.g. `   G(200), E(131)`.
///
/// Empty when the row holds no unit.
#[must_use]
pub fn row_annotation(row: &[Tile]) -> String {
    let mut text = String::new();
    for (position, unit) in row.iter().filter_map(Tile::unit).enumerate() {
        text.push_str(if position == 0 { ANNOTATION_GAP } else { ", " });
        let _ = write!(
            text,
            "{}({})",
            unit.faction().glyph(),
            unit.health().get()
        );
    }
    text
}

/// Splits a line into map glyphs and an annotation list.
///
/// Only a whitespace gap followed by a `G(` or `E(` token starts an
/// annotation; any other whitespace stays in the row and is rejected as a
/// tile.
fn split_annotations(line: &str) -> (&str, Option<&str>) {
    for (split, glyph) in line.char_indices() {
        if !glyph.is_whitespace() {
            continue;
        }
        let rest = line[split..].trim_start();
        let mut chars = rest.chars();
        let opens_annotation = matches!(
            (chars.next().and_then(Faction::from_glyph), chars.next()),
            (Some(_), Some('('))
        );
        if opens_annotation {
            return (&line[..split], Some(rest.trim_end()));
        }
    }
    (line, None)
}

fn apply_annotations(row: &mut [Tile], annotations: &str, line: usize) -> Result<(), ParseError> {
    let mut parsed = Vec::new();
    for token in annotations.split(',') {
        let token = token.trim();
        parsed.push(parse_annotation(token).ok_or_else(|| ParseError::InvalidAnnotation {
            line,
            text: token.to_owned(),
        })?);
    }

    let expected: String = row
        .iter()
        .filter_map(Tile::unit)
        .map(|unit| unit.faction().glyph())
        .collect();
    let found: String = parsed.iter().map(|(faction, _)| faction.glyph()).collect();
    if expected != found {
        return Err(ParseError::AnnotationMismatch {
            line,
            expected,
            found,
        });
    }

    let mut health = parsed.into_iter().map(|(_, health)| health);
    for tile in row.iter_mut() {
        if let Tile::Unit(unit) = tile {
            if let Some(value) = health.next() {
                *unit = unit.with_health(value);
            }
        }
    }

    Ok(())
}

fn parse_annotation(token: &str) -> Option<(Faction, Health)> {
    let mut chars = token.chars();
    let faction = Faction::from_glyph(chars.next()?)?;
    let value = chars.as_str().strip_prefix('(')?.strip_suffix(')')?;
    let health: u32 = value.trim().parse().ok()?;
    if health == 0 {
        return None;
    }
    Some((faction, Health::new(health)))
}

fn dimension(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

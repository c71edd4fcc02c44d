#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts and a text presenter for battle frames.

use anyhow::Result as AnyResult;
use bandits_core::{CellCoord, Faction, Tile};
use bandits_world::{query, row_annotation, World};
use std::{error::Error, fmt, io::Write};

/// Opaque colour used when presenting frames on a terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    /// Red channel intensity.
    pub red: u8,
    /// Green channel intensity.
    pub green: u8,
    /// Blue channel intensity.
    pub blue: u8,
}

impl Color {
    /// Creates a colour from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    fn foreground(self) -> String {
        format!("\x1b[38;2;{};{};{}m", self.red, self.green, self.blue)
    }
}

const ELF_COLOR: Color = Color::from_rgb_u8(60, 200, 90);
const GOBLIN_COLOR: Color = Color::from_rgb_u8(220, 60, 50);
const WALL_COLOR: Color = Color::from_rgb_u8(110, 110, 110);
const RESET: &str = "\x1b[0m";
const INVERSE: &str = "\x1b[7m";

/// Frame captured from a world, detached from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scene {
    /// Width of the map in cells.
    pub columns: u32,
    /// Height of the map in cells.
    pub rows: u32,
    /// Row-major tiles.
    pub tiles: Vec<Tile>,
    /// Number of full rounds fought when the frame was captured.
    pub completed_rounds: u32,
    /// Cell drawn with inverted colours, if any.
    pub highlight: Option<CellCoord>,
}

impl Scene {
    /// Captures the current state of `world`.
    pub fn from_world(world: &World, highlight: Option<CellCoord>) -> Result<Self, RenderingError> {
        let grid = query::grid(world);
        let (columns, rows) = grid.bounds();
        if let Some(cell) = highlight {
            if cell.column() >= columns || cell.row() >= rows {
                return Err(RenderingError::HighlightOutOfRange {
                    cell,
                    columns,
                    rows,
                });
            }
        }

        let view = grid.view();
        let mut tiles = Vec::with_capacity((columns as usize) * (rows as usize));
        for row in 0..rows {
            for column in 0..columns {
                tiles.push(view.tile(CellCoord::new(column, row)).unwrap_or(Tile::Wall));
            }
        }

        Ok(Self {
            columns,
            rows,
            tiles,
            completed_rounds: query::completed_rounds(world),
            highlight,
        })
    }

    /// Title line describing how far the battle has progressed.
    #[must_use]
    pub fn header(&self) -> String {
        match self.completed_rounds {
            0 => String::from("Initially:"),
            1 => String::from("After 1 round:"),
            rounds => format!("After {rounds} rounds:"),
        }
    }

    fn row(&self, row: u32) -> &[Tile] {
        let width = self.columns as usize;
        let start = row as usize * width;
        self.tiles.get(start..start + width).unwrap_or(&[])
    }
}

/// Switches controlling how frames are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Presentation {
    /// Append the health of each row's units.
    pub annotate: bool,
    /// Emit ANSI colour escapes.
    pub color: bool,
}

/// Sink capable of presenting battle frames.
pub trait Presenter {
    /// Presents a single frame.
    fn present(&mut self, scene: &Scene) -> AnyResult<()>;
}

/// Presenter that writes frames as text.
#[derive(Debug)]
pub struct TextPresenter<W: Write> {
    writer: W,
    presentation: Presentation,
}

impl<W: Write> TextPresenter<W> {
    /// Wraps `writer`.
    pub fn new(writer: W, presentation: Presentation) -> Self {
        Self {
            writer,
            presentation,
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_tile(&mut self, tile: Tile, highlighted: bool) -> AnyResult<()> {
        if !self.presentation.color {
            write!(self.writer, "{}", tile.glyph())?;
            return Ok(());
        }

        if highlighted {
            write!(self.writer, "{INVERSE}")?;
        }
        match tile {
            Tile::Wall => write!(self.writer, "{}#", WALL_COLOR.foreground())?,
            Tile::Open => write!(self.writer, ".")?,
            Tile::Unit(unit) => write!(
                self.writer,
                "{}{}",
                faction_color(unit.faction()).foreground(),
                unit.faction().glyph()
            )?,
        }
        write!(self.writer, "{RESET}")?;
        Ok(())
    }
}

impl<W: Write> Presenter for TextPresenter<W> {
    fn present(&mut self, scene: &Scene) -> AnyResult<()> {
        writeln!(self.writer, "{}", scene.header())?;

        for row in 0..scene.rows {
            for (column, tile) in scene.row(row).iter().enumerate() {
                let highlighted = scene.highlight == Some(CellCoord::new(column as u32, row));
                self.write_tile(*tile, highlighted)?;
            }

            if self.presentation.annotate {
                write!(self.writer, "{}", row_annotation(scene.row(row)))?;
            }

            writeln!(self.writer)?;
        }

        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

fn faction_color(faction: Faction) -> Color {
    match faction {
        Faction::Elf => ELF_COLOR,
        Faction::Goblin => GOBLIN_COLOR,
    }
}

/// Errors that can occur when capturing scenes.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// The highlighted cell lies outside the map.
    HighlightOutOfRange {
        /// Requested highlight.
        cell: CellCoord,
        /// Width of the map.
        columns: u32,
        /// Height of the map.
        rows: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighlightOutOfRange {
                cell,
                columns,
                rows,
            } => {
                write!(
                    f,
                    "highlight ({}, {}) lies outside the {columns}x{rows} map",
                    cell.column(),
                    cell.row()
                )
            }
        }
    }
}

impl Error for RenderingError {}

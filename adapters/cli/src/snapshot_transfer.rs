use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use bandits_world::{query, ParseError, World, WorldSnapshot};

const SNAPSHOT_DOMAIN: &str = "battle";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "battle:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Battle state together with the map dimensions announced in the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BattleTransfer {
    /// Number of map columns.
    pub columns: u32,
    /// Number of map rows.
    pub rows: u32,
    /// Complete world state.
    pub snapshot: WorldSnapshot,
}

impl BattleTransfer {
    /// Captures the state of `world`.
    pub(crate) fn capture(world: &World) -> Self {
        let (columns, rows) = query::grid(world).bounds();
        Self {
            columns,
            rows,
            snapshot: query::snapshot(world),
        }
    }

    /// Encodes the snapshot into a single-line string suitable for copying.
    pub(crate) fn encode(&self) -> Result<String, TransferError> {
        let json = serde_json::to_vec(&self.snapshot).map_err(TransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.columns, self.rows
        ))
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, TransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(TransferError::MissingPrefix)?;
        let version = parts.next().ok_or(TransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(TransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(TransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(TransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(TransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(TransferError::InvalidEncoding)?;
        let snapshot: WorldSnapshot =
            serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)?;

        Ok(Self {
            columns,
            rows,
            snapshot,
        })
    }

    /// Rebuilds the world, checking the map against the announced dimensions.
    pub(crate) fn into_world(self) -> Result<World, TransferError> {
        let world = World::from_snapshot(&self.snapshot).map_err(TransferError::InvalidMap)?;
        let actual = query::grid(&world).bounds();
        if actual != (self.columns, self.rows) {
            return Err(TransferError::DimensionMismatch {
                declared: (self.columns, self.rows),
                actual,
            });
        }
        Ok(world)
    }
}

/// Errors that can occur while moving snapshots in and out of strings.
#[derive(Debug)]
pub(crate) enum TransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    MissingVersion,
    /// The encoded snapshot did not include map dimensions.
    MissingDimensions,
    /// The encoded snapshot did not include the payload segment.
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The map dimensions could not be parsed from the encoded snapshot.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The payload could not be converted to or from JSON.
    InvalidPayload(serde_json::Error),
    /// The map inside the payload could not be parsed.
    InvalidMap(ParseError),
    /// The map inside the payload disagrees with the header.
    DimensionMismatch {
        /// Dimensions announced in the header.
        declared: (u32, u32),
        /// Dimensions of the decoded map.
        actual: (u32, u32),
    },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "snapshot string was empty"),
            Self::MissingPrefix => write!(f, "snapshot string is missing the prefix"),
            Self::MissingVersion => write!(f, "snapshot string is missing the version"),
            Self::MissingDimensions => write!(f, "snapshot string is missing the map dimensions"),
            Self::MissingPayload => write!(f, "snapshot string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "snapshot prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "snapshot version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse map dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode snapshot payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not process snapshot payload: {error}")
            }
            Self::InvalidMap(error) => write!(f, "snapshot map is invalid: {error}"),
            Self::DimensionMismatch { declared, actual } => write!(
                f,
                "snapshot announces a {}x{} map but holds {}x{}",
                declared.0, declared.1, actual.0, actual.1
            ),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            Self::InvalidMap(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), TransferError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| TransferError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| TransferError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| TransferError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || rows == 0 {
        return Err(TransferError::InvalidDimensions(dimensions.to_owned()));
    }

    Ok((columns, rows))
}

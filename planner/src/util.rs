use std::collections::HashMap;
use std::io::{BufRead, Read};
use std::str::FromStr;

use crate::error::{MapError, Result};

/// The first line of a map description: `xmin ymin width height resolution`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MapHeader {
    pub xmin: f64,
    pub ymin: f64,
    pub width: usize,
    pub height: usize,
    pub resolution: f64,
}

impl FromStr for MapHeader {
    type Err = MapError;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            return Err(MapError::Format(format!(
                "need xmin ymin width height resolution, got {} field(s)",
                fields.len()
            )));
        }

        let header = MapHeader {
            xmin: parse_field(fields[0], "xmin")?,
            ymin: parse_field(fields[1], "ymin")?,
            width: parse_field(fields[2], "width")?,
            height: parse_field(fields[3], "height")?,
            resolution: parse_field(fields[4], "resolution")?,
        };

        if !header.resolution.is_finite() || header.resolution == 0.0 {
            return Err(MapError::Format(format!(
                "resolution must be finite and non-zero, got {}",
                header.resolution
            )));
        }

        Ok(header)
    }
}

fn parse_field<T: FromStr>(field: &str, name: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| MapError::Format(format!("invalid {}: {:?}", name, field)))
}

/// Read a header line followed by the label tokens of the body.
///
/// The returned labels always hold exactly `width * height` values.
pub fn read_map<R: BufRead>(mut reader: R) -> Result<(MapHeader, Vec<i64>)> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let header: MapHeader = line.parse()?;

    let expected = header.width.checked_mul(header.height).ok_or_else(|| {
        MapError::Format(format!("grid {}x{} is too large", header.width, header.height))
    })?;

    let mut body = String::new();
    reader.read_to_string(&mut body)?;

    Ok((header, collect_labels(&body, expected)))
}

/// Collect the integer tokens of `body`, padding with 0 or truncating to `expected` values.
/// Tokens that are not integers are skipped.
pub fn collect_labels(body: &str, expected: usize) -> Vec<i64> {
    let mut values: Vec<i64> = body
        .split_whitespace()
        .filter_map(|token| token.parse().ok())
        .take(expected)
        .collect();
    values.resize(expected, 0);
    values
}

/// Decide which labels mean free and occupied, returned as `(free, occupied)`.
///
/// When both 0 and 1 occur the more frequent of the two is free, ties going to 0. Otherwise
/// the most frequent label is free and occupied is fixed to 0, or to 1 when free is 0. In that
/// branch a third label is neither free nor occupied.
pub fn resolve_labels(values: &[i64]) -> (i64, i64) {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for value in values {
        *counts.entry(*value).or_default() += 1;
    }

    match (counts.get(&0), counts.get(&1)) {
        (Some(zeros), Some(ones)) => {
            if zeros >= ones {
                (0, 1)
            } else {
                (1, 0)
            }
        }
        _ => {
            let free = most_frequent(values, &counts).unwrap_or(0);
            let occupied = if free != 0 { 0 } else { 1 };
            (free, occupied)
        }
    }
}

/// The value with the highest count, the earliest one in `values` on ties
fn most_frequent(values: &[i64], counts: &HashMap<i64, usize>) -> Option<i64> {
    let mut best: Option<(i64, usize)> = None;
    for value in values {
        let count = counts[value];
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((*value, count));
        }
    }
    best.map(|(value, _)| value)
}

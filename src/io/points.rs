//! Plain text point lists: one `latitude longitude` pair per line, in
//! degrees, `#` starting a comment. This is the boundary format the
//! `viz` and `transform` commands consume instead of shapefiles.

use crate::Point;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Reads a latitude/longitude point list.
pub fn read_points(path: &Path) -> Result<Vec<Point>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut points = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => &line[..],
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let latitude: f64 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .with_context(|| format!("Line {}: missing latitude", index + 1))?;
        let longitude: f64 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .with_context(|| format!("Line {}: missing longitude", index + 1))?;
        if !(-90.0..=90.0).contains(&latitude) {
            bail!("Line {}: latitude {} out of range", index + 1, latitude);
        }
        points.push(Point::from_spherical(
            (90.0 - latitude).to_radians(),
            longitude.to_radians(),
        ));
    }
    Ok(points)
}

/// Writes a latitude/longitude point list.
pub fn write_points(path: &Path, points: &[Point]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "# latitude longitude (degrees)")?;
    for point in points {
        writeln!(
            writer,
            "{} {}",
            90.0 - point.p().to_degrees(),
            point.a().to_degrees()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_round_trip() {
        let points = vec![
            Point::from_spherical(0.3, 1.0),
            Point::from_spherical(2.0, -2.5),
        ];
        let path = env::temp_dir().join("cartosphere_points.txt");
        write_points(&path, &points).unwrap();
        let loaded = read_points(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        for (a, b) in points.iter().zip(&loaded) {
            assert!((a.x() - b.x()).abs() < 1e-12);
            assert!((a.z() - b.z()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rejects_bad_latitude() {
        let path = env::temp_dir().join("cartosphere_bad_points.txt");
        std::fs::write(&path, "95 0\n").unwrap();
        assert!(read_points(&path).is_err());
    }

    #[test]
    fn test_comments_and_blanks() {
        let path = env::temp_dir().join("cartosphere_comment_points.txt");
        std::fs::write(&path, "# ring\n\n0 0   # origin\n45 90\n").unwrap();
        let points = read_points(&path).unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].x() - 1.0).abs() < 1e-12);
    }
}

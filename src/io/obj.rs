//! Wavefront OBJ output for meshes and nodal fields.
//!
//! Two renderings are provided: [`write_obj`] draws a reference globe
//! slightly below the unit sphere plus a thin tube strip per mesh edge
//! slightly above it, and [`write_obj_poly`] emits the mesh triangles
//! directly. When nodal values are supplied, vertex texture coordinates
//! encode a 256-bin quantization of (value - min) / (max - min) for a
//! color-ramp material. A companion `cartosphere.mtl` defines the
//! materials.

use crate::TriangularMesh;
use crate::geom::arc::Arc;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const GLOBE_DETAIL: usize = 64;
const GLOBE_RADIUS: f64 = 0.999;
const SEGMENT_LENGTH: f64 = 0.1;
const SEGMENT_WIDTH: f64 = 0.001;
const SEGMENT_RADIUS: f64 = 1.001;
const COLOR_BINS: usize = 256;

/// Writes the globe-and-segments rendering of a mesh.
///
/// Supplying `values` emits the 256-bin color-ramp texture table for
/// materials that sample it; the globe and segment polygons themselves
/// are uncolored.
pub fn write_obj(path: &Path, mesh: &TriangularMesh, values: Option<&[f64]>) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    // Vertex positions and per-material polygon groups.
    let mut positions: Vec<[f64; 3]> = Vec::new();
    let mut groups: Vec<(String, Vec<Vec<usize>>)> = Vec::new();

    // Reference globe: a UV sphere under the unit sphere.
    {
        let uv = GLOBE_DETAIL;
        positions.push([0.0, 0.0, GLOBE_RADIUS]);
        for k in 1..uv {
            let p = std::f64::consts::PI * k as f64 / uv as f64;
            let z = GLOBE_RADIUS * p.cos();
            let ring = GLOBE_RADIUS * p.sin();
            for j in 0..uv {
                let a = 2.0 * std::f64::consts::PI * j as f64 / uv as f64;
                positions.push([ring * a.cos(), ring * a.sin(), z]);
            }
        }
        positions.push([0.0, 0.0, -GLOBE_RADIUS]);

        let mut polygons: Vec<Vec<usize>> = Vec::new();
        for j in 0..uv {
            polygons.push(vec![1, 2 + j, 2 + (j + 1) % uv]);
        }
        for k in 1..uv - 1 {
            for j in 0..uv {
                polygons.push(vec![
                    2 + uv * (k - 1) + j,
                    2 + uv * k + j,
                    2 + uv * k + (j + 1) % uv,
                    2 + uv * (k - 1) + (j + 1) % uv,
                ]);
            }
        }
        for j in 0..uv {
            polygons.push(vec![
                2 + uv * (uv - 2) + j,
                2 + uv * (uv - 1),
                2 + uv * (uv - 2) + (j + 1) % uv,
            ]);
        }
        groups.push(("globe".to_string(), polygons));
    }

    // One tube strip per mesh edge, just above the unit sphere.
    for edge in mesh.edges() {
        let a = mesh.vertices()[edge.first];
        let b = mesh.vertices()[edge.second];
        let arc = Arc::new(a, b);
        let span = arc.length();
        let segments = (span / SEGMENT_LENGTH).ceil().max(1.0) as usize;

        let offset = positions.len();
        for s in 0..=segments {
            let u = span * s as f64 / segments as f64;
            for w in [-SEGMENT_WIDTH, SEGMENT_WIDTH] {
                let p = arc.local_offset(u, w);
                positions.push([
                    p.x() * SEGMENT_RADIUS,
                    p.y() * SEGMENT_RADIUS,
                    p.z() * SEGMENT_RADIUS,
                ]);
            }
        }
        let mut polygons: Vec<Vec<usize>> = Vec::new();
        for s in 0..segments {
            polygons.push(vec![offset + 2 * s + 1, offset + 2 * s + 3, offset + 2 * s + 2]);
            polygons.push(vec![offset + 2 * s + 2, offset + 2 * s + 3, offset + 2 * s + 4]);
        }
        groups.push(("segment".to_string(), polygons));
    }

    let polygon_count: usize = groups.iter().map(|(_, p)| p.len()).sum();
    writeln!(writer, "# Wavefront OBJ generated by cartosphere")?;
    writeln!(writer, "# vertices: {}", positions.len())?;
    writeln!(writer, "# polygons: {polygon_count}")?;
    let stats = mesh.statistics();
    writeln!(
        writer,
        "# mesh: {} vertices, {} edges, {} faces",
        stats.vertices, stats.edges, stats.faces
    )?;
    writeln!(writer)?;
    writeln!(writer, "mtllib cartosphere.mtl")?;

    writeln!(writer)?;
    for p in &positions {
        writeln!(writer, "v  {} {} {}", p[0], p[1], p[2])?;
    }
    writeln!(writer)?;
    for p in &positions {
        // The normal of a point near the unit sphere is its direction.
        let norm = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        writeln!(writer, "vn {} {} {}", p[0] / norm, p[1] / norm, p[2] / norm)?;
    }
    if values.is_some() {
        writeln!(writer)?;
        write_color_ramp(&mut writer)?;
    }

    for (index, (material, polygons)) in groups.iter().enumerate() {
        writeln!(writer)?;
        writeln!(writer, "s {}", index + 1)?;
        writeln!(writer, "usemtl {material}")?;
        for polygon in polygons {
            write!(writer, "f")?;
            for &v in polygon {
                write!(writer, " {v}//{v}")?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "s off")?;
    }
    Ok(())
}

/// Writes the mesh triangles with per-vertex quantized colors.
pub fn write_obj_poly(path: &Path, mesh: &TriangularMesh, values: &[f64]) -> Result<()> {
    if values.len() != mesh.vertices().len() {
        bail!(
            "need one value per vertex: {} values for {} vertices",
            values.len(),
            mesh.vertices().len()
        );
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &value in values {
        min = min.min(value);
        max = max.max(value);
    }
    let range = if max > min { max - min } else { 1.0 };
    // 1-based bin of each vertex value in the 256-step ramp.
    let bins: Vec<usize> = values
        .iter()
        .map(|v| 1 + ((COLOR_BINS - 1) as f64 * (v - min) / range) as usize)
        .collect();

    writeln!(writer, "# Wavefront OBJ generated by cartosphere")?;
    let stats = mesh.statistics();
    writeln!(
        writer,
        "# mesh: {} vertices, {} edges, {} faces",
        stats.vertices, stats.edges, stats.faces
    )?;
    writeln!(writer)?;
    writeln!(writer, "mtllib cartosphere.mtl")?;
    writeln!(writer)?;
    for p in mesh.vertices() {
        writeln!(writer, "v  {} {} {}", p.x(), p.y(), p.z())?;
    }
    writeln!(writer)?;
    for p in mesh.vertices() {
        writeln!(writer, "vn {} {} {}", p.x(), p.y(), p.z())?;
    }
    writeln!(writer)?;
    write_color_ramp(&mut writer)?;
    writeln!(writer)?;
    writeln!(writer, "usemtl color")?;
    for fv in mesh.face_vertices() {
        write!(writer, "f")?;
        for &v in fv {
            write!(writer, " {}/{}/{}", v + 1, bins[v], v + 1)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Writes the companion material library.
pub fn write_mtl(path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "newmtl globe")?;
    writeln!(writer, "Kd 0.8 0.8 0.85")?;
    writeln!(writer, "d 1.0")?;
    writeln!(writer)?;
    writeln!(writer, "newmtl segment")?;
    writeln!(writer, "Kd 0.1 0.1 0.1")?;
    writeln!(writer)?;
    writeln!(writer, "newmtl color")?;
    writeln!(writer, "Kd 1.0 1.0 1.0")?;
    writeln!(writer, "map_Kd ramp.png")?;
    Ok(())
}

/// The 256 texture coordinates of the color ramp.
fn write_color_ramp<W: Write>(writer: &mut W) -> Result<()> {
    for k in 0..COLOR_BINS {
        let c = k as f64 / COLOR_BINS as f64;
        writeln!(writer, "vt {c} {c}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_write_obj_poly_counts() {
        let mesh = TriangularMesh::icosahedron();
        let values: Vec<f64> = mesh.vertices().iter().map(|v| v.x()).collect();
        let path = env::temp_dir().join("cartosphere_poly.obj");
        write_obj_poly(&path, &mesh, &values).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 12);
        assert_eq!(text.lines().filter(|l| l.starts_with("f")).count(), 20);
        assert_eq!(text.lines().filter(|l| l.starts_with("vt")).count(), 256);
    }

    #[test]
    fn test_write_obj_globe_and_segments() {
        let mesh = TriangularMesh::icosahedron();
        let path = env::temp_dir().join("cartosphere_globe.obj");
        write_obj(&path, &mesh, None).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        // 30 edges produce 30 segment groups plus the globe.
        assert_eq!(text.lines().filter(|l| l.contains("usemtl segment")).count(), 30);
        assert_eq!(text.lines().filter(|l| l.contains("usemtl globe")).count(), 1);
        assert!(text.lines().filter(|l| l.starts_with("vt")).count() == 0);
    }

    #[test]
    fn test_value_size_mismatch() {
        let mesh = TriangularMesh::icosahedron();
        let path = env::temp_dir().join("cartosphere_mismatch.obj");
        assert!(write_obj_poly(&path, &mesh, &[1.0, 2.0]).is_err());
    }
}

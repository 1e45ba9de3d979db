//! CSM mesh text format I/O.
//!
//! The format is line-oriented; `#` starts a comment. The first record
//! gives the entity counts `V E F` with an optional format identifier
//! (only 0 is recognized). Then V vertex records follow, each either a
//! spherical `(colatitude, azimuth)` pair or a Cartesian triple, all in
//! degrees; then E edge records of two vertex indices; then F face
//! records of three signed edge tokens like `+12` or `-3`, the sign
//! giving the traversal direction.
//!
//! I/O failures are returned as errors. Parse and topology problems are
//! reported through the returned mesh instead: it carries the line-
//! numbered messages and reads `is_ready() == false`.

use crate::TriangularMesh;
use crate::geom::mesh::{DirectedEdge, Face, UndirectedEdge};
use crate::geom::point::Point;
use anyhow::{Context, Result};
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Reads a mesh from a CSM file.
pub fn load_csm(path: &Path) -> Result<TriangularMesh> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut vertices: Vec<Point> = Vec::new();
    let mut edges: Vec<UndirectedEdge> = Vec::new();
    let mut faces: Vec<Face> = Vec::new();
    let mut counts: Option<(usize, usize, usize)> = None;
    let mut messages: Vec<String> = Vec::new();
    let mut parsed = 0usize;

    let fail = |messages: Vec<String>| {
        let mut mesh = TriangularMesh::default();
        for m in messages {
            mesh.log_message(m);
        }
        mesh
    };

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.with_context(|| format!("Failed to read line {number}"))?;
        // Strip comments and surrounding whitespace.
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => &line[..],
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let Some((nv, ne, nf)) = counts else {
            // Size specification record.
            let mut sizes = [0usize; 3];
            for (slot, name) in ["points", "edges", "triangles"].iter().enumerate() {
                match tokens.get(slot).and_then(|t| t.parse::<usize>().ok()) {
                    Some(size) if size > 0 => sizes[slot] = size,
                    _ => {
                        messages.push(format!(
                            "Error in Line {number}: Number of {name} is missing or zero"
                        ));
                        return Ok(fail(messages));
                    }
                }
            }
            if let Some(token) = tokens.get(3) {
                match token.parse::<usize>() {
                    Ok(0) => {}
                    _ => {
                        messages.push(format!(
                            "Error in Line {number}: File format ID {token} is unrecognized"
                        ));
                        return Ok(fail(messages));
                    }
                }
            }
            counts = Some((sizes[0], sizes[1], sizes[2]));
            parsed += 1;
            continue;
        };

        if parsed <= nv {
            // Vertex record: spherical pair or Cartesian triple, degrees.
            let coords: Vec<f64> = tokens
                .iter()
                .map_while(|t| t.parse::<f64>().ok())
                .collect();
            match coords.len() {
                0 | 1 => {
                    messages.push(format!(
                        "Error in Line {number}: Missing coordinate {}",
                        coords.len()
                    ));
                    return Ok(fail(messages));
                }
                2 => vertices.push(Point::from_spherical(
                    coords[0].to_radians(),
                    coords[1].to_radians(),
                )),
                3 => vertices.push(Point::from_cartesian(coords[0], coords[1], coords[2])),
                _ => {
                    vertices.push(Point::from_cartesian(coords[0], coords[1], coords[2]));
                    messages.push(format!(
                        "Warning in Line {number}: Extra arguments are dropped"
                    ));
                }
            }
        } else if parsed <= nv + ne {
            // Edge record: two vertex indices.
            let indices: Vec<usize> = tokens
                .iter()
                .map_while(|t| t.parse::<usize>().ok())
                .collect();
            if indices.len() < 2 {
                messages.push(format!(
                    "Error in Line {number}: Edge specification missing point(s)"
                ));
                return Ok(fail(messages));
            }
            if indices.len() > 2 {
                messages.push(format!(
                    "Warning in Line {number}: Extra arguments are dropped"
                ));
            }
            edges.push(UndirectedEdge::new(indices[0], indices[1]));
        } else if parsed <= nv + ne + nf {
            // Face record: three signed edge tokens.
            let mut directed = Vec::with_capacity(3);
            for slot in 0..3 {
                let Some(token) = tokens.get(slot) else {
                    messages.push(format!(
                        "Error in Line {number}: Argument {slot} is missing an orientation"
                    ));
                    return Ok(fail(messages));
                };
                let (forward, rest) = match token.strip_prefix('+') {
                    Some(rest) => (true, rest),
                    None => match token.strip_prefix('-') {
                        Some(rest) => (false, rest),
                        None => {
                            messages.push(format!(
                                "Error in Line {number}: Argument {slot} is missing an orientation"
                            ));
                            return Ok(fail(messages));
                        }
                    },
                };
                match rest.parse::<usize>() {
                    Ok(edge) => directed.push(DirectedEdge::new(edge, forward)),
                    Err(_) => {
                        messages.push(format!(
                            "Error in Line {number}: Argument {slot} is not formatted correctly"
                        ));
                        return Ok(fail(messages));
                    }
                }
            }
            if tokens.len() > 3 {
                messages.push(format!(
                    "Warning in Line {number}: Extra arguments are dropped"
                ));
            }
            faces.push(Face::new(directed[0], directed[1], directed[2]));
        }
        parsed += 1;
    }

    let Some((nv, ne, nf)) = counts else {
        messages.push("Error: file contains no records".to_string());
        return Ok(fail(messages));
    };
    if vertices.len() != nv || edges.len() != ne || faces.len() != nf {
        messages.push(format!(
            "Error: expected {nv} points, {ne} edges, {nf} triangles but found {}, {}, {}",
            vertices.len(),
            edges.len(),
            faces.len()
        ));
        return Ok(fail(messages));
    }

    // Index range checks before the topology walk.
    for (k, edge) in edges.iter().enumerate() {
        if edge.first >= nv || edge.second >= nv {
            messages.push(format!("Error in Edge #{k}: vertex index out of range"));
            return Ok(fail(messages));
        }
    }
    for (k, face) in faces.iter().enumerate() {
        if face.edges.iter().any(|de| de.edge >= ne) {
            messages.push(format!("Error in Face #{k}: edge index out of range"));
            return Ok(fail(messages));
        }
    }

    for message in &messages {
        warn!("{message}");
    }
    let mut mesh = TriangularMesh::from_parts(vertices, edges, faces);
    for message in messages {
        mesh.log_message(message);
    }
    Ok(mesh)
}

/// Writes a mesh to a CSM file. Vertices are stored as spherical pairs
/// in degrees with shortest round-trip precision.
pub fn save_csm(path: &Path, mesh: &TriangularMesh) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# Cartosphere mesh format")?;
    writeln!(writer, "# V E F")?;
    writeln!(
        writer,
        "{} {} {}",
        mesh.vertices().len(),
        mesh.edges().len(),
        mesh.faces().len()
    )?;
    writeln!(writer)?;
    writeln!(writer, "# V list")?;
    for point in mesh.vertices() {
        writeln!(writer, "{} {}", point.p().to_degrees(), point.a().to_degrees())?;
    }
    writeln!(writer)?;
    writeln!(writer, "# E list")?;
    for edge in mesh.edges() {
        writeln!(writer, "{} {}", edge.first, edge.second)?;
    }
    writeln!(writer)?;
    writeln!(writer, "# F list")?;
    for face in mesh.faces() {
        let token = |de: &DirectedEdge| {
            format!("{}{}", if de.forward { '+' } else { '-' }, de.edge)
        };
        writeln!(
            writer,
            "{} {} {}",
            token(&face.edges[0]),
            token(&face.edges[1]),
            token(&face.edges[2])
        )?;
    }
    Ok(())
}

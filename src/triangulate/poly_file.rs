// .node, .poly and .ele files in the format of the Triangle mesh generator

use super::{Triangle, TriangulationInput};
use crate::geometry::Point3D;
use crate::Result;

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

pub fn write_nodes<W: Write>(f: &mut W, nodes: &[Point3D]) -> Result<()> {
    // one attribute per node, always zero on input
    writeln!(f, "{} 2 1 0", nodes.len())?;
    for (i, p) in nodes.iter().enumerate() {
        writeln!(f, "{i} {:.6} {:.6} {:.2}", p.x, p.y, 0.)?;
    }
    Ok(())
}

pub fn write_poly<W: Write>(f: &mut W, input: &TriangulationInput) -> Result<()> {
    // nodes are in the .node file
    writeln!(f, "0 2 1 0")?;

    writeln!(f, "{} 0", input.segments.len())?;
    for (i, s) in input.segments.iter().enumerate() {
        writeln!(f, "{i} {} {}", s.n1, s.n2)?;
    }

    writeln!(f, "{}", input.holes.len())?;
    for (i, h) in input.holes.iter().enumerate() {
        writeln!(f, "{i} {:.6} {:.6}", h.x, h.y)?;
    }

    writeln!(f, "{}", input.regions.len())?;
    for (i, r) in input.regions.iter().enumerate() {
        writeln!(f, "{i} {:.6} {:.6} {:.6}", r.x, r.y, r.attribute as f64)?;
    }
    Ok(())
}

pub fn write_elements<W: Write>(f: &mut W, triangles: &[Triangle]) -> Result<()> {
    writeln!(f, "{} 3 0", triangles.len())?;
    for (i, t) in triangles.iter().enumerate() {
        writeln!(
            f,
            "{i} {} {} {} {:.6} ",
            t.n1, t.n2, t.n3, t.attribute as f64
        )?;
    }
    Ok(())
}

/// writes `<stem>.node` and `<stem>.poly` into `dir`
pub fn write_triangle_input(dir: &Path, stem: &str, input: &TriangulationInput) -> Result<()> {
    let mut node = BufWriter::new(File::create(dir.join(format!("{stem}.node")))?);
    write_nodes(&mut node, &input.nodes)?;
    node.flush()?;

    let mut poly = BufWriter::new(File::create(dir.join(format!("{stem}.poly")))?);
    write_poly(&mut poly, input)?;
    poly.flush()?;
    Ok(())
}

/// writes `<stem>.ele` into `dir`
pub fn write_triangles(dir: &Path, stem: &str, triangles: &[Triangle]) -> Result<()> {
    let mut ele = BufWriter::new(File::create(dir.join(format!("{stem}.ele")))?);
    write_elements(&mut ele, triangles)?;
    ele.flush()?;
    Ok(())
}

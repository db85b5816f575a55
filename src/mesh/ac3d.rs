use super::{AcFile, AcObject};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Material table written at the top of every file; indices match
/// [`super::builder::MAT_UNLIT`] and [`super::builder::MAT_LIT`]
const MATERIALS: &[&str] = &[
    "MATERIAL \"unlit\" rgb 1 1 1 amb 1 1 1 emis 0 0 0 spec 0.5 0.5 0.5 shi 64 trans 0",
    "MATERIAL \"lit\" rgb 1 1 1 amb 1 1 1 emis 0.9 0.85 0.6 spec 0.5 0.5 0.5 shi 64 trans 0",
];

/// Write objects to an AC3D text file
///
/// Format:
/// - `AC3Db` header and the material table
/// - a `world` object whose kids are the polygon objects
/// - per object: name, optional texture, `numvert` nodes, `numsurf` surfaces
///
/// Local `(x, y, z)` nodes are written as `(-y, z, -x)`, the axis order the
/// simulator expects.
pub fn write_ac(path: &Path, file: &AcFile) -> Result<()> {
    let out = File::create(path)
        .with_context(|| format!("Failed to create AC3D file: {}", path.display()))?;
    let mut writer = BufWriter::new(out);
    write_ac_to(&mut writer, file)
        .with_context(|| format!("Failed to write AC3D file: {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub fn write_ac_to<W: Write>(writer: &mut W, file: &AcFile) -> std::io::Result<()> {
    writeln!(writer, "AC3Db")?;
    for material in MATERIALS {
        writeln!(writer, "{material}")?;
    }

    let objects: Vec<&AcObject> = file.objects().iter().filter(|o| !o.is_empty()).collect();
    writeln!(writer, "OBJECT world")?;
    writeln!(writer, "kids {}", objects.len())?;

    for object in objects {
        writeln!(writer, "OBJECT poly")?;
        writeln!(writer, "name \"{}\"", object.name)?;
        if let Some(texture) = &object.texture {
            writeln!(writer, "texture \"{texture}\"")?;
        }
        writeln!(writer, "numvert {}", object.node_count())?;
        for [x, y, z] in object.nodes() {
            writeln!(writer, "{:.3} {:.3} {:.3}", -y, z, -x)?;
        }
        writeln!(writer, "numsurf {}", object.face_count())?;
        for face in object.faces() {
            writeln!(writer, "SURF 0x0")?;
            writeln!(writer, "mat {}", face.material)?;
            writeln!(writer, "refs {}", face.refs.len())?;
            for (index, u, v) in &face.refs {
                writeln!(writer, "{index} {u:.5} {v:.5}")?;
            }
        }
        writeln!(writer, "kids 0")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::builder::MAT_UNLIT;
    use std::fs;
    use tempfile::tempdir;

    fn sample() -> AcFile {
        let mut file = AcFile::new();
        let obj = file.new_object("roads", Some("roads.png".to_string()));
        let a = obj.node(1.0, 2.0, 3.0);
        let b = obj.node(4.0, 2.0, 3.0);
        let c = obj.node(4.0, 5.0, 3.0);
        obj.face(&[(a, 0.0, 0.0), (b, 1.0, 0.0), (c, 1.0, 1.0)], MAT_UNLIT);
        file.new_object("nothing", None);
        file
    }

    #[test]
    fn test_write_ac() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.ac");
        write_ac(&path, &sample()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "AC3Db");
        assert!(text.contains("kids 1\n"), "empty objects are skipped");
        assert!(text.contains("texture \"roads.png\""));
        assert!(text.contains("numvert 3"));
        assert!(text.contains("-2.000 3.000 -1.000"));
        assert!(text.contains("numsurf 1"));
        assert!(text.contains("refs 3"));
    }

    #[test]
    fn test_write_fails_for_missing_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("test.ac");
        assert!(write_ac(&path, &sample()).is_err());
    }
}

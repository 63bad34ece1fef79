//! Binary PCD reading and writing for point cloud messages.

use crate::error::MsgError;
use crate::message::PointCloudMessage;
use std::io::{BufRead, BufWriter, Read, Write};
use std::path::Path;

const MAX_POINTS: usize = 50_000_000;

/// Write a point cloud as a binary PCD file.
///
/// The layout is `FIELDS x y z` plus an `rgb` field when colors are present,
/// all little-endian 4-byte records, `DATA binary`.
pub fn write_pcd_binary(
    path: impl AsRef<Path>,
    cloud: &PointCloudMessage,
) -> Result<(), MsgError> {
    check_extension(path.as_ref())?;
    if let Some(colors) = &cloud.colors {
        if colors.len() != cloud.points.len() {
            return Err(MsgError::ColorCountMismatch {
                points: cloud.points.len(),
                colors: colors.len(),
            });
        }
    }

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    let n = cloud.points.len();

    let (fields, sizes, types, counts) = if cloud.colors.is_some() {
        ("x y z rgb", "4 4 4 4", "F F F U", "1 1 1 1")
    } else {
        ("x y z", "4 4 4", "F F F", "1 1 1")
    };
    writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(writer, "VERSION 0.7")?;
    writeln!(writer, "FIELDS {fields}")?;
    writeln!(writer, "SIZE {sizes}")?;
    writeln!(writer, "TYPE {types}")?;
    writeln!(writer, "COUNT {counts}")?;
    writeln!(writer, "WIDTH {n}")?;
    writeln!(writer, "HEIGHT 1")?;
    writeln!(writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(writer, "POINTS {n}")?;
    writeln!(writer, "DATA binary")?;

    for (i, point) in cloud.points.iter().enumerate() {
        for component in point {
            writer.write_all(&component.to_le_bytes())?;
        }
        if let Some(colors) = &cloud.colors {
            let [r, g, b] = colors[i];
            let rgb = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
            writer.write_all(&rgb.to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read a binary PCD file written by [`write_pcd_binary`].
///
/// Only the `x y z [rgb]` single-count float/uint layout is accepted.
pub fn read_pcd_binary(path: impl AsRef<Path>) -> Result<PointCloudMessage, MsgError> {
    check_extension(path.as_ref())?;

    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let layout = parse_header(&mut reader)?;

    if layout.num_points == 0 || layout.num_points > MAX_POINTS {
        return Err(MsgError::MalformedHeader);
    }

    let point_step = if layout.has_rgb { 16 } else { 12 };
    let mut buffer = vec![0u8; point_step];

    let mut points = Vec::with_capacity(layout.num_points);
    let mut colors = if layout.has_rgb {
        Vec::with_capacity(layout.num_points)
    } else {
        Vec::new()
    };

    for _ in 0..layout.num_points {
        reader.read_exact(&mut buffer)?;
        points.push([
            read_f32(&buffer, 0)?,
            read_f32(&buffer, 4)?,
            read_f32(&buffer, 8)?,
        ]);
        if layout.has_rgb {
            let rgb = read_u32(&buffer, 12)?;
            colors.push([
                ((rgb >> 16) & 0xFF) as u8,
                ((rgb >> 8) & 0xFF) as u8,
                (rgb & 0xFF) as u8,
            ]);
        }
    }

    Ok(PointCloudMessage {
        points,
        colors: (!colors.is_empty()).then_some(colors),
    })
}

struct PcdLayout {
    has_rgb: bool,
    num_points: usize,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PcdLayout, MsgError> {
    let mut fields: Vec<String> = Vec::new();
    let mut num_points = 0usize;

    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Err(MsgError::MalformedHeader);
        }
        let line = line.trim();

        if line.starts_with("DATA") {
            if line != "DATA binary" {
                return Err(MsgError::UnsupportedProperty);
            }
            break;
        }

        let mut it = line.split_whitespace();
        match it.next() {
            Some("FIELDS") => fields = it.map(String::from).collect(),
            Some("POINTS") => {
                let token = it.next().ok_or(MsgError::MalformedHeader)?;
                num_points = token.parse().map_err(|_| MsgError::MalformedHeader)?;
            }
            _ => {}
        }
    }

    let has_rgb = match fields.iter().map(String::as_str).collect::<Vec<_>>()[..] {
        ["x", "y", "z"] => false,
        ["x", "y", "z", "rgb"] => true,
        _ => return Err(MsgError::UnsupportedProperty),
    };

    Ok(PcdLayout {
        has_rgb,
        num_points,
    })
}

fn check_extension(path: &Path) -> Result<(), MsgError> {
    let Some(ext) = path.extension() else {
        return Err(MsgError::InvalidFileExtension("".into()));
    };
    if ext != "pcd" {
        return Err(MsgError::InvalidFileExtension(
            ext.to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

#[inline]
fn read_f32(buf: &[u8], offset: usize) -> Result<f32, MsgError> {
    let slice = buf
        .get(offset..offset + 4)
        .ok_or(MsgError::MalformedHeader)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(slice);
    Ok(f32::from_le_bytes(bytes))
}

#[inline]
fn read_u32(buf: &[u8], offset: usize) -> Result<u32, MsgError> {
    let slice = buf
        .get(offset..offset + 4)
        .ok_or(MsgError::MalformedHeader)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(slice);
    Ok(u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cloud(with_colors: bool) -> PointCloudMessage {
        PointCloudMessage {
            points: vec![[0.0, 0.5, -1.25], [3.5, -2.0, 0.125], [7.0, 8.0, 9.0]],
            colors: with_colors.then(|| vec![[255, 0, 0], [0, 255, 0], [0, 0, 255]]),
        }
    }

    #[test]
    fn xyz_roundtrip() -> Result<(), MsgError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.pcd");

        let cloud = sample_cloud(false);
        write_pcd_binary(&path, &cloud)?;
        let cloud_back = read_pcd_binary(&path)?;
        assert_eq!(cloud_back, cloud);
        Ok(())
    }

    #[test]
    fn xyzrgb_roundtrip() -> Result<(), MsgError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.pcd");

        let cloud = sample_cloud(true);
        write_pcd_binary(&path, &cloud)?;
        let cloud_back = read_pcd_binary(&path)?;
        assert_eq!(cloud_back, cloud);
        Ok(())
    }

    #[test]
    fn rejects_wrong_extension() {
        let result = write_pcd_binary("cloud.ply", &sample_cloud(false));
        assert!(matches!(result, Err(MsgError::InvalidFileExtension(_))));
    }

    #[test]
    fn rejects_ascii_data() -> Result<(), MsgError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cloud.pcd");
        std::fs::write(
            &path,
            "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 1\nPOINTS 1\nDATA ascii\n",
        )?;
        assert!(matches!(
            read_pcd_binary(&path),
            Err(MsgError::UnsupportedProperty)
        ));
        Ok(())
    }

    #[test]
    fn rejects_mismatched_colors() {
        let cloud = PointCloudMessage {
            points: vec![[0.0; 3]; 3],
            colors: Some(vec![[0; 3]; 2]),
        };
        assert!(matches!(
            write_pcd_binary("cloud.pcd", &cloud),
            Err(MsgError::ColorCountMismatch { .. })
        ));
    }
}

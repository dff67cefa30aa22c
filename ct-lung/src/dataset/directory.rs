//! 切片图像目录加载器.

use crate::consts::SLICE_EXTENSIONS;
use crate::data::UNIT_SPACING;
use crate::error::LoadError;
use crate::Volume;
use image::DynamicImage;
use itertools::Itertools;
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};

/// 文件名中的一段: 文本或数值.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NameChunk {
    /// 非数字段.
    Text(String),

    /// 数字段. 超出 `u64` 的数字段按文本处理.
    Number(u64),
}

/// 自然排序键: `slice_2.png` 排在 `slice_10.png` 之前.
pub fn natural_key(name: &str) -> Vec<NameChunk> {
    let chunks = name.chars().group_by(|c| c.is_ascii_digit());
    chunks
        .into_iter()
        .map(|(is_digit, chunk)| {
            let s: String = chunk.collect();
            match is_digit.then(|| s.parse::<u64>()) {
                Some(Ok(n)) => NameChunk::Number(n),
                _ => NameChunk::Text(s),
            }
        })
        .collect()
}

/// 该文件是否是可识别的切片图像?
fn is_slice_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SLICE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// 列出 `dir` 下的切片文件, 按自然顺序排列.
fn list_slices(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_owned(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if is_slice_file(&path) {
            files.push(path);
        }
    }
    files.sort_by_cached_key(|p| {
        natural_key(&p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default())
    });
    Ok(files)
}

/// 将灰度图像转换为 `(高, 宽)` 强度数组. 8-bit 和 16-bit 灰度按原值保留,
/// 其它格式先转换为 16-bit 灰度.
fn gray_samples(img: DynamicImage) -> Result<Array2<f32>, LoadError> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let raw: Vec<f32> = match img {
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        other => other
            .to_luma16()
            .into_raw()
            .into_iter()
            .map(f32::from)
            .collect(),
    };
    Ok(Array2::from_shape_vec((h, w), raw)?)
}

/// 加载切片目录. `spacing` 缺省时使用单位间距.
pub(super) fn load_dir(dir: &Path, spacing: Option<[f64; 3]>) -> Result<Volume, LoadError> {
    let files = list_slices(dir)?;
    if files.is_empty() {
        return Err(LoadError::Empty(dir.to_owned()));
    }
    log::debug!("reading {} slices from `{}`", files.len(), dir.display());

    let mut slices: Vec<Array2<f32>> = Vec::with_capacity(files.len());
    for path in files {
        let img = image::open(&path).map_err(|source| LoadError::Decode {
            path: path.clone(),
            source,
        })?;
        let sli = gray_samples(img)?;
        if let Some(first) = slices.first() {
            if first.dim() != sli.dim() {
                return Err(LoadError::InconsistentGeometry {
                    path,
                    expected: first.dim(),
                    found: sli.dim(),
                });
            }
        }
        slices.push(sli);
    }
    Ok(Volume::from_slices(&slices, spacing.unwrap_or(UNIT_SPACING))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoaderConfig, Rescale};
    use crate::dataset::load;
    use crate::VolumeAttr;
    use image::{GrayImage, ImageBuffer, Luma};
    use tempfile::tempdir;

    fn write_slice(dir: &Path, name: &str, w: u32, h: u32, value: u16) {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(w, h, Luma([value]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_natural_key_order() {
        let mut names = vec!["s10.png", "s2.png", "s1.png", "a.png"];
        names.sort_by_key(|n| natural_key(n));
        assert_eq!(names, vec!["a.png", "s1.png", "s2.png", "s10.png"]);
    }

    #[test]
    fn test_load_dir_stacks_in_natural_order() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        write_slice(dir, "img10.png", 4, 3, 1000);
        write_slice(dir, "img2.png", 4, 3, 200);
        write_slice(dir, "img1.png", 4, 3, 100);
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let v = load(dir, &LoaderConfig::default()).unwrap();
        assert_eq!(v.shape(), (3, 3, 4));
        assert_eq!(v.spacing(), UNIT_SPACING);
        assert_eq!([v[(0, 0, 0)], v[(1, 0, 0)], v[(2, 2, 3)]], [100.0, 200.0, 1000.0]);

        let options = LoaderConfig {
            spacing: Some([2.5, 0.5, 0.5]),
            rescale: Rescale {
                slope: 1.0,
                intercept: -1024.0,
            },
        };
        let v = load(dir, &options).unwrap();
        assert_eq!(v.spacing(), [2.5, 0.5, 0.5]);
        assert_eq!(v[(0, 0, 0)], -924.0);
    }

    #[test]
    fn test_load_8bit() {
        let tmp = tempdir().unwrap();
        GrayImage::from_pixel(2, 2, Luma([7u8]))
            .save(tmp.path().join("0.png"))
            .unwrap();
        let v = load(tmp.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(v.shape(), (1, 2, 2));
        assert_eq!(v[(0, 1, 1)], 7.0);
    }

    #[test]
    fn test_load_errors() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        assert!(matches!(
            load(&missing, &LoaderConfig::default()),
            Err(LoadError::Missing(_))
        ));

        let empty = tempdir().unwrap();
        assert!(matches!(
            load(empty.path(), &LoaderConfig::default()),
            Err(LoadError::Empty(_))
        ));

        let mixed = tempdir().unwrap();
        write_slice(mixed.path(), "a1.png", 4, 3, 0);
        write_slice(mixed.path(), "a2.png", 5, 3, 0);
        match load(mixed.path(), &LoaderConfig::default()) {
            Err(LoadError::InconsistentGeometry {
                expected, found, ..
            }) => {
                assert_eq!(expected, (3, 4));
                assert_eq!(found, (3, 5));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let file = tmp.path().join("volume.raw");
        fs::write(&file, [0u8; 8]).unwrap();
        assert!(matches!(
            load(&file, &LoaderConfig::default()),
            Err(LoadError::Unsupported(_))
        ));
    }

    #[test]
    fn test_load_rejects_bad_spacing_override() {
        let tmp = tempdir().unwrap();
        write_slice(tmp.path(), "0.png", 2, 2, 1);
        for spacing in [[1.0, 0.0, 1.0], [f64::NAN, 1.0, 1.0], [1.0, 1.0, -0.5]] {
            let options = LoaderConfig {
                spacing: Some(spacing),
                ..Default::default()
            };
            match load(tmp.path(), &options) {
                Err(LoadError::InvalidSpacing(found)) => {
                    assert_eq!(found[1..], spacing[1..]);
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
    }
}

//! nifti 文件加载器.

use crate::data::{is_valid_spacing, UNIT_SPACING};
use crate::error::LoadError;
use crate::{Idx3d, Volume};
use ndarray::Array3;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// 文件名是否以 `.nii` 或 `.nii.gz` 结尾?
pub(super) fn is_nifti(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_ascii_lowercase())
        .is_some_and(|n| n.ends_with(".nii") || n.ends_with(".nii.gz"))
}

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn shape_from_header(h: &NiftiHeader) -> Idx3d {
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 从 header 取 `[z, 高, 宽]` 间距. 非法时退回单位间距.
fn spacing_from_header(h: &NiftiHeader) -> [f64; 3] {
    let [_, w, h, z, ..] = h.pixdim;
    let spacing = [z as f64, h as f64, w as f64];
    if is_valid_spacing(&spacing) {
        spacing
    } else {
        log::warn!("nifti header carries invalid spacing {spacing:?}, using unit spacing");
        UNIT_SPACING
    }
}

/// 加载 nifti 文件. `spacing` 给出时覆盖 header 中的值.
pub(super) fn load_file(path: &Path, spacing: Option<[f64; 3]>) -> Result<Volume, LoadError> {
    let nifti_err = |source| LoadError::Nifti {
        path: path.to_owned(),
        source,
    };
    let obj = ReaderOptions::new().read_file(path).map_err(nifti_err)?;
    let header = obj.header().clone();
    if header.dim[0] != 3 {
        return Err(LoadError::NotVolume {
            path: path.to_owned(),
            dims: header.dim[0],
        });
    }

    // [W, H, z] -> [z, H, W].
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = obj
        .into_volume()
        .into_ndarray::<f32>()
        .map_err(nifti_err)?
        .permuted_axes([2, 1, 0].as_slice());
    let data = if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().to_owned()
    };
    let data = Array3::<f32>::from_shape_vec(shape_from_header(&header), data.into_raw_vec())?;

    Ok(Volume::with_spacing(
        data,
        spacing.unwrap_or_else(|| spacing_from_header(&header)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_nifti() {
        assert!(is_nifti(Path::new("/a/b/volume-3.nii")));
        assert!(is_nifti(Path::new("scan.NII.GZ")));
        assert!(!is_nifti(Path::new("scan.png")));
        assert!(!is_nifti(Path::new("nii")));
    }

    #[test]
    fn test_header_geometry() {
        let mut header = NiftiHeader::default();
        header.dim = [3, 4, 5, 6, 1, 1, 1, 1];
        header.pixdim = [1.0, 0.7, 0.8, 2.5, 1.0, 1.0, 1.0, 1.0];
        assert_eq!(shape_from_header(&header), (6, 5, 4));
        let [z, h, w] = spacing_from_header(&header);
        assert!((z - 2.5).abs() < 1e-6 && (h - 0.8).abs() < 1e-6 && (w - 0.7).abs() < 1e-6);

        header.pixdim[1] = 0.0;
        assert_eq!(spacing_from_header(&header), UNIT_SPACING);
    }

    #[test]
    fn test_load_file_reorders_axes() {
        use crate::VolumeAttr;
        use nifti::writer::WriterOptions;

        // 文件中按 (W, H, z) 存放.
        let raw = Array3::from_shape_fn((4, 3, 2), |(w, h, z)| (100 * z + 10 * h + w) as f32);
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("volume.nii");
        WriterOptions::new(&path).write_nifti(&raw).unwrap();

        let v = load_file(&path, None).unwrap();
        assert_eq!(v.shape(), (2, 3, 4));
        assert_eq!(v.spacing(), UNIT_SPACING);
        for ((w, h, z), &expected) in raw.indexed_iter() {
            assert_eq!(v[(z, h, w)], expected, "({z}, {h}, {w})");
        }

        let v = load_file(&path, Some([2.5, 0.7, 0.7])).unwrap();
        assert_eq!(v.spacing(), [2.5, 0.7, 0.7]);
    }
}

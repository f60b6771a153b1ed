//! Native GeoTIFF reading/writing built on the `tiff` crate
//!
//! Georeferencing is carried through the ModelPixelScale / ModelTiepoint
//! tags and the nodata value through the GDAL_NODATA ASCII tag, which is
//! enough for aligned single-band layers.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use num_traits::NumCast;
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{Gray32Float, GrayI32};
use tiff::encoder::compression::{Deflate, Lzw, Uncompressed};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Compression applied to written images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    #[default]
    Lzw,
    Deflate,
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub compression: Compression,
    /// Overrides the raster's own nodata value in the GDAL_NODATA tag
    pub nodata: Option<f64>,
}

/// Read a single-band GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

/// Samples converted to `T`, plus whether any had to be replaced by the
/// fill value.
struct Samples<T> {
    data: Vec<T>,
    filled: bool,
}

/// Convert decoded samples to `T`.
///
/// Samples equal to the source nodata, and samples `T` cannot hold (NaN or
/// out of range), become `fill`.
fn cast_all<S, T>(buf: &[S], source_nodata: Option<f64>, fill: T) -> Samples<T>
where
    S: NumCast + Copy,
    T: RasterElement,
{
    let mut filled = false;
    let data = buf
        .iter()
        .map(|&v| {
            let value: Option<f64> = num_traits::cast(v);
            let is_source_nodata = match (value, source_nodata) {
                (Some(v), Some(nd)) => same_nodata(v, nd),
                _ => false,
            };
            if is_source_nodata {
                return fill;
            }
            match num_traits::cast::<S, T>(v) {
                Some(cast) => cast,
                None => {
                    filled = true;
                    fill
                }
            }
        })
        .collect();
    Samples { data, filled }
}

/// Nodata match that tolerates the tag text having been written from an
/// `f32` value.
fn same_nodata(value: f64, nodata: f64) -> bool {
    if nodata.is_nan() {
        return value.is_nan();
    }
    value == nodata || (value as f32) == (nodata as f32)
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    // A nodata value `T` cannot hold (e.g. -3.4e38 read as i32) maps to the
    // type's default nodata.
    let source_nodata = read_nodata(&mut decoder);
    let target_nodata: Option<T> = source_nodata.and_then(num_traits::cast);
    let fill = target_nodata.unwrap_or_else(T::default_nodata);

    let samples: Samples<T> = match decoder.read_image()? {
        DecodingResult::U8(buf) => cast_all(&buf, source_nodata, fill),
        DecodingResult::U16(buf) => cast_all(&buf, source_nodata, fill),
        DecodingResult::U32(buf) => cast_all(&buf, source_nodata, fill),
        DecodingResult::U64(buf) => cast_all(&buf, source_nodata, fill),
        DecodingResult::I8(buf) => cast_all(&buf, source_nodata, fill),
        DecodingResult::I16(buf) => cast_all(&buf, source_nodata, fill),
        DecodingResult::I32(buf) => cast_all(&buf, source_nodata, fill),
        DecodingResult::I64(buf) => cast_all(&buf, source_nodata, fill),
        DecodingResult::F32(buf) => cast_all(&buf, source_nodata, fill),
        DecodingResult::F64(buf) => cast_all(&buf, source_nodata, fill),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    let Samples { data, filled } = samples;

    // Multi-band images decode interleaved; only the first band is supported.
    if data.len() != rows * cols {
        return Err(Error::UnsupportedDataType(format!(
            "expected a single band of {} samples, found {}",
            rows * cols,
            data.len()
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    if source_nodata.is_some() || filled {
        raster.set_nodata(Some(fill));
    }

    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).ok()?;
    text.trim_matches(char::from(0)).trim().parse().ok()
}

/// Write a Raster to a GeoTIFF file
///
/// Integer rasters are written as signed 32-bit samples, float rasters as
/// 32-bit float.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: &GeoTiffOptions) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options)?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    match options.compression {
        Compression::None => write_image(&mut encoder, raster, options, Uncompressed),
        Compression::Lzw => write_image(&mut encoder, raster, options, Lzw),
        Compression::Deflate => write_image(&mut encoder, raster, options, Deflate::default()),
    }
}

macro_rules! write_geotags {
    ($image:expr, $transform:expr, $nodata:expr) => {{
        let gt = $transform;
        let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
        $image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &scale[..])?;

        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        $image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &tiepoint[..])?;

        // Minimal key directory: GTModelTypeGeoKey = Projected,
        // GTRasterTypeGeoKey = PixelIsArea.
        let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
        $image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), &geokeys[..])?;

        if let Some(nd) = $nodata {
            let text = format!("{}", nd);
            $image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), text.as_str())?;
        }
    }};
}

fn write_image<T, W, D>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster<T>,
    options: &GeoTiffOptions,
    compression: D,
) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
    D: tiff::encoder::compression::Compression,
{
    let (rows, cols) = raster.shape();
    let nodata = options
        .nodata
        .or_else(|| raster.nodata().and_then(|nd| nd.cast_f64()));

    if T::is_float() {
        let data: Vec<f32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
            .collect();
        let mut image = encoder.new_image_with_compression::<Gray32Float, D>(
            cols as u32,
            rows as u32,
            compression,
        )?;
        write_geotags!(image, raster.transform(), nodata);
        image.write_data(&data)?;
    } else {
        let fill = nodata.and_then(|nd| nd.cast_i32()).unwrap_or(i32::MIN);
        let data: Vec<i32> = raster
            .data()
            .iter()
            .map(|&v| v.cast_i32().unwrap_or(fill))
            .collect();
        let mut image = encoder.new_image_with_compression::<GrayI32, D>(
            cols as u32,
            rows as u32,
            compression,
        )?;
        write_geotags!(image, raster.transform(), nodata);
        image.write_data(&data)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Raster<i32> {
        let mut raster =
            Raster::from_rows(&[&[1, 2, 999], &[-999, 4000, 6000]]).unwrap();
        raster.set_transform(GeoTransform::new(500_000.0, 4_650_000.0, 10.0, -10.0));
        raster.set_nodata(Some(999));
        raster
    }

    #[test]
    fn test_buffer_roundtrip_keeps_values_and_georeference() {
        let raster = sample();
        let bytes = write_geotiff_to_buffer(&raster, &GeoTiffOptions::default()).unwrap();
        let back: Raster<i32> = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.data(), raster.data());
        assert_eq!(back.transform(), raster.transform());
        assert_eq!(back.nodata(), Some(999));
    }

    #[test]
    fn test_nodata_override() {
        let raster = sample();
        let options = GeoTiffOptions {
            compression: Compression::None,
            nodata: Some(-999.0),
        };
        let bytes = write_geotiff_to_buffer(&raster, &options).unwrap();
        let back: Raster<i32> = read_geotiff_from_buffer(&bytes).unwrap();
        assert_eq!(back.nodata(), Some(-999));
    }

    #[test]
    fn test_file_roundtrip_deflate() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let raster = sample();
        let options = GeoTiffOptions {
            compression: Compression::Deflate,
            nodata: None,
        };
        write_geotiff(&raster, tmp.path(), &options).unwrap();

        let back: Raster<i32> = read_geotiff(tmp.path()).unwrap();
        assert_eq!(back.data(), raster.data());
    }

    #[test]
    fn test_float_nodata_outside_i32_range_read_as_i32() {
        let mut fdr: Raster<f32> = Raster::from_rows(&[&[-3.402_823_5e38, 1.0, 1.0]]).unwrap();
        fdr.set_nodata(Some(-3.402_823_5e38));
        let bytes = write_geotiff_to_buffer(&fdr, &GeoTiffOptions::default()).unwrap();

        let back: Raster<i32> = read_geotiff_from_buffer(&bytes).unwrap();
        assert_eq!(back.nodata(), Some(i32::MIN));
        assert_eq!(back.get(0, 0).unwrap(), i32::MIN);
        assert_eq!(back.get(0, 1).unwrap(), 1);
        assert!(back.is_nodata(back.get(0, 0).unwrap()));
    }

    #[test]
    fn test_nan_samples_read_as_i32_nodata() {
        let fdr: Raster<f32> = Raster::from_rows(&[&[f32::NAN, 4.0], &[64.0, 1.0]]).unwrap();
        let bytes = write_geotiff_to_buffer(&fdr, &GeoTiffOptions::default()).unwrap();

        let back: Raster<i32> = read_geotiff_from_buffer(&bytes).unwrap();
        assert_eq!(back.nodata(), Some(i32::MIN));
        assert_eq!(back.get(0, 0).unwrap(), i32::MIN);
        assert_eq!(back.get(1, 0).unwrap(), 64);
    }

    #[test]
    fn test_integer_file_without_nodata_keeps_none() {
        let raster = Raster::from_rows(&[&[8, 21], &[6, 8]]).unwrap();
        let bytes = write_geotiff_to_buffer(&raster, &GeoTiffOptions::default()).unwrap();
        let back: Raster<i32> = read_geotiff_from_buffer(&bytes).unwrap();
        assert_eq!(back.nodata(), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result: Result<Raster<i32>> = read_geotiff("/nonexistent/land_cover.tif");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}

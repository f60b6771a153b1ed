//! Reading input grids and writing output grids as GeoTIFF

mod native;

pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, Compression,
    GeoTiffOptions,
};

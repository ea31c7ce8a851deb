pub mod geotiff;
pub mod types;
pub mod utils;
pub mod wells;

pub use geotiff::GeoTiffReader;
pub use types::{DataReader, FileType, PointRecord, PointTable, RasterData, ReadError};
pub use utils::reader_from_filetype;
pub use wells::{WellReader, csv_quote, csv_split};

/// Opens any supported raster for reading.
pub fn create_raster_reader(file_name: &std::path::Path) -> Result<GeoTiffReader, ReadError> {
    match reader_from_filetype(file_name)? {
        FileType::GeoTiff | FileType::AsciiGrid => Ok(GeoTiffReader::new(file_name)),
    }
}

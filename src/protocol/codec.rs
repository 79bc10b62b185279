use std::fs;
use std::io;
use std::path::Path;

use crate::runtime::value::NdArray;

/// Bulk transfer codec for numeric arrays.
///
/// When the configured element-count threshold is exceeded, the marshaler
/// saves the array through this interface and puts only the file location
/// on the wire; the host loads it from there. The host-side reader and
/// this codec must agree on the format, so deployments can swap in their
/// own implementation.
pub trait ArrayCodec {
    fn save(&self, array: &NdArray, location: &Path) -> io::Result<()>;
    fn load(&self, location: &Path) -> io::Result<NdArray>;
    fn delete_file(&self, location: &Path) -> io::Result<()>;
}

/// Default codec: the array's shape and flat data as a JSON document.
#[derive(Debug, Default)]
pub struct JsonArrayCodec;

impl ArrayCodec for JsonArrayCodec {
    fn save(&self, array: &NdArray, location: &Path) -> io::Result<()> {
        let text = serde_json::to_string(array)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(location, text)
    }

    fn load(&self, location: &Path) -> io::Result<NdArray> {
        let text = fs::read_to_string(location)?;
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn delete_file(&self, location: &Path) -> io::Result<()> {
        fs::remove_file(location)
    }
}

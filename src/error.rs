use custom_error::custom_error;

pub type Result<T> = std::result::Result<T, Error>;

custom_error! {pub Error
    Io{source: std::io::Error} = "I/O error: {source}",
    Xml{source: quick_xml::Error} = "XML error: {source}",
    XmlTree{source: roxmltree::Error} = "malformed XML document: {source}",
    Zip{source: zip::result::ZipError} = "KMZ archive error: {source}",
    Utf8{source: std::str::Utf8Error} = "document is not valid UTF-8: {source}",
    NothingToWrite = "nothing to write",
    NoKmlInArchive = "no KML document found in the archive",
    UnsupportedFormat{path: String} = "unsupported file format: {path}",
    Builder{reason: String} = "invalid record: {reason}",
}

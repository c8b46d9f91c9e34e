/// Constants shared by outbound HTTP calls.
pub mod http {
    /// User agent sent with every shape fetch and validation request.
    pub const USER_AGENT: &str = "EarthCube_DataBot/1.0";
    /// Default validation service upload endpoint.
    pub const DEFAULT_VALIDATOR_ENDPOINT: &str = "http://localhost:8080/uploader";
    /// Default per-call deadline in seconds (`0` disables the deadline).
    pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;
}

/// Constants used by the concurrent dispatcher.
pub mod dispatch {
    /// Default number of validation calls allowed in flight at once.
    pub const DEFAULT_CONCURRENCY: usize = 20;
}

/// Constants describing corpus store layout.
pub mod store {
    /// Bucket that holds provisioned shape graphs.
    pub const DEFAULT_SHAPE_BUCKET: &str = "gleaner";
    /// Bucket that receives run outputs.
    pub const DEFAULT_OUTPUT_BUCKET: &str = "gleaner-milled";
    /// Suffix appended to `<runID>/<bucket>` to form the output object name.
    pub const OUTPUT_OBJECT_SUFFIX: &str = "_shacl.nt";
    /// Directory under the filesystem store root that holds in-progress writes.
    pub const STAGING_DIR: &str = ".staging";
}

/// Constants used by the multipart request encoder.
pub mod multipart {
    /// Form field and file part carrying the data graph.
    pub const DATAGRAPH_FIELD: &str = "datagraph";
    /// Form field and file part carrying the shape graph.
    pub const SHAPEGRAPH_FIELD: &str = "shapegraph";
    /// Content type declared on file parts.
    pub const FILE_PART_CONTENT_TYPE: &str = "application/octet-stream";
}

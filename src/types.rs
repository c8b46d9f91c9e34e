/// Name of a corpus store bucket.
/// Examples: `gleaner`, `gleaner-milled`, `summoned-samples`
pub type BucketName = String;
/// Name of an object within a bucket; may contain `/` separators.
/// Example: `run-2024-01/summoned-samples_shacl.nt`
pub type ObjectName = String;
/// Identifier of a harvested data graph (usually its source URL).
/// Example: `https://example.org/dataset/42.jsonld`
pub type DocumentId = String;
/// Stored key of a shape graph, derived from the last segment of its locator.
/// Example: `required.ttl`
pub type ShapeKey = String;
/// Identifier of one mill run, used as the output object prefix.
/// Example: `run-2024-01`
pub type RunId = String;
/// Remote URL or local path that points at shape graph content.
/// Examples: `https://example.org/shapes/required.ttl`, `/data/shapes/local.ttl`
pub type Locator = String;

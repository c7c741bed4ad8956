pub mod artifact;
pub mod identity;
pub mod kind;

pub use artifact::{identify_all, scan_content_dir, ArtifactId, ContentArtifact};
pub use identity::{compute_identity, fingerprint, sha1_hex, sha512_hex, ContentIdentity};
pub use kind::{ContentKind, ContentPolicy, LoaderFilter};

//! Trace entity, annotations, audio assets and the timeline index

pub mod annotation;
pub mod audio;
pub mod timeline;
#[allow(clippy::module_inception)]
pub mod trace;

pub use annotation::{Annotation, AnnotationKind};
pub use audio::{AudioAsset, AudioMimeType};
pub use timeline::{annotations_near, location_at, nearest_location_to, TimelineCursor};
pub use trace::{Trace, TranscriptChunk, Transcription};

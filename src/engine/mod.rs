mod artifact;
mod module;
mod payload;
mod raster;
mod svg;
mod traits;
mod vector;

pub use artifact::{
    ArtifactDelta, PageUpdate, SourceMapping, VectorDocument, VectorItem, VectorLink, VectorPage,
};
pub use module::{EngineModule, VECTOR_MODULE, vector_engine};
pub use payload::{
    AnnotationBox, AnnotationLink, AnnotationList, CreateSessionOptions, DEPRECATED_FORMATS,
    LinkAction, ManipulateAction, PageInfo, PageRenderResult, PagesInfo, RenderPageOptions,
    SUPPORTED_FORMAT, SvgDocument, TextContent, TextItem, WHOLE_DOCUMENT, check_artifact_format,
};
pub use traits::{NativeSession, RenderEngine, RgbaFrame};
pub use vector::{DEFAULT_SESSION_PIXEL_PER_PT, VectorEngine, VectorSession};

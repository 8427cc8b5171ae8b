pub mod bindings;
pub mod client;
pub mod config;
pub mod error;
pub mod multipart;
pub mod routing;
pub mod transport;
pub mod types;

pub use bindings::{InheritBinding, PlainTextBinding, WasmModuleBinding, WorkerBinding};
pub use client::WorkersClient;
pub use error::{Result, TransportError, WorkersError};
pub use transport::{HttpTransport, Transport};
pub use types::{
    ApiResponse, ResponseInfo, WorkerListResponse, WorkerMetaData, WorkerRequestParams,
    WorkerRoute, WorkerRouteResponse, WorkerRoutesResponse, WorkerScript, WorkerScriptParams,
    WorkerScriptResponse,
};

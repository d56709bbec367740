pub mod api;

pub use api::{
    AuditStatusResponse, FindingListQuery, FindingResponse, PagedResponse, StartAuditResponse,
};

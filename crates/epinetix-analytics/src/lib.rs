pub mod error;
pub mod service;
pub mod types;

pub use error::{AnalyticsError, AnalyticsErrorKind};
pub use service::AnalyticsService;
pub use types::{
    DashboardAnalytics, DashboardStats, HotContent, LeadMetrics, LinePoint, SankeyDiagram,
    SankeyLink, SankeyNode, VisitorFilters, VisitorType,
};

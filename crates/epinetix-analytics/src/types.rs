//! On-wire shapes returned by [`crate::service::AnalyticsService`].

use chrono::{DateTime, Utc};
use epinetix_core::HourKey;

/// `visitorType` filter applied before building a Sankey diagram or counting visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitorType {
    #[default]
    All,
    Anonymous,
    Known,
}

/// Filters accepted by `computeSankey` / `getFilteredVisitorCounts`.
#[derive(Debug, Clone, Default)]
pub struct VisitorFilters {
    pub visitor_type: VisitorType,
    pub selected_fingerprint_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SankeyNode {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SankeyLink {
    pub source: u32,
    pub target: u32,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SankeyDiagram {
    pub id: String,
    pub title: String,
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub daily: u64,
    pub weekly: u64,
    pub monthly: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePoint {
    pub hour: HourKey,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotContent {
    pub content_id: String,
    pub total_events: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardAnalytics {
    pub stats: DashboardStats,
    pub line: Vec<LinePoint>,
    pub hot_content: Vec<HotContent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LeadMetrics {
    pub total_visits: u64,
    pub last_activity: Option<DateTime<Utc>>,
    pub first_time_24h: u64,
    pub returning_24h: u64,
    pub known_percentage_24h: f64,
    pub known_percentage_7d: f64,
    pub known_percentage_28d: f64,
    pub total_leads: i64,
}

//! Read-only computation over cached hourly bins: Sankey diagrams, dashboard
//! rollups, lead metrics, and visitor/activity queries.
//!
//! Every method here only reads from [`CacheStore`] (plus the lead
//! repository's known-fingerprint classification); nothing is written back,
//! and nothing touches raw events directly. Given identical cached bins, all
//! methods are deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use epinetix_cache::{CacheStore, GateType};
use epinetix_core::HourKey;
use epinetix_events::EventRepository;
use epinetix_warming::EpinetConfig;

use crate::error::AnalyticsError;
use crate::types::{
    DashboardAnalytics, DashboardStats, HotContent, LeadMetrics, LinePoint, SankeyDiagram,
    SankeyLink, SankeyNode, VisitorFilters, VisitorType,
};

const DAILY_HOURS: i64 = 24;
const WEEKLY_HOURS: i64 = 168;
const MONTHLY_HOURS: i64 = 672;
const MAX_SANKEY_NODES: usize = 60;
const HOT_CONTENT_LIMIT: usize = 10;

/// `(name, step_index, visitor fingerprint ids)` keyed by `nodeId`, merged
/// across every hour in a window.
type NodeMap = BTreeMap<String, (String, u32, BTreeSet<String>)>;

pub struct AnalyticsService {
    cache: Arc<CacheStore>,
    events: EventRepository,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(cache: Arc<CacheStore>, events: EventRepository) -> Self {
        Self { cache, events }
    }

    /// `computeSankey`: node set derived from the endpoints of potential
    /// links between consecutive step pairs, capped at 60 nodes.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if a cache or lead-classification read fails.
    pub async fn compute_sankey(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        title: &str,
        start_hour: &HourKey,
        end_hour: &HourKey,
        filters: &VisitorFilters,
    ) -> Result<SankeyDiagram, AnalyticsError> {
        let mut nodes = self.node_visitors(tenant_id, epinet_id, start_hour, end_hour).await?;
        self.apply_visitor_filter(&mut nodes, filters).await?;

        let mut links: Vec<(String, String, u32)> = Vec::new();
        for (from_id, (_, from_step, from_visitors)) in &nodes {
            for (to_id, (_, to_step, to_visitors)) in &nodes {
                if *to_step != from_step + 1 {
                    continue;
                }
                let overlap = from_visitors.intersection(to_visitors).count();
                if overlap > 0 {
                    links.push((from_id.clone(), to_id.clone(), u32::try_from(overlap).unwrap_or(u32::MAX)));
                }
            }
        }

        let mut endpoint_ids: BTreeSet<String> = BTreeSet::new();
        for (from_id, to_id, _) in &links {
            endpoint_ids.insert(from_id.clone());
            endpoint_ids.insert(to_id.clone());
        }

        if endpoint_ids.len() > MAX_SANKEY_NODES {
            let mut ranked: Vec<(String, usize)> = endpoint_ids
                .iter()
                .map(|id| (id.clone(), nodes.get(id).map_or(0, |(_, _, v)| v.len())))
                .collect();
            ranked.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            let drop_count = endpoint_ids.len() - MAX_SANKEY_NODES;
            let dropped: BTreeSet<String> = ranked.into_iter().take(drop_count).map(|(id, _)| id).collect();
            endpoint_ids.retain(|id| !dropped.contains(id));
            links.retain(|(from_id, to_id, _)| !dropped.contains(from_id) && !dropped.contains(to_id));
        }

        let mut sorted_ids: Vec<String> = endpoint_ids.into_iter().collect();
        sorted_ids.sort_by(|a, b| {
            let name_a = nodes.get(a).map_or("", |(n, _, _)| n.as_str());
            let name_b = nodes.get(b).map_or("", |(n, _, _)| n.as_str());
            name_a.cmp(name_b).then_with(|| a.cmp(b))
        });

        let index_of: BTreeMap<String, u32> = sorted_ids
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, id)| (id, u32::try_from(i).unwrap_or(u32::MAX)))
            .collect();

        let sankey_nodes: Vec<SankeyNode> = sorted_ids
            .iter()
            .map(|id| SankeyNode {
                id: index_of[id],
                name: nodes.get(id).map_or_else(String::new, |(n, _, _)| n.clone()),
            })
            .collect();

        let sankey_links: Vec<SankeyLink> = links
            .into_iter()
            .filter_map(|(from_id, to_id, value)| {
                let source = *index_of.get(&from_id)?;
                let target = *index_of.get(&to_id)?;
                Some(SankeyLink { source, target, value })
            })
            .collect();

        Ok(SankeyDiagram {
            id: epinet_id.to_string(),
            title: title.to_string(),
            nodes: sankey_nodes,
            links: sankey_links,
        })
    }

    /// `computeDashboard`: fixed trailing-window stats, a per-hour line over
    /// the requested range, and the top 10 `StoryFragment` content ids by
    /// event count.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if a cache read fails.
    pub async fn compute_dashboard(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        config: &EpinetConfig,
        start_hour: &HourKey,
        end_hour: &HourKey,
        now: DateTime<Utc>,
    ) -> Result<DashboardAnalytics, AnalyticsError> {
        let current = HourKey::from_datetime(now);
        let daily_start = hours_before(current, DAILY_HOURS - 1);
        let weekly_start = hours_before(current, WEEKLY_HOURS - 1);
        let monthly_start = hours_before(current, MONTHLY_HOURS - 1);

        let stats = DashboardStats {
            daily: self.unique_visitor_count(tenant_id, epinet_id, &daily_start, &current).await?,
            weekly: self.unique_visitor_count(tenant_id, epinet_id, &weekly_start, &current).await?,
            monthly: self.unique_visitor_count(tenant_id, epinet_id, &monthly_start, &current).await?,
        };

        let mut line = Vec::new();
        let mut content_counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut hour = *start_hour;
        loop {
            if let Some(bin) = self.cache.get_hourly_bin(tenant_id, epinet_id, &hour.to_string()).await? {
                let mut hour_events: u64 = 0;
                for (node_id, info) in bin.steps() {
                    hour_events += u64::try_from(info.visitors.len()).unwrap_or(u64::MAX);
                    if is_story_fragment_step(config, info.step_index) {
                        if let Some(content_id) = node_id.rsplit('_').next() {
                            *content_counts.entry(content_id.to_string()).or_insert(0) +=
                                u64::try_from(info.visitors.len()).unwrap_or(u64::MAX);
                        }
                    }
                }
                line.push(LinePoint { hour, count: hour_events });
            } else {
                line.push(LinePoint { hour, count: 0 });
            }
            if hour == *end_hour {
                break;
            }
            hour = hour.next();
        }

        let mut hot_content: Vec<HotContent> = content_counts
            .into_iter()
            .map(|(content_id, total_events)| HotContent { content_id, total_events })
            .collect();
        hot_content.sort_by(|a, b| b.total_events.cmp(&a.total_events).then_with(|| a.content_id.cmp(&b.content_id)));
        hot_content.truncate(HOT_CONTENT_LIMIT);

        Ok(DashboardAnalytics { stats, line, hot_content })
    }

    /// `computeLeadMetrics`: visitor sets for the fixed trailing windows,
    /// split by known/anonymous, plus the requested range's visit/lead totals.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if a cache or lead read fails.
    pub async fn compute_lead_metrics(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        start_hour: &HourKey,
        end_hour: &HourKey,
        now: DateTime<Utc>,
    ) -> Result<LeadMetrics, AnalyticsError> {
        let current = HourKey::from_datetime(now);
        let day_start = hours_before(current, DAILY_HOURS - 1);
        let week_start = hours_before(current, WEEKLY_HOURS - 1);
        let month_start = hours_before(current, MONTHLY_HOURS - 1);

        let known = self.events.known_fingerprint_ids().await?;

        let day_visitors = self.unique_visitor_set(tenant_id, epinet_id, &day_start, &current).await?;
        let week_visitors = self.unique_visitor_set(tenant_id, epinet_id, &week_start, &current).await?;
        let month_visitors = self.unique_visitor_set(tenant_id, epinet_id, &month_start, &current).await?;

        let known_percentage_24h = percentage(day_visitors.intersection(&known).count(), day_visitors.len());
        let known_percentage_7d = percentage(week_visitors.intersection(&known).count(), week_visitors.len());
        let known_percentage_28d = percentage(month_visitors.intersection(&known).count(), month_visitors.len());

        // "Returning" means seen earlier in the trailing month, outside the
        // last 24h; "first time" means seen only within the last 24h.
        let prior_to_today = if day_start == month_start {
            BTreeSet::new()
        } else {
            self.unique_visitor_set(tenant_id, epinet_id, &month_start, &day_start.previous()).await?
        };
        let returning_24h = day_visitors.intersection(&prior_to_today).count();
        let first_time_24h = day_visitors.len().saturating_sub(returning_24h);

        let requested = self.unique_visitor_set(tenant_id, epinet_id, start_hour, end_hour).await?;
        let last_activity = self.last_activity(tenant_id, epinet_id, start_hour, end_hour).await?;
        let total_leads = self.events.count_leads().await?;

        Ok(LeadMetrics {
            total_visits: u64::try_from(requested.len()).unwrap_or(u64::MAX),
            last_activity,
            first_time_24h: u64::try_from(first_time_24h).unwrap_or(u64::MAX),
            returning_24h: u64::try_from(returning_24h).unwrap_or(u64::MAX),
            known_percentage_24h,
            known_percentage_7d,
            known_percentage_28d,
            total_leads,
        })
    }

    /// `getFilteredVisitorCounts`: per-node visitor count after filtering,
    /// sorted by count descending then node id ascending.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if a cache or lead read fails.
    pub async fn get_filtered_visitor_counts(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        start_hour: &HourKey,
        end_hour: &HourKey,
        filters: &VisitorFilters,
    ) -> Result<Vec<(String, u32)>, AnalyticsError> {
        let mut nodes = self.node_visitors(tenant_id, epinet_id, start_hour, end_hour).await?;
        self.apply_visitor_filter(&mut nodes, filters).await?;

        let mut counts: Vec<(String, u32)> = nodes
            .into_iter()
            .map(|(node_id, (_, _, visitors))| (node_id, u32::try_from(visitors.len()).unwrap_or(u32::MAX)))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }

    /// `getHourlyNodeActivity`: one node's visitor count per hour in the range.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError`] if a cache read fails.
    pub async fn get_hourly_node_activity(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        node_id: &str,
        start_hour: &HourKey,
        end_hour: &HourKey,
    ) -> Result<Vec<LinePoint>, AnalyticsError> {
        let mut points = Vec::new();
        let mut hour = *start_hour;
        loop {
            let count = match self.cache.get_hourly_bin(tenant_id, epinet_id, &hour.to_string()).await? {
                Some(bin) => bin.step(node_id).map_or(0, |info| info.visitors.len()),
                None => 0,
            };
            points.push(LinePoint { hour, count: u64::try_from(count).unwrap_or(u64::MAX) });
            if hour == *end_hour {
                break;
            }
            hour = hour.next();
        }
        Ok(points)
    }

    async fn node_visitors(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        start_hour: &HourKey,
        end_hour: &HourKey,
    ) -> Result<NodeMap, AnalyticsError> {
        let mut nodes: NodeMap = BTreeMap::new();
        let mut hour = *start_hour;
        loop {
            if let Some(bin) = self.cache.get_hourly_bin(tenant_id, epinet_id, &hour.to_string()).await? {
                for (node_id, info) in bin.steps() {
                    let entry = nodes
                        .entry(node_id.clone())
                        .or_insert_with(|| (info.name.clone(), info.step_index, BTreeSet::new()));
                    entry.2.extend(info.visitors.iter().cloned());
                }
            }
            if hour == *end_hour {
                break;
            }
            hour = hour.next();
        }
        Ok(nodes)
    }

    async fn unique_visitor_set(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        start_hour: &HourKey,
        end_hour: &HourKey,
    ) -> Result<BTreeSet<String>, AnalyticsError> {
        let nodes = self.node_visitors(tenant_id, epinet_id, start_hour, end_hour).await?;
        let mut all = BTreeSet::new();
        for (_, _, visitors) in nodes.values() {
            all.extend(visitors.iter().cloned());
        }
        Ok(all)
    }

    async fn unique_visitor_count(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        start_hour: &HourKey,
        end_hour: &HourKey,
    ) -> Result<u64, AnalyticsError> {
        let set = self.unique_visitor_set(tenant_id, epinet_id, start_hour, end_hour).await?;
        Ok(u64::try_from(set.len()).unwrap_or(u64::MAX))
    }

    async fn last_activity(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        start_hour: &HourKey,
        end_hour: &HourKey,
    ) -> Result<Option<DateTime<Utc>>, AnalyticsError> {
        let mut hour = *end_hour;
        loop {
            if let Some(bin) = self.cache.get_hourly_bin(tenant_id, epinet_id, &hour.to_string()).await? {
                if !bin.steps().is_empty() {
                    return Ok(Some(hour.start()));
                }
            }
            if hour == *start_hour {
                break;
            }
            hour = hour.previous();
        }
        Ok(None)
    }

    async fn apply_visitor_filter(
        &self,
        nodes: &mut NodeMap,
        filters: &VisitorFilters,
    ) -> Result<(), AnalyticsError> {
        if let Some(fingerprint_id) = &filters.selected_fingerprint_id {
            for (_, _, visitors) in nodes.values_mut() {
                visitors.retain(|v| v == fingerprint_id);
            }
            return Ok(());
        }
        match filters.visitor_type {
            VisitorType::All => {}
            VisitorType::Known | VisitorType::Anonymous => {
                let known = self.events.known_fingerprint_ids().await?;
                let want_known = filters.visitor_type == VisitorType::Known;
                for (_, _, visitors) in nodes.values_mut() {
                    visitors.retain(|v| known.contains(v) == want_known);
                }
            }
        }
        Ok(())
    }
}

fn hours_before(hour: HourKey, n: i64) -> HourKey {
    let mut h = hour;
    for _ in 0..n {
        h = h.previous();
    }
    h
}

fn is_story_fragment_step(config: &EpinetConfig, step_index: u32) -> bool {
    let Ok(position) = usize::try_from(step_index.saturating_sub(1)) else {
        return false;
    };
    config.steps.get(position).is_some_and(|step| {
        matches!(step.gate_type, GateType::CommitmentAction | GateType::ConversionAction)
            && step.object_type.as_deref() == Some("StoryFragment")
    })
}

#[must_use]
#[allow(clippy::as_conversions)]
fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

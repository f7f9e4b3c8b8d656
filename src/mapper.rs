use crate::loader::Record;
use crate::tracker::LogisticRow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One week of KPI figures for a group
///
/// Recomputed from the weekly sheet on every API call; never persisted
/// server-side. `total_deals` is always derived from `offers_sent +
/// in_sales_process`, even when the sheet carries its own (possibly stale)
/// total column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyReport {
    pub group: String,
    pub week: String,
    pub date: String,
    pub in_sales_process: i64,
    pub offers_sent: i64,
    pub weekly_sales_eur: f64,
    pub total_sales_eur: f64,
    pub active_companies: i64,
    pub mega_deals: i64,
    pub in_technical: i64,
    pub last_meeting: String,
    pub weekly_trips: i64,
    pub in_supply: i64,
    pub total_deals: i64,
}

/// A group member as listed on the members sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub group: String,
    pub name: String,
    pub role: String,
}

/// A deal still in execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub group: String,
    pub deal: String,
    pub responsible: String,
    pub status: String,
    pub amount_eur: f64,
    pub active: String,
}

/// KPI-only projection of a weekly report, used for trend charts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub week: String,
    pub date: String,
    pub weekly_sales_eur: f64,
    pub total_sales_eur: f64,
    pub offers_sent: i64,
    pub in_sales_process: i64,
    pub total_deals: i64,
}

/// The canonical `/api/data` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    pub groups: Vec<String>,
    pub weekly: Vec<WeeklyReport>,
    pub members: HashMap<String, Vec<Member>>,
    pub latest: HashMap<String, WeeklyReport>,
    pub deals_exec: Vec<Deal>,
    pub history: HashMap<String, Vec<HistoryPoint>>,
    pub ceo_messages: HashMap<String, String>,
}

/// The `/api/technical` payload: generic rows, the most recent row, and the
/// logistics tracker rows derived from the same sheet
#[derive(Debug, Clone, Serialize)]
pub struct TechnicalPayload {
    pub rows: Vec<Value>,
    pub latest: Option<Value>,
    pub logistics: Vec<LogisticRow>,
    pub ceo_message: String,
}

/// The `/api/supply` payload
#[derive(Debug, Clone, Serialize)]
pub struct SupplyPayload {
    pub rows: Vec<Value>,
    pub latest: Option<Value>,
}

// Header alias tables. Sheet columns are maintained by non-engineers and
// drift in spelling; each canonical field lists the accepted headers in
// priority order. Matching happens on normalized header text.
const GROUP: &[&str] = &["group", "group_name", "team"];
const WEEK: &[&str] = &["week", "week_no", "week_number"];
const DATE: &[&str] = &["date", "report_date"];
const IN_SALES_PROCESS: &[&str] = &["in_sales_process", "sales_process", "in_sales"];
const OFFERS_SENT: &[&str] = &["offers_sent", "offers", "sent_offers"];
const WEEKLY_SALES_EUR: &[&str] = &["weekly_sales_eur", "weekly_sales", "sales_eur"];
const TOTAL_SALES_EUR: &[&str] = &["total_sales_eur", "total_sales"];
const ACTIVE_COMPANIES: &[&str] = &["active_companies", "companies"];
const MEGA_DEALS: &[&str] = &["mega_deals", "mega"];
const IN_TECHNICAL: &[&str] = &["in_technical", "technical"];
const LAST_MEETING: &[&str] = &["last_meeting", "meeting"];
const WEEKLY_TRIPS: &[&str] = &["weekly_trips", "trips"];
const IN_SUPPLY: &[&str] = &["in_supply", "supply"];

const NAME: &[&str] = &["name", "member", "member_name"];
const ROLE: &[&str] = &["role", "position", "title"];

const DEAL: &[&str] = &["deal", "deal_name", "project"];
const RESPONSIBLE: &[&str] = &["responsible", "owner", "person"];
const STATUS: &[&str] = &["status", "state", "stage"];
const AMOUNT_EUR: &[&str] = &["amount_eur", "amount", "value_eur", "value"];
const ACTIVE: &[&str] = &["active", "is_active"];

const MESSAGE: &[&str] = &["message", "msg", "text", "note"];

const DEAL_NUMBER: &[&str] = &["deal_number", "deal_no", "deal"];
const PLANE: &[&str] = &[
    "plane_dispatch_within_2_months",
    "plane_dispatch_within_2_month",
    "plane_dispatch",
    "dispatch",
];
const IRAN: &[&str] = &[
    "on_the_way_to_iran_within_1_month",
    "on_the_way_to_iran",
    "on_the_way",
];
const CUSTOMS: &[&str] = &[
    "customs_within_2_week",
    "customs_within_2_weeks",
    "customs",
];

// Case-insensitive substring matches against the lowercased deal status.
// A deal whose status contains any of these is no longer in execution.
const CLOSED_WORDS: &[&str] = &["delivered", "closed", "done", "completed", "تحویل", "تکمیل"];

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

// Index a record by normalized header so alias lookups are O(1) per try.
fn normalized(record: &Record) -> HashMap<String, &str> {
    record
        .iter()
        .map(|(k, v)| (normalize_header(k), v.as_str()))
        .collect()
}

fn text(norm: &HashMap<String, &str>, aliases: &[&str]) -> String {
    for alias in aliases {
        if let Some(v) = norm.get(*alias) {
            if !v.trim().is_empty() {
                return v.trim().to_string();
            }
        }
    }
    String::new()
}

// Tolerant numeric parse: sheets carry thousands separators, currency
// symbols and stray spaces. Falls back to 0.
fn number(norm: &HashMap<String, &str>, aliases: &[&str]) -> f64 {
    let raw = text(norm, aliases);
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

fn count(norm: &HashMap<String, &str>, aliases: &[&str]) -> i64 {
    number(norm, aliases) as i64
}

/// Map raw weekly sheet rows into weekly reports
///
/// Group keys are uppercased; rows without a resolvable group are dropped.
/// `total_deals` is derived, never read from the sheet.
pub fn map_weekly(records: &[Record]) -> Vec<WeeklyReport> {
    records
        .iter()
        .filter_map(|record| {
            let norm = normalized(record);
            let group = text(&norm, GROUP).to_uppercase();
            if group.is_empty() {
                return None;
            }
            let in_sales_process = count(&norm, IN_SALES_PROCESS);
            let offers_sent = count(&norm, OFFERS_SENT);
            Some(WeeklyReport {
                group,
                week: text(&norm, WEEK),
                date: text(&norm, DATE),
                in_sales_process,
                offers_sent,
                weekly_sales_eur: number(&norm, WEEKLY_SALES_EUR),
                total_sales_eur: number(&norm, TOTAL_SALES_EUR),
                active_companies: count(&norm, ACTIVE_COMPANIES),
                mega_deals: count(&norm, MEGA_DEALS),
                in_technical: count(&norm, IN_TECHNICAL),
                last_meeting: text(&norm, LAST_MEETING),
                weekly_trips: count(&norm, WEEKLY_TRIPS),
                in_supply: count(&norm, IN_SUPPLY),
                total_deals: offers_sent + in_sales_process,
            })
        })
        .collect()
}

/// Map member sheet rows, grouped by group key
pub fn map_members(records: &[Record]) -> HashMap<String, Vec<Member>> {
    let mut members: HashMap<String, Vec<Member>> = HashMap::new();
    for record in records {
        let norm = normalized(record);
        let group = text(&norm, GROUP).to_uppercase();
        if group.is_empty() {
            continue;
        }
        members.entry(group.clone()).or_default().push(Member {
            group,
            name: text(&norm, NAME),
            role: text(&norm, ROLE),
        });
    }
    members
}

/// Map the groups sheet to an ordered, deduplicated list of group keys
pub fn map_groups(records: &[Record]) -> Vec<String> {
    let mut groups = Vec::new();
    for record in records {
        let norm = normalized(record);
        let group = text(&norm, GROUP).to_uppercase();
        if !group.is_empty() && !groups.contains(&group) {
            groups.push(group);
        }
    }
    groups
}

/// Resolve the latest snapshot per group
///
/// When the explicit latest sheet has rows, those win (last row per group).
/// Otherwise the weekly rows are sorted ascending by `(date, week)` — plain
/// string comparison, stable, ties on date broken by week — and the last row
/// of each group is taken. Input order never affects the result.
pub fn map_latest(
    latest_records: &[Record],
    weekly: &[WeeklyReport],
) -> HashMap<String, WeeklyReport> {
    let explicit = map_weekly(latest_records);
    if !explicit.is_empty() {
        let mut latest = HashMap::new();
        for report in explicit {
            latest.insert(report.group.clone(), report);
        }
        return latest;
    }

    let mut sorted: Vec<&WeeklyReport> = weekly.iter().collect();
    sorted.sort_by(|a, b| (&a.date, &a.week).cmp(&(&b.date, &b.week)));

    let mut latest = HashMap::new();
    for report in sorted {
        latest.insert(report.group.clone(), report.clone());
    }
    latest
}

/// Map and filter the deals sheet down to deals still in execution
///
/// A deal is excluded when `active` is exactly the string `"0"`, or when its
/// status contains (case-insensitively) any closed word. Substring match, so
/// "Completed - awaiting signature" is still excluded.
pub fn map_deals(records: &[Record]) -> Vec<Deal> {
    records
        .iter()
        .filter_map(|record| {
            let norm = normalized(record);
            let group = text(&norm, GROUP).to_uppercase();
            if group.is_empty() {
                return None;
            }
            let status = text(&norm, STATUS);
            let active = text(&norm, ACTIVE);
            if active == "0" {
                return None;
            }
            let lowered = status.to_lowercase();
            if CLOSED_WORDS.iter().any(|word| lowered.contains(word)) {
                return None;
            }
            Some(Deal {
                group,
                deal: text(&norm, DEAL),
                responsible: text(&norm, RESPONSIBLE),
                status,
                amount_eur: number(&norm, AMOUNT_EUR),
                active,
            })
        })
        .collect()
}

/// Build per-group trend history: the last 12 chronologically sorted weekly
/// rows, projected to the KPI subset
pub fn build_history(weekly: &[WeeklyReport]) -> HashMap<String, Vec<HistoryPoint>> {
    let mut by_group: HashMap<String, Vec<&WeeklyReport>> = HashMap::new();
    for report in weekly {
        by_group.entry(report.group.clone()).or_default().push(report);
    }

    let mut history = HashMap::new();
    for (group, mut reports) in by_group {
        reports.sort_by(|a, b| (&a.date, &a.week).cmp(&(&b.date, &b.week)));
        let points = reports
            .iter()
            .rev()
            .take(12)
            .rev()
            .map(|r| HistoryPoint {
                week: r.week.clone(),
                date: r.date.clone(),
                weekly_sales_eur: r.weekly_sales_eur,
                total_sales_eur: r.total_sales_eur,
                offers_sent: r.offers_sent,
                in_sales_process: r.in_sales_process,
                total_deals: r.total_deals,
            })
            .collect();
        history.insert(group, points);
    }
    history
}

/// Map CEO message rows to a group → message table (last row per group wins)
pub fn map_ceo_messages(records: &[Record]) -> HashMap<String, String> {
    let mut messages = HashMap::new();
    for record in records {
        let norm = normalized(record);
        let group = text(&norm, GROUP).to_uppercase();
        if group.is_empty() {
            continue;
        }
        messages.insert(group, text(&norm, MESSAGE));
    }
    messages
}

/// Assemble the canonical payload from the six raw sheet-row sequences
pub fn build_payload(
    weekly_records: &[Record],
    members_records: &[Record],
    latest_records: &[Record],
    groups_records: &[Record],
    deals_records: &[Record],
    ceo_records: &[Record],
) -> Payload {
    let weekly = map_weekly(weekly_records);
    let latest = map_latest(latest_records, &weekly);
    let history = build_history(&weekly);
    Payload {
        groups: map_groups(groups_records),
        members: map_members(members_records),
        deals_exec: map_deals(deals_records),
        ceo_messages: map_ceo_messages(ceo_records),
        latest,
        history,
        weekly,
    }
}

// Project a record to a JSON object keyed by normalized headers, so the
// client sees stable field names regardless of sheet spelling.
fn record_to_value(record: &Record) -> Value {
    let mut object = serde_json::Map::new();
    for (k, v) in record {
        object.insert(normalize_header(k), Value::String(v.clone()));
    }
    Value::Object(object)
}

/// Extract logistics tracker rows from technical sheet records
///
/// Rows with neither a deal number nor any phase field are skipped; the
/// tracker has nothing to key or count on them.
pub fn map_logistics(records: &[Record]) -> Vec<LogisticRow> {
    records
        .iter()
        .filter_map(|record| {
            let norm = normalized(record);
            let row = LogisticRow {
                deal_number: text(&norm, DEAL_NUMBER),
                plane: text(&norm, PLANE),
                iran: text(&norm, IRAN),
                customs: text(&norm, CUSTOMS),
            };
            if row.deal_number.is_empty()
                && row.plane.is_empty()
                && row.iran.is_empty()
                && row.customs.is_empty()
            {
                return None;
            }
            Some(row)
        })
        .collect()
}

/// Shape the technical sheet for `/api/technical`
pub fn map_technical(records: &[Record], ceo_message: String) -> TechnicalPayload {
    let rows: Vec<Value> = records.iter().map(record_to_value).collect();
    TechnicalPayload {
        latest: rows.last().cloned(),
        logistics: map_logistics(records),
        rows,
        ceo_message,
    }
}

/// Shape the supply sheet for `/api/supply`
pub fn map_supply(records: &[Record]) -> SupplyPayload {
    let rows: Vec<Value> = records.iter().map(record_to_value).collect();
    SupplyPayload {
        latest: rows.last().cloned(),
        rows,
    }
}

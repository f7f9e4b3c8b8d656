use salesboard::loader::parse_csv;
use salesboard::mapper::{self, Payload};
use salesboard::store::{MemoryStore, StatusStore};
use salesboard::tracker;

const WEEKLY_CSV: &str = "\
Group,Week,Date,Offers_Sent,In_Sales_Process,Weekly_Sales_EUR,Total_Sales_EUR,Active_Companies\n\
a,21,2024-05-19,4,6,\"42,000\",318000,11\n\
A,22,2024-05-26,3,7,18500,336500,12\n\
b,22,2024-05-26,5,4,27400,254900,9\n\
,23,2024-06-02,1,1,0,0,0\n";

const MEMBERS_CSV: &str = "group,name,role\nA,M. Rahimi,Lead\nA,S. Karimi,Sales\nB,A. Mousavi,Lead\n";

const GROUPS_CSV: &str = "group\nA\nB\na\n";

const DEALS_CSV: &str = "\
group,deal,responsible,status,amount_eur,active\n\
A,Dairy line,S. Karimi,In progress,120000,1\n\
A,Old deal,S. Karimi,Delivered to client,50000,1\n\
B,Retrofit,N. Ahmadi,Completed - awaiting signature,64000,1\n\
B,Paused deal,N. Ahmadi,In progress,10000,0\n";

const CEO_CSV: &str = "group,message\nA,Push the mega deals.\nTECHNICAL,Clear the customs backlog.\n";

fn build() -> Payload {
    mapper::build_payload(
        &parse_csv(WEEKLY_CSV),
        &parse_csv(MEMBERS_CSV),
        &[],
        &parse_csv(GROUPS_CSV),
        &parse_csv(DEALS_CSV),
        &parse_csv(CEO_CSV),
    )
}

#[test]
fn payload_shapes_all_sections() {
    let payload = build();

    assert_eq!(payload.groups, vec!["A", "B"]);
    // Groupless weekly row dropped, groups case-normalized
    assert_eq!(payload.weekly.len(), 3);
    assert!(payload.weekly.iter().all(|w| w.group == "A" || w.group == "B"));

    assert_eq!(payload.members["A"].len(), 2);
    assert_eq!(payload.ceo_messages["A"], "Push the mega deals.");
}

#[test]
fn latest_snapshot_per_group() {
    let payload = build();
    assert_eq!(payload.latest["A"].week, "22");
    assert_eq!(payload.latest["A"].total_sales_eur, 336500.0);
    assert_eq!(payload.latest["B"].week, "22");
}

#[test]
fn derived_totals_and_separator_parsing() {
    let payload = build();
    let week21 = payload
        .weekly
        .iter()
        .find(|w| w.group == "A" && w.week == "21")
        .unwrap();
    assert_eq!(week21.weekly_sales_eur, 42000.0);
    assert_eq!(week21.total_deals, 10);
}

#[test]
fn only_open_deals_survive() {
    let payload = build();
    assert_eq!(payload.deals_exec.len(), 1);
    assert_eq!(payload.deals_exec[0].deal, "Dairy line");
}

#[test]
fn history_projected_per_group() {
    let payload = build();
    assert_eq!(payload.history["A"].len(), 2);
    assert_eq!(payload.history["A"][0].week, "21");
    assert_eq!(payload.history["A"][1].week, "22");
}

#[test]
fn payload_round_trips_through_json() {
    let payload = build();
    let value = serde_json::to_value(&payload).unwrap();
    let back: Payload = serde_json::from_value(value).unwrap();
    assert_eq!(back.weekly, payload.weekly);
}

const TECH_CSV: &str = "\
deal_number,plane_dispatch_within_2_months,on_the_way_to_iran_within_1_month,customs_within_2_week,notes\n\
D-100,2024-05-01/D-100,yes,,on schedule\n\
D-101,,,-,waiting\n";

#[test]
fn technical_pipeline_with_tracker_store() {
    let records = parse_csv(TECH_CSV);
    let payload = mapper::map_technical(&records, "Clear the customs backlog.".to_string());

    assert_eq!(payload.rows.len(), 2);
    assert_eq!(payload.logistics.len(), 2);
    assert_eq!(payload.ceo_message, "Clear the customs backlog.");

    let mut store = MemoryStore::default();
    let t0 = 1_700_000_000_000;

    let (statuses, next) = tracker::recompute(&payload.logistics, &store.load(), t0);
    store.save(&next);
    assert!(statuses[0].plane.active);
    assert!(statuses[0].iran.active);
    assert!(!statuses[0].customs.active);
    assert!(!statuses[1].plane.active);

    // Ten days later the anchors persist through the store
    let t1 = t0 + 10 * 86_400_000;
    let (statuses, next) = tracker::recompute(&payload.logistics, &store.load(), t1);
    store.save(&next);
    assert_eq!(statuses[0].plane.age_days, Some(10));
    assert_eq!(statuses[0].plane.remaining_days, Some(50));
    assert_eq!(statuses[0].iran.remaining_days, Some(20));
}

#[test]
fn sample_payload_matches_canonical_shape() {
    let sample = salesboard::fetcher::sample_payload();
    let payload: Payload = serde_json::from_value(sample).unwrap();
    assert!(!payload.groups.is_empty());
    for report in &payload.weekly {
        assert_eq!(report.total_deals, report.offers_sent + report.in_sales_process);
    }
}

//! Integration tests for `SqliteStore` against an in-memory database.

use std::{collections::BTreeMap, time::Duration};

use chrono::{NaiveDate, NaiveDateTime};
use ktm_core::{
  filter::Page,
  project::{NewProject, Project},
  report::NewReport,
  store::{ProjectQuery, ReportQuery, StoreError as _, TransparencyStore},
};
use uuid::Uuid;

use crate::{SCHEMA_VERSION, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
  NaiveDate::from_ymd_opt(y, m, d)
    .unwrap()
    .and_hms_opt(0, 0, 0)
    .unwrap()
}

async fn project(
  s: &SqliteStore,
  title: &str,
  agency: Option<&str>,
  district: Option<&str>,
  sector: Option<&str>,
  tender_date: Option<NaiveDateTime>,
) -> Project {
  let agency_id = match agency {
    Some(name) => Some(s.get_or_create_agency(name.into()).await.unwrap().id),
    None => None,
  };
  s.insert_project(NewProject {
    title: title.into(),
    district: district.map(Into::into),
    sector: sector.map(Into::into),
    tender_date,
    agency_id,
    ..Default::default()
  })
  .await
  .unwrap()
}

fn report(district: Option<&str>, status: Option<&str>) -> NewReport {
  NewReport {
    district: district.map(Into::into),
    status_flag: status.map(Into::into),
    ..Default::default()
  }
}

fn projects_query(text: Option<&str>, district: Option<&str>) -> ProjectQuery {
  ProjectQuery {
    text:     text.map(Into::into),
    district: district.map(Into::into),
    page:     Page::default(),
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn migrate_is_idempotent() {
  let s = store().await;
  assert_eq!(s.schema_version().await.unwrap(), SCHEMA_VERSION);
  s.migrate().await.unwrap();
  assert_eq!(s.schema_version().await.unwrap(), SCHEMA_VERSION);
}

// ─── Agencies ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_or_create_agency_dedups_by_exact_name() {
  let s = store().await;
  let a = s.get_or_create_agency("Department of Roads".into()).await.unwrap();
  let b = s.get_or_create_agency("Department of Roads".into()).await.unwrap();
  let c = s.get_or_create_agency("department of roads".into()).await.unwrap();

  assert_eq!(a.id, b.id);
  assert_ne!(a.id, c.id);
  assert_eq!(s.list_agencies(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn list_agencies_by_district_collapses_duplicates() {
  let s = store().await;
  project(&s, "Bridge A", Some("DoR"), Some("Bhaktapur"), None, None).await;
  project(&s, "Bridge B", Some("DoR"), Some("bhaktapur"), None, None).await;
  project(&s, "Canal", Some("Irrigation"), Some("Lalitpur"), None, None).await;
  project(&s, "Water", Some("KUKL"), Some("BHAKTAPUR"), None, None).await;

  let agencies = s.list_agencies(Some("Bhaktapur".into())).await.unwrap();
  let names: Vec<_> = agencies.iter().map(|a| a.name.as_str()).collect();
  assert_eq!(names, ["DoR", "KUKL"]);

  let all = s.list_agencies(None).await.unwrap();
  assert_eq!(all.len(), 3);
  assert!(all.windows(2).all(|w| w[0].id < w[1].id));
}

// ─── Projects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_project_resolves_agency() {
  let s = store().await;
  let p = project(&s, "Ring Road", Some("DoR"), Some("Kathmandu"), None, None).await;

  let fetched = s.get_project(p.id).await.unwrap().unwrap();
  assert_eq!(fetched, p);
  assert_eq!(fetched.agency.unwrap().name, "DoR");
}

#[tokio::test]
async fn tender_date_keeps_microseconds() {
  let s = store().await;
  let tender = NaiveDate::from_ymd_opt(2024, 1, 9)
    .unwrap()
    .and_hms_micro_opt(14, 5, 7, 250_001)
    .unwrap();
  let p = project(&s, "Bus park", None, None, None, Some(tender)).await;

  let fetched = s.get_project(p.id).await.unwrap().unwrap();
  assert_eq!(fetched.tender_date, Some(tender));
}

#[tokio::test]
async fn get_project_missing_returns_none() {
  let s = store().await;
  assert!(s.get_project(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn project_without_agency_is_listed() {
  let s = store().await;
  project(&s, "Orphan works", None, Some("Kathmandu"), None, None).await;

  let all = s.list_projects(&ProjectQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(all[0].agency.is_none());
}

#[tokio::test]
async fn district_filter_is_case_insensitive_exact() {
  let s = store().await;
  project(&s, "A", None, Some("Kathmandu"), None, None).await;
  project(&s, "B", None, Some("KATHMANDU"), None, None).await;
  project(&s, "C", None, Some("Kathmandu Metro"), None, None).await;
  project(&s, "D", None, None, None, None).await;

  let found = s
    .list_projects(&projects_query(None, Some("kathmandu")))
    .await
    .unwrap();
  assert_eq!(found.len(), 2);
  assert!(
    found
      .iter()
      .all(|p| p.district.as_deref().map(ktm_core::fold).as_deref() == Some("kathmandu"))
  );
}

#[tokio::test]
async fn text_filter_matches_title_or_agency_name() {
  let s = store().await;
  project(&s, "Bagmati Bridge", Some("DoR"), None, None, None).await;
  project(&s, "School roof", Some("Bridge Authority"), None, None, None).await;
  project(&s, "Water tank", None, None, None, None).await;
  project(&s, "Canal", Some("Irrigation"), None, None, None).await;

  let found = s.list_projects(&projects_query(Some("BRIDGE"), None)).await.unwrap();
  let mut titles: Vec<_> = found.iter().map(|p| p.title.as_str()).collect();
  titles.sort();
  assert_eq!(titles, ["Bagmati Bridge", "School roof"]);
}

#[tokio::test]
async fn text_filter_is_substring_not_pattern() {
  let s = store().await;
  project(&s, "100% complete", None, None, None, None).await;
  project(&s, "1000 metres", None, None, None, None).await;

  let found = s.list_projects(&projects_query(Some("0%"), None)).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].title, "100% complete");
}

#[tokio::test]
async fn filters_combine_with_and() {
  let s = store().await;
  project(&s, "Road A", None, Some("Lalitpur"), None, None).await;
  project(&s, "Road B", None, Some("Bhaktapur"), None, None).await;
  project(&s, "Canal", None, Some("Lalitpur"), None, None).await;

  let found = s
    .list_projects(&projects_query(Some("road"), Some("LALITPUR")))
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].title, "Road A");
}

#[tokio::test]
async fn undated_projects_sort_last_across_pages() {
  let s = store().await;
  project(&s, "undated 1", None, None, None, None).await;
  project(&s, "old", None, None, None, Some(date(2021, 1, 5))).await;
  project(&s, "undated 2", None, None, None, None).await;
  project(&s, "new", None, None, None, Some(date(2023, 6, 1))).await;
  project(&s, "mid", None, None, None, Some(date(2022, 3, 9))).await;

  let all = s.list_projects(&ProjectQuery::default()).await.unwrap();
  let titles: Vec<_> = all.iter().take(3).map(|p| p.title.as_str()).collect();
  assert_eq!(titles, ["new", "mid", "old"]);
  assert!(all[3..].iter().all(|p| p.tender_date.is_none()));

  let page = s
    .list_projects(&ProjectQuery {
      page: Page { limit: 2, offset: 2 },
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.len(), 2);
  assert_eq!(page[0].title, "old");
  assert!(page[1].tender_date.is_none());
}

#[tokio::test]
async fn pagination_past_end_is_empty() {
  let s = store().await;
  project(&s, "only", None, None, None, None).await;

  let page = s
    .list_projects(&ProjectQuery {
      page: Page { limit: 10, offset: 5 },
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(page.is_empty());
}

#[tokio::test]
async fn blank_title_is_rejected() {
  let s = store().await;
  let err = s
    .insert_project(NewProject { title: " ".into(), ..Default::default() })
    .await
    .unwrap_err();
  assert!(err.invalid_fields().is_some());
}

// ─── Districts ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_districts_is_sorted_distinct_non_empty() {
  let s = store().await;
  for d in [Some("Lalitpur"), Some("Bhaktapur"), Some("Lalitpur"), Some(""), None, Some("kathmandu")] {
    project(&s, "p", None, d, None, None).await;
  }

  let first = s.list_districts().await.unwrap();
  assert_eq!(first, ["Bhaktapur", "Lalitpur", "kathmandu"]);
  assert_eq!(s.list_districts().await.unwrap(), first);
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_report_round_trips_through_listing() {
  let s = store().await;
  let created = s
    .create_report(NewReport {
      status_flag: Some("reported".into()),
      rating: Some(4),
      district: Some("Kathmandu".into()),
      photo_urls: Some(vec!["https://img.example/1.jpg".into()]),
      lat: Some(27.7172),
      lng: Some(85.324),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(created.channel, "app");

  let listed = s
    .list_reports(&ReportQuery {
      district: Some("kathmandu".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(listed, vec![created]);
}

#[tokio::test]
async fn create_report_rejects_invalid_rating_without_writing() {
  let s = store().await;
  let err = s
    .create_report(NewReport { rating: Some(7), ..Default::default() })
    .await
    .unwrap_err();
  assert_eq!(err.invalid_fields().unwrap()[0].field, "rating");
  assert!(s.list_reports(&ReportQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_report_rejects_unknown_project() {
  let s = store().await;
  let err = s
    .create_report(NewReport {
      project_id: Some(Uuid::new_v4()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert_eq!(err.invalid_fields().unwrap()[0].field, "project_id");
  assert!(s.list_reports(&ReportQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_reports_newest_first_with_filters() {
  let s = store().await;
  let p = project(&s, "Ring Road", None, Some("Kathmandu"), None, None).await;

  let first = s
    .create_report(NewReport {
      project_id: Some(p.id),
      district: Some("Kathmandu".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  tokio::time::sleep(Duration::from_millis(2)).await;
  s.create_report(report(Some("Lalitpur"), None)).await.unwrap();
  tokio::time::sleep(Duration::from_millis(2)).await;
  let last = s
    .create_report(NewReport {
      project_id: Some(p.id),
      district: Some("kathmandu".into()),
      ..Default::default()
    })
    .await
    .unwrap();

  let all = s.list_reports(&ReportQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);
  assert_eq!(all[0].id, last.id);
  assert_eq!(all[2].id, first.id);

  let for_project = s
    .list_reports(&ReportQuery {
      district:   Some("KATHMANDU".into()),
      project_id: Some(p.id),
      page:       Page { limit: 1, offset: 1 },
    })
    .await
    .unwrap();
  assert_eq!(for_project.len(), 1);
  assert_eq!(for_project[0].id, first.id);
}

// ─── Aggregations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn summary_stats_groups_missing_status_as_unknown() {
  let s = store().await;
  for t in ["a", "b", "c"] {
    project(&s, t, None, Some("Kathmandu"), None, None).await;
  }
  for status in [Some("resolved"), Some("resolved"), None, None, Some("pending")] {
    s.create_report(report(Some("Kathmandu"), status)).await.unwrap();
  }

  let stats = s.summary_stats(None).await.unwrap();
  assert_eq!(stats.district, "ALL");
  assert_eq!(stats.projects, 3);
  assert_eq!(stats.reports, 5);
  assert_eq!(
    stats.status_breakdown,
    [("pending", 1_u64), ("resolved", 2), ("unknown", 2)]
      .into_iter()
      .map(|(k, v)| (k.to_owned(), v))
      .collect::<BTreeMap<_, _>>()
  );
}

#[tokio::test]
async fn summary_stats_merges_literal_unknown_with_missing() {
  let s = store().await;
  s.create_report(report(None, Some("unknown"))).await.unwrap();
  s.create_report(report(None, None)).await.unwrap();

  let stats = s.summary_stats(None).await.unwrap();
  assert_eq!(stats.status_breakdown.get("unknown"), Some(&2));
}

#[tokio::test]
async fn summary_stats_scoped_to_district() {
  let s = store().await;
  project(&s, "a", None, Some("Lalitpur"), None, None).await;
  project(&s, "b", None, Some("Bhaktapur"), None, None).await;
  s.create_report(report(Some("LALITPUR"), Some("verified"))).await.unwrap();
  s.create_report(report(Some("Bhaktapur"), Some("verified"))).await.unwrap();

  let stats = s.summary_stats(Some("lalitpur".into())).await.unwrap();
  assert_eq!(stats.district, "lalitpur");
  assert_eq!(stats.projects, 1);
  assert_eq!(stats.reports, 1);
  assert_eq!(stats.status_breakdown.get("verified"), Some(&1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn summary_stats_is_consistent_under_concurrent_intake() {
  let s = store().await;
  let writer = {
    let s = s.clone();
    tokio::spawn(async move {
      for i in 0..500 {
        let status = if i % 2 == 0 { Some("pending") } else { None };
        s.create_report(report(Some("Kathmandu"), status)).await.unwrap();
      }
    })
  };

  while !writer.is_finished() {
    let stats = s.summary_stats(None).await.unwrap();
    assert_eq!(stats.reports, stats.status_breakdown.values().sum::<u64>());
  }
  writer.await.unwrap();

  let stats = s.summary_stats(None).await.unwrap();
  assert_eq!(stats.reports, 500);
  assert_eq!(stats.status_breakdown.values().sum::<u64>(), 500);
}

#[tokio::test]
async fn sector_breakdown_is_exhaustive_and_ordered() {
  let s = store().await;
  for sector in [Some("Roads"), Some("Water"), Some("Roads"), None, Some(""), Some("Health")] {
    project(&s, "p", None, Some("Kathmandu"), sector, None).await;
  }
  project(&s, "elsewhere", None, Some("Lalitpur"), Some("Roads"), None).await;

  let sectors = s.sector_breakdown(Some("Kathmandu".into())).await.unwrap();
  let pairs: Vec<_> = sectors.iter().map(|c| (c.sector.as_str(), c.count)).collect();
  assert_eq!(
    pairs,
    [("Other/Uncategorized", 2), ("Roads", 2), ("Health", 1), ("Water", 1)]
  );

  let total: u64 = sectors.iter().map(|c| c.count).sum();
  let stats = s.summary_stats(Some("Kathmandu".into())).await.unwrap();
  assert_eq!(total, stats.projects);
}

#[tokio::test]
async fn monthly_timeline_skips_undated_projects() {
  let s = store().await;
  project(&s, "a", None, Some("Kathmandu"), None, Some(date(2023, 11, 2))).await;
  project(&s, "b", None, Some("Kathmandu"), None, Some(date(2022, 2, 28))).await;
  project(&s, "c", None, Some("Kathmandu"), None, Some(date(2023, 11, 30))).await;
  project(&s, "d", None, Some("Kathmandu"), None, None).await;
  project(&s, "e", None, Some("Lalitpur"), None, Some(date(2023, 1, 1))).await;

  let timeline = s.monthly_timeline(Some("kathmandu".into())).await.unwrap();
  let triples: Vec<_> = timeline.iter().map(|m| (m.year, m.month, m.count)).collect();
  assert_eq!(triples, [(2022, 2, 1), (2023, 11, 2)]);

  let all = s.monthly_timeline(None).await.unwrap();
  assert_eq!(all.iter().map(|m| m.count).sum::<u64>(), 4);
  assert_eq!((all[1].year, all[1].month), (2023, 1));
}

#[tokio::test]
async fn empty_store_aggregates_are_empty() {
  let s = store().await;
  let stats = s.summary_stats(Some(String::new())).await.unwrap();
  assert_eq!(stats.district, "ALL");
  assert_eq!((stats.projects, stats.reports), (0, 0));
  assert!(stats.status_breakdown.is_empty());
  assert!(s.sector_breakdown(None).await.unwrap().is_empty());
  assert!(s.monthly_timeline(None).await.unwrap().is_empty());
}

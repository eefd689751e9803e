//! End-to-end retrieval through the public API: CSV → index → search.

use std::sync::Arc;

use chrono::NaiveDate;
use filescout::config::Config;
use filescout::ingest::{build_index, read_records};
use filescout_core::embedding::HashingEmbedder;
use filescout_core::filter::{build_filter, Constraints};
use filescout_core::index::memory::InMemoryIndex;
use filescout_core::index::SimilarityIndex;
use filescout_core::models::FileSource;
use filescout_core::search::{
    search_links, search_similar_records, LooseInt, OutcomeKind, SearchSettings,
    SimilarRecordsParams, SubQueryPolicy,
};
use filescout_core::split::SplitMode;
use tempfile::TempDir;

const CORPUS: &str = "\
author,source,file_title,file_size,file_type,file_location_at_source,file_created_at,file_last_updated_at,file_url,generated_insights
Ari Lane,google_drive,Budget Sheet,5000,xlsx,finance,2024-02-10 12:00:00,2024-02-10 12:00:00,http://example.com/budget.xlsx,Annual budget spreadsheet
Ari Lane,google_drive,Team Handbook,800,pdf,people,2024-03-05 14:22:11,2024-03-05 14:22:11,http://example.com/handbook.pdf,Employee handbook and policies
Sam Ortiz,avoma,Brand Review,1200,docx,calls,2024-04-20 10:00:00,2024-04-20 10:00:00,http://example.com/brand.docx,Brand review meeting transcript
Web Team,web,Candy Store,0,web link,/candy,2024-05-01,2024-05-01,https://example.com/candy,Landing page of the candy store
";

async fn index() -> InMemoryIndex {
    let records = read_records(CORPUS.as_bytes()).unwrap();
    InMemoryIndex::build(records, Arc::new(HashingEmbedder::new(128)))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_build_index_from_config() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("file_info.csv");
    std::fs::write(&path, CORPUS).unwrap();

    let index = build_index(&Config::with_data_path(path.clone())).await.unwrap();
    assert_eq!(index.len(), 4);
    assert_eq!(index.records()[3].id, "4");
}

#[tokio::test]
async fn test_list_by_built_filter() {
    let idx = index().await;
    let constraints = Constraints {
        source: Some(FileSource::GoogleDrive),
        ..Default::default()
    };
    let records = idx.get(build_filter(&constraints).as_ref()).await.unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_size_bound_needs_both_directions() {
    let idx = index().await;
    let settings = SearchSettings::default();

    // Pre-filter `file_size <= 5` removes the 5000-byte sheet before ranking.
    let mut p = SimilarRecordsParams::new("budget spreadsheet");
    p.file_size = Some(LooseInt::Int(5));
    let resp = search_similar_records(&idx, &settings, &p).await;
    assert_eq!(resp.status.outcome, OutcomeKind::Empty);
    assert_eq!(
        resp.filter,
        Some(serde_json::json!({"file_size": {"$lte": 5}}))
    );

    // Without the pre-filter only `file_size >= 5 * 1000` applies.
    p.contextual = true;
    let resp = search_similar_records(&idx, &settings, &p).await;
    assert_eq!(resp.status.outcome, OutcomeKind::Found);
    let titles: Vec<&str> = resp.records.iter().map(|m| m.file_title.as_str()).collect();
    assert_eq!(titles, vec!["Budget Sheet"]);
}

#[tokio::test]
async fn test_contextual_extension_enforced_after_ranking() {
    let idx = index().await;
    let settings = SearchSettings::default();

    let mut p = SimilarRecordsParams::new("budget spreadsheet");
    p.file_extension = Some("docx".into());
    p.contextual = true;
    let resp = search_similar_records(&idx, &settings, &p).await;

    assert_eq!(resp.status.outcome, OutcomeKind::Found);
    // All four records were ranked; only the docx survives refinement.
    assert_eq!(resp.sub_query_candidates, vec![4]);
    let titles: Vec<&str> = resp.records.iter().map(|m| m.file_title.as_str()).collect();
    assert_eq!(titles, vec!["Brand Review"]);
    assert_eq!(resp.filter, Some(serde_json::json!({"file_type": "docx"})));
}

#[tokio::test]
async fn test_word_split_leaves_embedded_conjunctions_alone() {
    let idx = index().await;
    let settings = SearchSettings::default();

    let resp =
        search_similar_records(&idx, &settings, &SimilarRecordsParams::new("Brand review")).await;
    assert_eq!(resp.sub_queries, vec!["Brand review"]);

    let legacy = SearchSettings {
        split_mode: SplitMode::Substring,
        ..Default::default()
    };
    let resp =
        search_similar_records(&idx, &legacy, &SimilarRecordsParams::new("Brand review")).await;
    assert_eq!(resp.sub_queries, vec!["br", "review"]);
}

#[tokio::test]
async fn test_union_policy_merges_sub_queries() {
    let idx = index().await;
    let settings = SearchSettings {
        top_k: 4,
        sub_query_policy: SubQueryPolicy::Union,
        ..Default::default()
    };
    let mut p = SimilarRecordsParams::new("handbook or budget");
    p.nfiles_to_return = Some(LooseInt::Int(2));

    let resp = search_similar_records(&idx, &settings, &p).await;
    assert_eq!(resp.sub_queries, vec!["handbook", "budget"]);
    assert_eq!(resp.summary.number_of_matches, 2);
    // The two most recent of everything in the default window, oldest first.
    let titles: Vec<&str> = resp.records.iter().map(|m| m.file_title.as_str()).collect();
    assert_eq!(titles, vec!["Brand Review", "Candy Store"]);
    assert_eq!(
        resp.summary.latest_document_created_at,
        NaiveDate::from_ymd_opt(2024, 5, 1)
    );
}

#[tokio::test]
async fn test_link_search_ignores_non_links() {
    let idx = index().await;
    let resp = search_links(&idx, &SearchSettings::default(), "candy store and more").await;
    assert!(resp.status.link_retrieved);
    assert_eq!(resp.record.unwrap().file_url, "https://example.com/candy");
}

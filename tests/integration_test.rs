use skillswap_match_engine::{
    MatchEngine, MatchEngineError, MatchQuery, NewRating, NewSwapRequest, ProfileRecord,
    RequestDirection, RequestFilters, SearchFilters, SwapDecision, SwapRequestStatus,
};

const PROFILES: &str = r#"[
    {
        "id": "marc",
        "name": "Marc Demo",
        "location": "New York, NY",
        "availability": ["weekends", "evenings"],
        "claims": [
            {"name": "JavaScript", "category": "Programming", "level": "EXPERT", "kind": "OFFERED"},
            {"name": "Photoshop", "category": "Design", "level": "INTERMEDIATE", "kind": "OFFERED"},
            {"name": "Spanish", "category": "Language", "level": "BEGINNER", "kind": "WANTED"}
        ]
    },
    {
        "id": "sara",
        "name": "Sara Lopez",
        "location": "new york",
        "availability": ["weekends", "mornings"],
        "claims": [
            {"name": "Spanish", "level": "EXPERT", "kind": "OFFERED"},
            {"name": "JavaScript", "level": "INTERMEDIATE", "kind": "WANTED"}
        ]
    },
    {
        "id": "tom",
        "name": "Tom Baker",
        "location": "Boston, MA",
        "claims": [
            {"name": "Photoshop", "level": "INTERMEDIATE", "kind": "WANTED"}
        ]
    },
    {
        "id": "lee",
        "name": "Lee Chen",
        "location": "Chicago, IL",
        "availability": ["weekends", "evenings"],
        "claims": [
            {"name": "javascript", "level": "EXPERT", "kind": "WANTED"}
        ]
    },
    {
        "id": "spam",
        "name": "Spam Account",
        "claims": [
            {"name": "JavaScript", "level": "EXPERT", "kind": "WANTED"}
        ]
    }
]"#;

async fn seeded_engine() -> MatchEngine {
    let engine = MatchEngine::new(":memory:").await.unwrap();
    let report = engine.import_profiles(PROFILES).await.unwrap();
    assert_eq!(report.imported, 5);
    engine.set_banned("spam", true).await.unwrap();
    engine
}

#[tokio::test]
async fn test_find_matches_end_to_end() {
    let engine = seeded_engine().await;

    let response = engine.find_matches(MatchQuery::new("marc")).await.unwrap();
    let ranked: Vec<(&str, u32)> = response
        .matches
        .iter()
        .map(|m| (m.profile.id.as_str(), m.match_result.score))
        .collect();

    // sara: JavaScript forward (15) + Spanish reverse (10) + same city (15) + weekends (5)
    // tom:  Photoshop forward (25)
    // lee:  case differs on the skill name, two shared slots only (10)
    assert_eq!(ranked, vec![("sara", 45), ("tom", 25), ("lee", 10)]);
    assert_eq!(response.total_candidates, 3);

    let sara = &response.matches[0].match_result;
    assert_eq!(sara.matched_skills.len(), 1);
    assert_eq!(sara.matched_skills[0].user_offered, "JavaScript");
    assert_eq!(sara.matched_skills[0].level_difference, 2);
}

#[tokio::test]
async fn test_banned_users_disappear_from_matches() {
    let engine = seeded_engine().await;

    engine.set_banned("tom", true).await.unwrap();
    let response = engine.find_matches(MatchQuery::new("marc")).await.unwrap();
    assert!(response.matches.iter().all(|m| m.profile.id != "tom"));

    engine.set_banned("tom", false).await.unwrap();
    let response = engine.find_matches(MatchQuery::new("marc")).await.unwrap();
    assert!(response.matches.iter().any(|m| m.profile.id == "tom"));
}

#[tokio::test]
async fn test_profile_save_keeps_ban() {
    let engine = seeded_engine().await;

    let records: Vec<ProfileRecord> = serde_json::from_str(PROFILES).unwrap();
    let mut spam = records.into_iter().find(|r| r.id() == "spam").unwrap();
    spam.snapshot.location = Some("Denver, CO".to_string());
    engine.upsert_profile(&spam).await.unwrap();

    let response = engine.find_matches(MatchQuery::new("marc")).await.unwrap();
    assert!(response.matches.iter().all(|m| m.profile.id != "spam"));
    assert_eq!(engine.store_stats().await.unwrap().banned_profiles, 1);
}

#[tokio::test]
async fn test_directory_search() {
    let engine = seeded_engine().await;

    let page = engine
        .search(&SearchFilters {
            query: Some("javascript".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut ids: Vec<&str> = page.profiles.iter().map(|p| p.snapshot.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["lee", "marc", "sara"]);
    assert_eq!(page.pagination.total_pages, 1);
}

#[tokio::test]
async fn test_invalid_profile_rejected() {
    let engine = MatchEngine::new(":memory:").await.unwrap();

    let json = r#"{"id": "x", "name": "Xavier", "availability": ["whenever"]}"#;
    let record: ProfileRecord = serde_json::from_str(json).unwrap();

    let err = engine.upsert_profile(&record).await.unwrap_err();
    assert!(matches!(err, MatchEngineError::Validation(_)));
}

#[tokio::test]
async fn test_import_rejects_malformed_json() {
    let engine = MatchEngine::new(":memory:").await.unwrap();
    let err = engine.import_profiles("{not json").await.unwrap_err();
    assert!(matches!(err, MatchEngineError::Json(_)));
}

#[tokio::test]
async fn test_swap_exchange_end_to_end() {
    let engine = seeded_engine().await;

    // Marc teaches JavaScript, Sara teaches Spanish
    let request = engine
        .create_request(
            &NewSwapRequest::new("marc", "sara", "JavaScript", "Spanish")
                .with_message("Trade lessons on weekends?"),
        )
        .await
        .unwrap();

    let inbox = engine
        .list_requests(
            "sara",
            &RequestFilters {
                direction: RequestDirection::Received,
                status: Some(SwapRequestStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(inbox.requests.len(), 1);
    assert_eq!(inbox.requests[0].id, request.id);

    // Only Sara can answer, and only Marc or Sara can rate
    assert!(matches!(
        engine.respond_to_request("marc", request.id, SwapDecision::Accept).await,
        Err(MatchEngineError::Forbidden(_))
    ));
    engine
        .respond_to_request("sara", request.id, SwapDecision::Accept)
        .await
        .unwrap();
    assert!(matches!(
        engine.rate_request(&NewRating::new(request.id, "tom", 5)).await,
        Err(MatchEngineError::Forbidden(_))
    ));

    let rating = engine
        .rate_request(&NewRating::new(request.id, "marc", 5).with_feedback("Great teacher"))
        .await
        .unwrap();
    assert_eq!(rating.receiver_id, "sara");

    let done = engine.get_request(request.id).await.unwrap();
    assert_eq!(done.status, SwapRequestStatus::Completed);
    assert!(matches!(
        engine.rate_request(&NewRating::new(request.id, "sara", 4)).await,
        Err(MatchEngineError::Conflict(_))
    ));

    let page = engine
        .search(&SearchFilters { query: Some("sara".to_string()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(page.profiles[0].total_ratings, 1);
    assert_eq!(page.profiles[0].average_rating, 5.0);
}

#[tokio::test]
async fn test_store_stats() {
    let engine = seeded_engine().await;

    let request = engine
        .create_request(&NewSwapRequest::new("marc", "sara", "Photoshop", "Spanish"))
        .await
        .unwrap();
    engine
        .respond_to_request("sara", request.id, SwapDecision::Accept)
        .await
        .unwrap();
    engine
        .rate_request(&NewRating::new(request.id, "sara", 5))
        .await
        .unwrap();
    engine
        .create_request(&NewSwapRequest::new("marc", "sara", "JavaScript", "Spanish"))
        .await
        .unwrap();

    let stats = engine.store_stats().await.unwrap();
    assert_eq!(stats.total_profiles, 5);
    assert_eq!(stats.public_profiles, 4);
    assert_eq!(stats.banned_profiles, 1);
    // JavaScript, Photoshop, Spanish, javascript
    assert_eq!(stats.total_skills, 4);
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.pending_requests, 1);
    assert_eq!(stats.total_ratings, 1);
}

use anyhow::Result;
use g1lens_core::timestamp::parse_iso;
use g1lens_core::{AnalysisError, Config, GcClass};
use g1lens_test::fixtures::{
    access_burst_fixture, combined_fixture, interleaved_service_fixture, mixed_gc_fixture,
};
use g1lens_test::harness::TestRun;

#[tokio::test]
async fn gc_log_classified_and_rated() -> Result<()> {
    let fixture = mixed_gc_fixture();
    let mut run = TestRun::new(Config::default());
    let analysis = run.analyze(&fixture.text).await?;

    let classes: Vec<GcClass> = analysis.gc.events.iter().map(|e| e.class).collect();
    assert_eq!(classes, fixture.expected_classes);
    assert_eq!(analysis.gc.events[0].duration, fixture.expected_first_duration);
    assert_eq!(
        analysis.gc.detected_timezone.as_deref(),
        Some(fixture.expected_timezone)
    );
    assert!(!analysis.truncated);

    let mixed_long = &analysis.gc.events[5];
    assert!(mixed_long.mixed_long);
    assert_eq!(mixed_long.color, "#d35400");

    let stats = analysis.gc.rate_stats.expect("rate stats for six events");
    assert_eq!(stats.total_time_ms, 5_000.0);
    assert!(stats.mean_alloc_rate > 0.0);
    assert!(analysis
        .gc
        .events
        .iter()
        .all(|e| e.instant_gc_rate.is_finite() && e.instant_gc_rate >= 0.0));

    Ok(())
}

#[tokio::test]
async fn service_calls_pair_across_interleaved_threads() -> Result<()> {
    let fixture = interleaved_service_fixture(500);
    let mut run = TestRun::new(Config::default());
    let analysis = run.analyze(&fixture.text).await?;

    let service = analysis
        .extension("ServiceLog")
        .and_then(|out| out.service())
        .expect("service output");
    assert_eq!(service.events.len(), 1);

    let call = &service.events[0];
    assert_eq!(call.thread_id, fixture.thread);
    assert_eq!(call.logs.len(), fixture.expected_thread_lines);
    let tag = format!("[{}]", fixture.thread);
    assert!(call.logs.iter().all(|line| line.contains(&tag)));
    assert_eq!(call.processing_time, 2871);
    assert_eq!(call.last_goods_count, Some(42));

    let metrics = call.metrics.as_ref().expect("air list metrics");
    assert_eq!(metrics.gds, "Amadeus");
    assert_eq!(metrics.carrier_connect_execute_time, 340);
    assert_eq!(metrics.hkn_agt_time, 25);
    assert_eq!(call.dot_radius(), 3);

    Ok(())
}

#[tokio::test]
async fn orphan_end_anchors_on_end_time() -> Result<()> {
    let text = "2025-11-09 22:39:25 [exec-3] INFO  [AirController#airListSchSv()] : END Processing time [12] ms";
    let mut run = TestRun::new(Config::default());
    let analysis = run.analyze(text).await?;

    let service = analysis
        .extension("ServiceLog")
        .and_then(|out| out.service())
        .expect("service output");
    let call = &service.events[0];
    assert!(call.timestamp_raw.is_none());
    assert_eq!(call.timestamp, call.end_time);
    // No GC lines, so the local time is read as UTC
    assert_eq!(call.timestamp, parse_iso("2025-11-09T22:39:25+0000").unwrap());

    Ok(())
}

#[tokio::test]
async fn access_burst_spread_within_second() -> Result<()> {
    let mut run = TestRun::new(Config::default());
    let analysis = run.analyze(&access_burst_fixture()).await?;

    let access = analysis
        .extension("AccessLog")
        .and_then(|out| out.access())
        .expect("access output");
    assert_eq!(access.events.len(), 5);

    let second = parse_iso("2025-11-09T22:39:20+0900").unwrap();
    let burst = &access.events[..4];
    for pair in burst.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
    for event in burst {
        assert!(event.timestamp > second);
        assert!(event.timestamp < second + chrono::Duration::seconds(1));
        assert_eq!(event.rank, 0);
    }

    assert_eq!(access.legend[0].label, "POST /services/airSearch");
    assert_eq!(access.legend[0].count, 4);
    assert_eq!(access.legend[1].label, "GET /health");
    assert_eq!(access.events[4].rank, 1);

    Ok(())
}

#[tokio::test]
async fn combined_file_feeds_every_extension() -> Result<()> {
    let mut run = TestRun::new(Config::default());
    let analysis = run.analyze(&combined_fixture()).await?;

    assert_eq!(analysis.gc.events.len(), 2);
    assert_eq!(analysis.extensions.len(), 3);

    let combined = analysis.extension("ServiceAccessLog").expect("combined output");
    let access = combined.access().expect("access half");
    let service = combined.service().expect("service half");
    assert_eq!(access.events.len(), 1);
    assert_eq!(service.events.len(), 1);

    // Service local times follow the GC log's offset
    assert_eq!(
        service.events[0].timestamp,
        parse_iso("2025-11-09T22:39:21+0900").unwrap()
    );
    assert_eq!(service.events[0].method_name.as_deref(), Some("hotelSchSv()"));
    assert!(service.events[0].metrics.is_none());

    Ok(())
}

#[tokio::test]
async fn cli_json_output() -> Result<()> {
    let run = TestRun::new(Config::default());
    let json = run
        .render_json(&combined_fixture(), Some("ServiceAccessLog"))
        .await?;

    assert_eq!(json["gc"]["events"].as_array().unwrap().len(), 2);
    assert_eq!(json["gc"]["detected_timezone"], "+0900");
    assert_eq!(json["extension"], "ServiceAccessLog");
    assert_eq!(json["extension_output"]["kind"], "service_access_log");
    assert_eq!(
        json["extension_output"]["service"]["events"][0]["processing_time"],
        1480
    );

    Ok(())
}

#[tokio::test]
async fn cli_summary_defaults_to_first_extension() -> Result<()> {
    let run = TestRun::new(Config::default());
    let summary = run.render(&access_burst_fixture(), None, false).await?;

    assert!(summary.contains("GC events: 0"));
    assert!(summary.contains("AccessLog: 5 events"));
    assert!(summary.contains("POST /services/airSearch (4)"));

    Ok(())
}

#[tokio::test]
async fn cli_rejects_unknown_extension() -> Result<()> {
    let run = TestRun::new(Config::default());
    let err = run
        .render(&access_burst_fixture(), Some("Nginx"), false)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::UnknownExtension { .. })
    ));

    Ok(())
}

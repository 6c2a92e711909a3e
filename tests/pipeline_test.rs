use pond_rs::{
    AggregatorOptions, Alignment, AnyEvent, EmitPolicy, Event, EventOut, EventVariant, Mode,
    Pipeline, PipelineConfig, PondError, Reducer, TimeRangeEvent, TimedEvent, WindowSpec,
};
use chrono::{Local, TimeZone};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn traffic(count: i64, step: i64) -> Vec<Event> {
    (0..count)
        .map(|i| {
            Event::new(
                i * step,
                json!({"in": i, "out": i * 2, "host": if i % 2 == 0 { "a" } else { "b" }}),
            )
        })
        .collect()
}

#[test]
fn test_each_event_aggregation_emits_per_event() {
    init_tracing();
    let results = Arc::new(Mutex::new(Vec::new()));
    let sink_results = results.clone();

    let pipeline = Pipeline::new()
        .window_by(WindowSpec::fixed("1m").unwrap())
        .emit_on(EmitPolicy::EachEvent)
        .aggregate(AggregatorOptions::new().field("in", Reducer::sum()))
        .unwrap();
    let runner = pipeline
        .to(EventOut::new(move |event: &AnyEvent| {
            sink_results.lock().unwrap().push(event.clone());
        }))
        .unwrap();
    runner.run(traffic(6, 20_000)).unwrap();

    let results = results.lock().unwrap();
    assert_eq!(results.len(), 6, "one running aggregate per input event");
    assert!(results.iter().all(|e| e.variant() == EventVariant::Indexed));
    // events 0, 1, 2 fall in the first minute
    assert_eq!(results[2].value("in"), Some(3.0));
    assert_eq!(results[2].as_indexed().unwrap().index_as_string(), "1m-0");
    assert_eq!(results[5].value("in"), Some(12.0));
}

#[test]
fn test_discard_aggregation_emits_once_per_window_on_flush() {
    let pipeline = Pipeline::new()
        .window_by(WindowSpec::fixed("1m").unwrap())
        .emit_on(EmitPolicy::Discard)
        .aggregate(
            AggregatorOptions::new()
                .field("in", Reducer::avg())
                .field("out", Reducer::max()),
        )
        .unwrap();

    let out = pipeline.to_event_list(traffic(6, 20_000)).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].value("in"), Some(1.0));
    assert_eq!(out[0].value("out"), Some(4.0));
    assert_eq!(out[1].value("in"), Some(4.0));
    assert_eq!((out[1].begin(), out[1].end()), (60_000, 120_000));
}

#[test]
fn test_grouped_window_boundary_aggregation() {
    init_tracing();
    let pipeline = Pipeline::new()
        .window_by(WindowSpec::fixed("1m").unwrap())
        .group_by_field("host")
        .emit_on(EmitPolicy::OnWindowBoundary)
        .aggregate(AggregatorOptions::new().field("in", Reducer::count()))
        .unwrap();

    let out = pipeline.to_event_list(traffic(6, 20_000)).unwrap();
    // a group closes when the same host opens a later window; the rest
    // come out on flush in the order they were opened
    let emitted: Vec<(&str, Option<f64>)> = out
        .iter()
        .map(|e| (e.as_indexed().unwrap().index_as_string(), e.value("in")))
        .collect();
    assert_eq!(
        emitted,
        vec![
            ("1m-0", Some(1.0)),
            ("1m-0", Some(2.0)),
            ("1m-1", Some(2.0)),
            ("1m-1", Some(1.0)),
        ]
    );
}

#[test]
fn test_select_collapse_filter_map_chain() {
    let pipeline = Pipeline::new()
        .select(["in", "out"])
        .unwrap()
        .collapse(["in", "out"], "total", Reducer::sum(), true)
        .unwrap()
        .filter(|event| event.value("total").is_some_and(|t| t >= 6.0))
        .unwrap()
        .map(|event| {
            let total = event.value("total").unwrap_or_default();
            AnyEvent::from(Event::new(event.timestamp(), json!({"total": total * 10.0})))
        })
        .unwrap();

    let out = pipeline.to_event_list(traffic(4, 1_000)).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].timestamp(), 2_000);
    assert_eq!(out[0].value("total"), Some(60.0));
    assert_eq!(out[1].value("total"), Some(90.0));
}

#[test]
fn test_take_limits_per_window() {
    let pipeline = Pipeline::new()
        .window_by(WindowSpec::fixed("1m").unwrap())
        .take(2)
        .unwrap();
    let out = pipeline.to_event_list(traffic(9, 20_000)).unwrap();
    let stamps: Vec<i64> = out.iter().map(|e| e.timestamp()).collect();
    assert_eq!(stamps, vec![0, 20_000, 60_000, 80_000, 120_000, 140_000]);
}

#[test]
fn test_take_without_window_stops_early() {
    let pipeline = Pipeline::new().take(3).unwrap();
    let out = pipeline.to_event_list(traffic(100, 1)).unwrap();
    assert_eq!(out.len(), 3);
}

#[test]
fn test_converter_round_trip() {
    let pipeline = Pipeline::new()
        .as_time_range_events(Alignment::Front, Some("1h"))
        .unwrap()
        .as_events(Alignment::Lag)
        .unwrap();
    let input = traffic(3, 3_600_000);
    let out = pipeline.to_event_list(input.clone()).unwrap();
    assert_eq!(out.len(), 3);
    for (before, after) in input.iter().zip(&out) {
        assert_eq!(after.variant(), EventVariant::Event);
        assert_eq!(before.timestamp(), after.timestamp());
        assert_eq!(before.data(), after.data());
    }
}

#[test]
fn test_conversion_error_stops_run() {
    let pipeline = Pipeline::new().as_indexed_events("1h").unwrap();
    let ranged = vec![TimeRangeEvent::new(
        pond_rs::TimeRange::new(0, 1_000).unwrap(),
        json!({"in": 1}),
    )];
    let err = pipeline.to_event_list(ranged).unwrap_err();
    assert!(matches!(err, PondError::Conversion(_)));
}

#[test]
fn test_stream_mode_aggregation_needs_window() {
    let result = Pipeline::new()
        .mode(Mode::Stream)
        .aggregate(AggregatorOptions::new().field("in", Reducer::avg()));
    assert!(matches!(result, Err(PondError::Construction(_))));
}

#[test]
fn test_pipeline_from_toml_config() {
    let config = PipelineConfig::from_toml_str(
        r#"
        window = "1m"
        emit = "discard"
        "#,
    )
    .unwrap();
    let pipeline = Pipeline::with_config(config)
        .aggregate(AggregatorOptions::new().field("out", Reducer::sum()))
        .unwrap();
    let out = pipeline.to_event_list(traffic(4, 30_000)).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].value("out"), Some(2.0));
    assert_eq!(out[1].value("out"), Some(10.0));
}

#[test]
fn test_keyed_collections_by_window_and_group() {
    let pipeline = Pipeline::new()
        .window_by(WindowSpec::fixed("1m").unwrap())
        .group_by_field("host")
        .emit_on(EmitPolicy::Discard);
    let keyed = pipeline.to_keyed_collections(traffic(6, 20_000)).unwrap();
    let keys: Vec<&str> = keyed.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["1m-0--a", "1m-0--b", "1m-1--a", "1m-1--b"]);
    assert_eq!(keyed["1m-0--a"].size(), 2);
    assert_eq!(keyed["1m-1--a"].size(), 1);
}

#[test]
fn test_daily_aggregation_in_local_time() {
    let local_ms = |d: u32, h: u32| {
        Local
            .with_ymd_and_hms(2014, 9, d, h, 0, 0)
            .earliest()
            .unwrap()
            .timestamp_millis()
    };
    let events = vec![
        Event::new(local_ms(17, 1), json!({"in": 1})),
        Event::new(local_ms(17, 23), json!({"in": 3})),
        Event::new(local_ms(18, 9), json!({"in": 10})),
    ];

    let pipeline = Pipeline::new()
        .window_by(WindowSpec::Daily)
        .utc(false)
        .emit_on(EmitPolicy::Discard)
        .aggregate(AggregatorOptions::new().field("in", Reducer::sum()))
        .unwrap();
    let out = pipeline.to_event_list(events).unwrap();
    assert_eq!(out.len(), 2);

    let first = out[0].as_indexed().unwrap();
    assert_eq!(first.index_as_string(), "2014-09-17");
    assert!(!first.index().utc());
    assert_eq!(first.begin(), local_ms(17, 0));
    assert_eq!(first.end(), local_ms(18, 0) - 1);
    assert_eq!(first.value("in"), Some(4.0));

    let second = out[1].as_indexed().unwrap();
    assert_eq!(second.index_as_string(), "2014-09-18");
    assert_eq!(second.value("in"), Some(10.0));
}
